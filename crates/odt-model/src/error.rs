//! Error types for the change-set model
//!
//! Every variant here is a harness wiring defect or an unresolvable model
//! lookup. None of them are retried.

use crate::descriptor::DescriptorId;

/// Model construction and lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Two descriptors in one snapshot share an id
    #[error("duplicate descriptor id in snapshot: {0}")]
    DuplicateDescriptor(DescriptorId),

    /// A link references an entity that is not part of the snapshot
    #[error("link {link} references unknown entity {entity}")]
    UnknownLinkEndpoint {
        /// The link descriptor
        link: DescriptorId,
        /// The missing endpoint
        entity: DescriptorId,
    },

    /// Entity type is not declared in the service model
    #[error("entity type not found in service model: {0}")]
    UnresolvedEntityType(String),

    /// Descriptor and service model disagree on whether the type carries a
    /// default stream
    #[error("{descriptor} of type {type_name}: media link entry flag is {is_media_link_entry}, model says has_stream is {has_stream}")]
    StreamMismatch {
        /// The entity descriptor
        descriptor: DescriptorId,
        /// Its entity type
        type_name: String,
        /// Flag on the descriptor
        is_media_link_entry: bool,
        /// Flag in the service model
        has_stream: bool,
    },

    /// No edit link or key is available to address an entity
    #[error("cannot build a request uri for descriptor {descriptor}: {reason}")]
    UnresolvableUri {
        /// The descriptor that could not be addressed
        descriptor: DescriptorId,
        /// What was missing
        reason: String,
    },

    /// A header value does not carry a parseable protocol version
    #[error("invalid protocol version: '{0}'")]
    InvalidProtocolVersion(String),

    /// Header name or value is not valid HTTP
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Snapshot fixture could not be decoded
    #[error("invalid snapshot fixture: {0}")]
    InvalidFixture(String),
}

impl ModelError {
    /// Create an unresolvable uri error
    #[inline]
    pub fn unresolvable_uri(descriptor: DescriptorId, reason: impl Into<String>) -> Self {
        Self::UnresolvableUri {
            descriptor,
            reason: reason.into(),
        }
    }
}

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;
