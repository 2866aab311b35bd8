//! Verification failures
//!
//! Every failure names what was expected, what was observed, and where
//! (request index, operation index or header).

use odt_model::{DescriptorId, ProtocolVersion, ResponsePreference};

/// One divergence between prediction and observation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Mismatch {
    /// Different number of requests
    #[error("request count: expected {expected}, observed {observed}")]
    RequestCount {
        /// Predicted count
        expected: usize,
        /// Observed count
        observed: usize,
    },

    /// Verb differs
    #[error("request {index}: method expected {expected}, observed {observed}")]
    Method {
        /// Request position
        index: usize,
        /// Predicted verb
        expected: String,
        /// Observed verb
        observed: String,
    },

    /// Uri differs (exact for absolute expectations, suffix for relative)
    #[error("request {index}: uri expected {expected}, observed {observed}")]
    Uri {
        /// Request position
        index: usize,
        /// Predicted uri
        expected: String,
        /// Observed uri
        observed: String,
    },

    /// Header marked absent was sent
    #[error("request {index}: header {header} must be absent, observed '{observed}'")]
    UnexpectedHeader {
        /// Request position
        index: usize,
        /// Header name
        header: String,
        /// Observed value
        observed: String,
    },

    /// Required header was not sent
    #[error("request {index}: header {header} expected '{expected}', not sent")]
    MissingHeader {
        /// Request position
        index: usize,
        /// Header name
        header: String,
        /// Predicted value
        expected: String,
    },

    /// Header value differs
    #[error("request {index}: header {header} expected '{expected}', observed '{observed}'")]
    HeaderValue {
        /// Request position
        index: usize,
        /// Header name
        header: String,
        /// Predicted value
        expected: String,
        /// Observed value
        observed: String,
    },

    /// Batched vs. non-batched disagreement
    #[error("batch flag: expected {expected}, observed {observed}")]
    BatchFlag {
        /// Predicted flag
        expected: bool,
        /// Observed flag
        observed: bool,
    },

    /// Overall batch status differs
    #[error("batch status: expected {expected}, observed {observed}")]
    BatchStatus {
        /// Predicted code (-1 not applicable, 0 not sent)
        expected: i32,
        /// Observed code
        observed: i32,
    },

    /// Different number of operation results
    #[error("operation count: expected {expected}, observed {observed}")]
    OperationCount {
        /// Predicted count
        expected: usize,
        /// Observed count
        observed: usize,
    },

    /// Operation status differs
    #[error("operation {index}: status expected {expected}, observed {observed}")]
    OperationStatus {
        /// Operation position
        index: usize,
        /// Predicted status
        expected: u16,
        /// Observed status
        observed: u16,
    },

    /// Operation was reported for a different descriptor
    #[error("operation {index}: descriptor expected {expected}, observed {observed}")]
    OperationDescriptor {
        /// Operation position
        index: usize,
        /// Predicted descriptor
        expected: DescriptorId,
        /// Observed descriptor
        observed: DescriptorId,
    },

    /// Status on the wire differs from the predicted operation status
    #[error("request {index}: response status expected {expected}, observed {observed}")]
    WireStatus {
        /// Request position
        index: usize,
        /// Predicted status
        expected: u16,
        /// Status the server sent back
        observed: u16,
    },
}

impl Mismatch {
    /// Request or operation position, when the mismatch has one
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Method { index, .. }
            | Self::Uri { index, .. }
            | Self::UnexpectedHeader { index, .. }
            | Self::MissingHeader { index, .. }
            | Self::HeaderValue { index, .. }
            | Self::OperationStatus { index, .. }
            | Self::OperationDescriptor { index, .. }
            | Self::WireStatus { index, .. } => Some(*index),
            Self::RequestCount { .. }
            | Self::BatchFlag { .. }
            | Self::BatchStatus { .. }
            | Self::OperationCount { .. } => None,
        }
    }
}

fn render(mismatches: &[Mismatch]) -> String {
    mismatches
        .iter()
        .map(|m| format!("  - {m}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// All divergences found by one verification pass
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} mismatch(es):\n{}", .mismatches.len(), render(.mismatches))]
pub struct VerificationFailure {
    /// Every mismatch, in discovery order
    pub mismatches: Vec<Mismatch>,
}

impl VerificationFailure {
    /// First mismatch found
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&Mismatch> {
        self.mismatches.first()
    }

    pub(crate) fn check(mismatches: Vec<Mismatch>) -> Result<(), Self> {
        if mismatches.is_empty() {
            Ok(())
        } else {
            for mismatch in &mismatches {
                tracing::warn!(%mismatch, "verification mismatch");
            }
            Err(Self { mismatches })
        }
    }
}

/// Prefer header or protocol version inconsistency in an observed request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreferenceViolation {
    /// Preference configured but not sent
    #[error("{method} {uri}: Prefer header missing for preference {preference:?}")]
    MissingPrefer {
        /// Observed verb
        method: String,
        /// Observed uri
        uri: String,
        /// Configured preference
        preference: ResponsePreference,
    },

    /// Prefer sent where none applies
    #[error("{method} {uri}: unexpected Prefer header '{value}'")]
    UnexpectedPrefer {
        /// Observed verb
        method: String,
        /// Observed uri
        uri: String,
        /// Observed value
        value: String,
    },

    /// Prefer value does not encode the configured preference
    #[error("{uri}: Prefer expected '{expected}', observed '{observed}'")]
    WrongPreferValue {
        /// Observed uri
        uri: String,
        /// Predicted value
        expected: String,
        /// Observed value
        observed: String,
    },

    /// Version header missing alongside Prefer
    #[error("{uri}: {header} missing on a request carrying Prefer")]
    MissingVersion {
        /// Header name
        header: &'static str,
        /// Observed uri
        uri: String,
    },

    /// Version header not parseable
    #[error("{header}: invalid protocol version '{value}'")]
    InvalidVersion {
        /// Header name
        header: &'static str,
        /// Observed value
        value: String,
    },

    /// Prefer sent with a version that predates response preference
    #[error("{uri}: client defect: Prefer sent with {header} {found}, minimum is {minimum}")]
    VersionTooLow {
        /// Header name
        header: &'static str,
        /// Version found on the request
        found: ProtocolVersion,
        /// Minimum version supporting Prefer
        minimum: ProtocolVersion,
        /// Observed uri
        uri: String,
    },
}
