//! Expected-error comparison
//!
//! Checks the error raised by a save call against a baseline: the exact
//! error kind, then the message, either from the client-side catalog or,
//! for server-originated failures, from the XML body the service returned.

use crate::catalog::ResourceCatalog;
use crate::context::ObservedClientError;
use crate::error::CatalogError;
use crate::server_error::ServerErrorPayload;

/// A catalog message reference, optionally chained to an inner message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    /// Resource id
    pub id: String,
    /// Template arguments
    pub args: Vec<String>,
    /// Expected message of the next inner level
    pub inner: Option<Box<ResourceRef>>,
}

impl ResourceRef {
    /// Reference without arguments
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            args: Vec::new(),
            inner: None,
        }
    }

    /// With template arguments
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// With expected inner message
    #[inline]
    #[must_use]
    pub fn with_inner(mut self, inner: ResourceRef) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    fn chain(&self) -> impl Iterator<Item = &ResourceRef> {
        std::iter::successors(Some(self), |r| r.inner.as_deref())
    }
}

/// Where the expected message originates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedMessage {
    /// Raised by the client; matched against the outer error and its
    /// inner failures using the client catalog
    Client(ResourceRef),
    /// Returned by the service; matched against the XML error body using
    /// the server catalog
    Server(ResourceRef),
}

/// Baseline for an error the save call must raise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedClientError {
    /// Exact error kind
    pub kind: String,
    /// Expected message
    pub message: ExpectedMessage,
}

impl ExpectedClientError {
    /// Client-originated error
    #[must_use]
    pub fn client(kind: impl Into<String>, message: ResourceRef) -> Self {
        Self {
            kind: kind.into(),
            message: ExpectedMessage::Client(message),
        }
    }

    /// Server-originated error
    #[must_use]
    pub fn server(kind: impl Into<String>, message: ResourceRef) -> Self {
        Self {
            kind: kind.into(),
            message: ExpectedMessage::Server(message),
        }
    }
}

/// Error comparison failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorComparison {
    /// No error expected, one was raised
    #[error("no error expected, observed {kind}: {message}")]
    Unexpected {
        /// Observed kind
        kind: String,
        /// Observed message
        message: String,
    },

    /// Error expected, none raised
    #[error("expected {kind} but no error was raised")]
    Missing {
        /// Expected kind
        kind: String,
    },

    /// Wrong error kind
    #[error("error kind expected {expected}, observed {observed}")]
    WrongKind {
        /// Expected kind
        expected: String,
        /// Observed kind
        observed: String,
    },

    /// Message at some level differs
    #[error("message at level {level} expected '{expected}', observed '{observed}'")]
    Message {
        /// 0 for the outer error, increasing inward
        level: usize,
        /// Rendered expected message
        expected: String,
        /// Observed message, empty if the level does not exist
        observed: String,
    },

    /// Server message expected but no error body was captured
    #[error("no service error body found in the error chain")]
    MissingServerPayload,

    /// Service error body is not a valid error document
    #[error("malformed service error body: {0}")]
    MalformedServerPayload(String),

    /// Baseline references an unknown template
    #[error("{0}")]
    Catalog(#[from] CatalogError),
}

/// Compares raised errors with baselines
#[derive(Debug, Clone, Default)]
pub struct ErrorComparer {
    client: ResourceCatalog,
    server: ResourceCatalog,
    verify_server_messages: bool,
}

impl ErrorComparer {
    /// Create a comparer with injected catalogs
    #[must_use]
    pub fn new(client: ResourceCatalog, server: ResourceCatalog) -> Self {
        Self {
            client,
            server,
            verify_server_messages: true,
        }
    }

    /// Turn server message verification on or off
    #[inline]
    #[must_use]
    pub fn with_server_messages(mut self, verify: bool) -> Self {
        self.verify_server_messages = verify;
        self
    }

    /// Compare a raised error (if any) with the expected one (if any)
    ///
    /// # Errors
    /// The first [`ErrorComparison`] failure.
    pub fn compare(
        &self,
        expected: Option<&ExpectedClientError>,
        actual: Option<&ObservedClientError>,
    ) -> Result<(), ErrorComparison> {
        let (expected, actual) = match (expected, actual) {
            (None, None) => return Ok(()),
            (None, Some(actual)) => {
                return Err(ErrorComparison::Unexpected {
                    kind: actual.kind.clone(),
                    message: actual.message.clone(),
                })
            }
            (Some(expected), None) => {
                return Err(ErrorComparison::Missing {
                    kind: expected.kind.clone(),
                })
            }
            (Some(expected), Some(actual)) => (expected, actual),
        };

        if expected.kind != actual.kind {
            return Err(ErrorComparison::WrongKind {
                expected: expected.kind.clone(),
                observed: actual.kind.clone(),
            });
        }

        match &expected.message {
            ExpectedMessage::Client(message) => {
                let observed = actual.chain().map(|e| e.message.as_str());
                compare_chain(&self.client, message, observed)
            }
            ExpectedMessage::Server(_) if !self.verify_server_messages => {
                tracing::debug!("server message verification disabled");
                Ok(())
            }
            ExpectedMessage::Server(message) => {
                let body = actual
                    .chain()
                    .filter_map(|e| e.response_body.as_deref())
                    .last()
                    .ok_or(ErrorComparison::MissingServerPayload)?;
                let payload =
                    ServerErrorPayload::from_xml(body).map_err(ErrorComparison::MalformedServerPayload)?;
                let observed = payload.chain().map(|p| p.message.as_deref().unwrap_or_default());
                compare_chain(&self.server, message, observed)
            }
        }
    }
}

fn compare_chain<'a>(
    catalog: &ResourceCatalog,
    expected: &ResourceRef,
    mut observed: impl Iterator<Item = &'a str>,
) -> Result<(), ErrorComparison> {
    for (level, reference) in expected.chain().enumerate() {
        let rendered = catalog.format(&reference.id, &reference.args)?;
        let actual = observed.next().unwrap_or_default();
        if rendered != actual {
            return Err(ErrorComparison::Message {
                level,
                expected: rendered,
                observed: actual.to_string(),
            });
        }
    }
    Ok(())
}
