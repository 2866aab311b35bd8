//! Error types for the harness
//!
//! [`HarnessError`] separates harness wiring defects (model, config,
//! catalog) from failed verifications, which blame the client under test.

use odt_model::ModelError;
use std::path::PathBuf;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for the expected shape
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Resource catalog lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// No template registered under the id
    #[error("unknown resource id: '{0}'")]
    UnknownResource(String),

    /// Template refers to an argument that was not supplied
    #[error("resource '{id}' needs argument {{{index}}}, only {supplied} supplied")]
    MissingArgument {
        /// Resource id
        id: String,
        /// Placeholder index
        index: usize,
        /// Number of arguments supplied
        supplied: usize,
    },
}

/// Harness error
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Snapshot or service model problem
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Configuration problem
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Resource catalog problem
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Verification ran and found divergences
    #[error("save changes verification failed:\n{0}")]
    VerificationFailed(String),
}

impl HarnessError {
    /// Whether the failure blames the client under test rather than the
    /// harness wiring
    #[inline]
    #[must_use]
    pub fn is_client_defect(&self) -> bool {
        matches!(self, Self::VerificationFailed(_))
    }
}

/// Result type alias for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_argument_display() {
        let err = CatalogError::MissingArgument {
            id: "EntityNotFound".to_string(),
            index: 1,
            supplied: 1,
        };
        assert_eq!(
            err.to_string(),
            "resource 'EntityNotFound' needs argument {1}, only 1 supplied"
        );
    }

    #[test]
    fn defect_classification() {
        let model: HarnessError = ModelError::UnresolvedEntityType("Ns.Ghost".to_string()).into();
        assert!(!model.is_client_defect());
        assert!(HarnessError::VerificationFailed("x".to_string()).is_client_defect());
    }
}
