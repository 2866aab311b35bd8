//! Harness configuration

use crate::error::ConfigError;
use odt_model::ProtocolVersion;
use odt_oracle::ClientProfile;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Harness configuration
///
/// ```toml
/// verify_server_messages = false
/// service_root = "http://localhost:8080/Northwind.svc/"
/// max_protocol_version = "3.0"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Whether server-originated error messages are compared; some
    /// environments never see the raw server payload
    pub verify_server_messages: bool,
    /// Whether observed requests are checked for Prefer/version consistency
    pub verify_prefer_header: bool,
    /// Service root; without it request uris are predicted root-relative
    pub service_root: Option<Url>,
    /// Overrides the `MaxDataServiceVersion` the context declares
    pub max_protocol_version: Option<ProtocolVersion>,
}

impl HarnessConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With server message verification on or off
    #[inline]
    #[must_use]
    pub fn with_server_messages(mut self, verify: bool) -> Self {
        self.verify_server_messages = verify;
        self
    }

    /// With Prefer header checks on or off
    #[inline]
    #[must_use]
    pub fn with_prefer_checks(mut self, verify: bool) -> Self {
        self.verify_prefer_header = verify;
        self
    }

    /// With service root
    #[inline]
    #[must_use]
    pub fn with_service_root(mut self, root: Url) -> Self {
        self.service_root = Some(root);
        self
    }

    /// With max protocol version pinned regardless of the context
    #[inline]
    #[must_use]
    pub fn with_max_protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.max_protocol_version = Some(version);
        self
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// [`ConfigError::Parse`] for malformed TOML or unknown value shapes.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`HarnessConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Client profile handed to the request predictor
    ///
    /// `declared` is the max version the context reports; a configured
    /// version takes precedence.
    #[must_use]
    pub fn client_profile(&self, declared: ProtocolVersion) -> ClientProfile {
        let max = self.max_protocol_version.unwrap_or(declared);
        ClientProfile::new(self.service_root.clone(), max)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            verify_server_messages: true,
            verify_prefer_header: true,
            service_root: None,
            max_protocol_version: None,
        }
    }
}
