//! Save options, response preference and protocol versions

use crate::error::ModelError;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

bitflags::bitflags! {
    /// Options passed to the client's save call
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SaveChangesOptions: u8 {
        /// Send every change in one `$batch` request
        const BATCH = 0b0001;
        /// Keep going after a failed operation
        const CONTINUE_ON_ERROR = 0b0010;
        /// Updates replace the whole entity (`PUT`)
        const REPLACE_ON_UPDATE = 0b0100;
        /// Updates use `PATCH` instead of `MERGE`
        const PATCH_ON_UPDATE = 0b1000;
    }
}

impl SaveChangesOptions {
    /// Verb the client uses to update an entity under these options
    #[must_use]
    pub fn update_verb(self) -> Method {
        if self.contains(Self::PATCH_ON_UPDATE) {
            Method::PATCH
        } else if self.contains(Self::REPLACE_ON_UPDATE) {
            Method::PUT
        } else {
            merge_method()
        }
    }
}

/// The `MERGE` extension verb
#[must_use]
pub fn merge_method() -> Method {
    Method::from_bytes(b"MERGE").unwrap_or(Method::PATCH)
}

/// Client-configured hint for what create/update responses should carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResponsePreference {
    /// Nothing configured
    #[default]
    Unspecified,
    /// Explicitly no preference
    None,
    /// Ask the service to return the resource
    IncludeContent,
    /// Ask the service to return no body
    NoContent,
}

impl ResponsePreference {
    /// Whether the client sends a `Prefer` header for this setting
    #[inline]
    #[must_use]
    pub fn is_set(self) -> bool {
        matches!(self, Self::IncludeContent | Self::NoContent)
    }

    /// Value of the `Prefer` header, if one is sent
    #[inline]
    #[must_use]
    pub fn prefer_header_value(self) -> Option<&'static str> {
        match self {
            Self::IncludeContent => Some("return-content"),
            Self::NoContent => Some("return-no-content"),
            Self::Unspecified | Self::None => None,
        }
    }

    /// Expected status for an insert
    #[inline]
    #[must_use]
    pub fn insert_status(self) -> StatusCode {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT,
            _ => StatusCode::CREATED,
        }
    }

    /// Expected status for an update
    #[inline]
    #[must_use]
    pub fn update_status(self) -> StatusCode {
        match self {
            Self::IncludeContent => StatusCode::OK,
            _ => StatusCode::NO_CONTENT,
        }
    }
}

/// Everything about one save call that shapes the expected traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveRequest {
    /// Options passed to the save call
    pub options: SaveChangesOptions,
    /// Response preference configured on the context
    pub preference: ResponsePreference,
}

impl SaveRequest {
    /// Create a request
    #[inline]
    #[must_use]
    pub fn new(options: SaveChangesOptions, preference: ResponsePreference) -> Self {
        Self { options, preference }
    }

    /// Non-batched save without a preference
    #[inline]
    #[must_use]
    pub fn single() -> Self {
        Self::default()
    }

    /// Batched save without a preference
    #[inline]
    #[must_use]
    pub fn batch() -> Self {
        Self::new(SaveChangesOptions::BATCH, ResponsePreference::Unspecified)
    }

    /// With response preference
    #[inline]
    #[must_use]
    pub fn with_preference(mut self, preference: ResponsePreference) -> Self {
        self.preference = preference;
        self
    }

    /// Whether the save is sent as one `$batch` request
    #[inline]
    #[must_use]
    pub fn is_batch(&self) -> bool {
        self.options.contains(SaveChangesOptions::BATCH)
    }
}

/// Data service protocol version
///
/// Serialised as text (`"3.0"`), the way it appears in headers and config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProtocolVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
}

impl ProtocolVersion {
    /// Protocol 1.0
    pub const V1: Self = Self::new(1, 0);
    /// Protocol 2.0
    pub const V2: Self = Self::new(2, 0);
    /// Protocol 3.0
    pub const V3: Self = Self::new(3, 0);
    /// First version in which services honour `Prefer`
    pub const RESPONSE_PREFERENCE_MIN: Self = Self::V3;

    /// Create a version
    #[inline]
    #[must_use]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Value the client writes into version headers
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("{}.{};NetFx", self.major, self.minor)
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::V3
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ProtocolVersion {
    type Err = ModelError;

    /// Parse `3.0`, `3.0;NetFx` or `3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidProtocolVersion(s.to_string());
        let version = s.split(';').next().map(str::trim).unwrap_or_default();
        let mut parts = version.splitn(2, '.');
        let major = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(invalid)?
            .parse()
            .map_err(|_| invalid())?;
        let minor = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };
        Ok(Self::new(major, minor))
    }
}

impl TryFrom<String> for ProtocolVersion {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProtocolVersion> for String {
    fn from(value: ProtocolVersion) -> Self {
        value.to_string()
    }
}

/// The pair of versions a client declares on every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionPair {
    /// `DataServiceVersion`
    pub current: ProtocolVersion,
    /// `MaxDataServiceVersion`
    pub max: ProtocolVersion,
}

impl VersionPair {
    /// Create a pair
    #[inline]
    #[must_use]
    pub fn new(current: ProtocolVersion, max: ProtocolVersion) -> Self {
        Self { current, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_verb_follows_options() {
        assert_eq!(SaveChangesOptions::empty().update_verb().as_str(), "MERGE");
        assert_eq!(SaveChangesOptions::REPLACE_ON_UPDATE.update_verb(), Method::PUT);
        assert_eq!(
            (SaveChangesOptions::PATCH_ON_UPDATE | SaveChangesOptions::BATCH).update_verb(),
            Method::PATCH
        );
    }

    #[test]
    fn preference_statuses() {
        assert_eq!(ResponsePreference::NoContent.insert_status(), StatusCode::NO_CONTENT);
        assert_eq!(ResponsePreference::Unspecified.insert_status(), StatusCode::CREATED);
        assert_eq!(ResponsePreference::IncludeContent.insert_status(), StatusCode::CREATED);
        assert_eq!(ResponsePreference::IncludeContent.update_status(), StatusCode::OK);
        assert_eq!(ResponsePreference::None.update_status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn prefer_values() {
        assert_eq!(
            ResponsePreference::IncludeContent.prefer_header_value(),
            Some("return-content")
        );
        assert_eq!(
            ResponsePreference::NoContent.prefer_header_value(),
            Some("return-no-content")
        );
        assert_eq!(ResponsePreference::None.prefer_header_value(), None);
    }

    #[test]
    fn parses_header_versions() {
        assert_eq!("3.0;NetFx".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::V3);
        assert_eq!("2.0".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::V2);
        assert_eq!(" 1 ".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::V1);
        assert!("".parse::<ProtocolVersion>().is_err());
        assert!("three".parse::<ProtocolVersion>().is_err());
    }

    #[test]
    fn versions_order() {
        assert!(ProtocolVersion::V2 < ProtocolVersion::RESPONSE_PREFERENCE_MIN);
        assert!(ProtocolVersion::new(3, 1) > ProtocolVersion::V3);
        assert_eq!(ProtocolVersion::V3.header_value(), "3.0;NetFx");
    }
}
