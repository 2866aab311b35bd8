//! Resource-string catalogs
//!
//! Error messages are compared against localized templates rather than
//! literals. Catalogs are injected, one for client-side and one for
//! server-side messages.

use crate::error::CatalogError;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{(\d+)\}").expect("placeholder pattern is valid"))
}

/// Mapping from resource id to message template with `{0}`-style arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ResourceCatalog {
    templates: HashMap<String, String>,
}

impl ResourceCatalog {
    /// Create an empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a template
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(id.into(), template.into());
        self
    }

    /// Load a flat `id = "template"` TOML table
    ///
    /// # Errors
    /// [`toml::de::Error`] for malformed TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Raw template
    #[inline]
    #[must_use]
    pub fn template(&self, id: &str) -> Option<&str> {
        self.templates.get(id).map(String::as_str)
    }

    /// Render a template with arguments substituted
    ///
    /// # Errors
    /// - [`CatalogError::UnknownResource`] when `id` is not registered
    /// - [`CatalogError::MissingArgument`] when a placeholder has no argument
    pub fn format<S: AsRef<str>>(&self, id: &str, args: &[S]) -> Result<String, CatalogError> {
        let template = self
            .template(id)
            .ok_or_else(|| CatalogError::UnknownResource(id.to_string()))?;

        let mut missing = None;
        let rendered = placeholder().replace_all(template, |caps: &Captures<'_>| {
            let index: usize = caps[1].parse().unwrap_or(usize::MAX);
            match args.get(index) {
                Some(arg) => arg.as_ref().to_string(),
                None => {
                    missing.get_or_insert(index);
                    String::new()
                }
            }
        });

        match missing {
            Some(index) => Err(CatalogError::MissingArgument {
                id: id.to_string(),
                index,
                supplied: args.len(),
            }),
            None => Ok(rendered.into_owned()),
        }
    }
}
