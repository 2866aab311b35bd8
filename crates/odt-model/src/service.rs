//! Service model: entity types and the sets they live in

use crate::descriptor::EntityDescriptorData;
use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What the harness knows about one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeInfo {
    /// Entity set the type is inserted into
    pub entity_set: String,
    /// Whether instances carry a default stream
    #[serde(default)]
    pub has_stream: bool,
}

/// Entity type name to entity set mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceModel {
    types: HashMap<String, EntityTypeInfo>,
}

impl ServiceModel {
    /// Create an empty model
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an entity type
    #[must_use]
    pub fn with_entity_type(mut self, type_name: impl Into<String>, entity_set: impl Into<String>) -> Self {
        self.types.insert(
            type_name.into(),
            EntityTypeInfo {
                entity_set: entity_set.into(),
                has_stream: false,
            },
        );
        self
    }

    /// Declare an entity type that carries a default stream
    #[must_use]
    pub fn with_media_type(mut self, type_name: impl Into<String>, entity_set: impl Into<String>) -> Self {
        self.types.insert(
            type_name.into(),
            EntityTypeInfo {
                entity_set: entity_set.into(),
                has_stream: true,
            },
        );
        self
    }

    /// Resolve an entity type
    ///
    /// # Errors
    /// [`ModelError::UnresolvedEntityType`] when the type is not declared.
    pub fn resolve(&self, type_name: &str) -> ModelResult<&EntityTypeInfo> {
        self.types
            .get(type_name)
            .ok_or_else(|| ModelError::UnresolvedEntityType(type_name.to_string()))
    }

    /// Resolve an entity's type and check its media link entry flag
    /// against the type's default stream
    ///
    /// # Errors
    /// - [`ModelError::UnresolvedEntityType`] when the type is not declared
    /// - [`ModelError::StreamMismatch`] when the flags disagree
    pub fn resolve_entity(&self, entity: &EntityDescriptorData) -> ModelResult<&EntityTypeInfo> {
        let info = self.resolve(&entity.type_name)?;
        if info.has_stream != entity.is_media_link_entry {
            return Err(ModelError::StreamMismatch {
                descriptor: entity.id,
                type_name: entity.type_name.clone(),
                is_media_link_entry: entity.is_media_link_entry,
                has_stream: info.has_stream,
            });
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_declared_types() {
        let model = ServiceModel::new()
            .with_entity_type("Ns.Customer", "Customers")
            .with_media_type("Ns.Photo", "Photos");

        assert_eq!(model.resolve("Ns.Customer").unwrap().entity_set, "Customers");
        assert!(model.resolve("Ns.Photo").unwrap().has_stream);
    }

    #[test]
    fn media_link_entry_must_match_stream() {
        use crate::descriptor::{DescriptorId, EntityState};

        let model = ServiceModel::new()
            .with_entity_type("Ns.Customer", "Customers")
            .with_media_type("Ns.Photo", "Photos");

        let photo = EntityDescriptorData::new(1, "Ns.Photo", EntityState::Added)
            .media_link_entry(EntityState::Added);
        assert_eq!(model.resolve_entity(&photo).unwrap().entity_set, "Photos");

        let plain_photo = EntityDescriptorData::new(2, "Ns.Photo", EntityState::Added);
        assert!(matches!(
            model.resolve_entity(&plain_photo),
            Err(ModelError::StreamMismatch { descriptor: DescriptorId(2), has_stream: true, .. })
        ));

        let streamed_customer = EntityDescriptorData::new(3, "Ns.Customer", EntityState::Modified)
            .media_link_entry(EntityState::Modified);
        assert!(matches!(
            model.resolve_entity(&streamed_customer),
            Err(ModelError::StreamMismatch { is_media_link_entry: true, has_stream: false, .. })
        ));
    }

    #[test]
    fn unknown_type_is_fatal() {
        let model = ServiceModel::new();
        assert_eq!(
            model.resolve("Ns.Ghost"),
            Err(ModelError::UnresolvedEntityType("Ns.Ghost".to_string()))
        );
    }
}
