//! Pending-change descriptors
//!
//! A descriptor is what the client's change-tracking context holds for one
//! tracked entity or one tracked relationship. The two kinds are a closed
//! sum type so the predictors can match on them exhaustively.

use serde::{Deserialize, Serialize};

/// Stable descriptor identity, used as the back-reference from predicted
/// and observed operation results
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptorId(pub u64);

impl std::fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "descriptor #{}", self.0)
    }
}

/// Lifecycle state of a tracked entity, link or stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntityState {
    /// Tracked, nothing to save
    #[default]
    Unchanged,
    /// Will be inserted
    Added,
    /// Will be updated
    Modified,
    /// Will be deleted
    Deleted,
}

impl EntityState {
    /// Whether this state takes part in a save
    #[inline]
    #[must_use]
    pub fn is_pending(self) -> bool {
        !matches!(self, EntityState::Unchanged)
    }
}

/// A tracked entity instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptorData {
    /// Descriptor identity
    pub id: DescriptorId,
    /// Fully qualified entity type name
    pub type_name: String,
    /// Key predicate text, e.g. `1` or `'ALFKI'`
    #[serde(default)]
    pub key: Option<String>,
    /// Edit link, relative to the service root or absolute
    #[serde(default)]
    pub edit_link: Option<String>,
    /// Lifecycle state of the entity itself
    pub state: EntityState,
    /// Whether the entity has a default stream (media-link entry)
    #[serde(default)]
    pub is_media_link_entry: bool,
    /// Lifecycle state of the default stream
    #[serde(default)]
    pub stream_state: EntityState,
    /// Concurrency token sent as `If-Match`
    #[serde(default)]
    pub etag: Option<String>,
    /// Registration order within the tracking context
    pub change_order: u64,
}

impl EntityDescriptorData {
    /// Create a descriptor for a plain (non media-link) entity
    #[must_use]
    pub fn new(id: u64, type_name: impl Into<String>, state: EntityState) -> Self {
        Self {
            id: DescriptorId(id),
            type_name: type_name.into(),
            key: None,
            edit_link: None,
            state,
            is_media_link_entry: false,
            stream_state: EntityState::Unchanged,
            etag: None,
            change_order: id,
        }
    }

    /// With key predicate
    #[inline]
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// With edit link
    #[inline]
    #[must_use]
    pub fn with_edit_link(mut self, link: impl Into<String>) -> Self {
        self.edit_link = Some(link.into());
        self
    }

    /// Mark as media-link entry with the given stream state
    #[inline]
    #[must_use]
    pub fn media_link_entry(mut self, stream_state: EntityState) -> Self {
        self.is_media_link_entry = true;
        self.stream_state = stream_state;
        self
    }

    /// With etag
    #[inline]
    #[must_use]
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// With explicit change order
    #[inline]
    #[must_use]
    pub fn with_change_order(mut self, order: u64) -> Self {
        self.change_order = order;
        self
    }

    /// Whether the default stream has a pending update that is sent as its
    /// own request
    #[inline]
    #[must_use]
    pub fn has_pending_stream_update(&self) -> bool {
        self.is_media_link_entry
            && self.stream_state == EntityState::Modified
            && self.state != EntityState::Deleted
    }
}

/// A tracked relationship between two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDescriptorData {
    /// Descriptor identity
    pub id: DescriptorId,
    /// Source entity
    pub source: DescriptorId,
    /// Navigation property on the source
    pub property: String,
    /// Target entity, `None` when a reference is being cleared
    #[serde(default)]
    pub target: Option<DescriptorId>,
    /// Lifecycle state of the link
    pub state: EntityState,
    /// Collection navigation (`$links` POST) vs. reference (`$links` PUT)
    #[serde(default)]
    pub is_collection: bool,
    /// False when the link is folded into an endpoint entity's request
    #[serde(default = "default_true")]
    pub triggers_request: bool,
    /// Registration order within the tracking context
    pub change_order: u64,
}

fn default_true() -> bool {
    true
}

impl LinkDescriptorData {
    /// Create a link that triggers its own request
    #[must_use]
    pub fn new(
        id: u64,
        source: DescriptorId,
        property: impl Into<String>,
        target: Option<DescriptorId>,
        state: EntityState,
    ) -> Self {
        Self {
            id: DescriptorId(id),
            source,
            property: property.into(),
            target,
            state,
            is_collection: false,
            triggers_request: true,
            change_order: id,
        }
    }

    /// Mark as collection navigation
    #[inline]
    #[must_use]
    pub fn collection(mut self) -> Self {
        self.is_collection = true;
        self
    }

    /// Mark as folded into an endpoint entity's request
    #[inline]
    #[must_use]
    pub fn folded(mut self) -> Self {
        self.triggers_request = false;
        self
    }

    /// With explicit change order
    #[inline]
    #[must_use]
    pub fn with_change_order(mut self, order: u64) -> Self {
        self.change_order = order;
        self
    }
}

/// A pending-change record held by the tracking context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DescriptorData {
    /// Tracked entity
    Entity(EntityDescriptorData),
    /// Tracked relationship
    Link(LinkDescriptorData),
}

impl DescriptorData {
    /// Descriptor identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> DescriptorId {
        match self {
            DescriptorData::Entity(e) => e.id,
            DescriptorData::Link(l) => l.id,
        }
    }

    /// Lifecycle state
    #[inline]
    #[must_use]
    pub fn state(&self) -> EntityState {
        match self {
            DescriptorData::Entity(e) => e.state,
            DescriptorData::Link(l) => l.state,
        }
    }

    /// Registration order within the tracking context
    #[inline]
    #[must_use]
    pub fn change_order(&self) -> u64 {
        match self {
            DescriptorData::Entity(e) => e.change_order,
            DescriptorData::Link(l) => l.change_order,
        }
    }

    /// Entity payload, if this is an entity descriptor
    #[inline]
    #[must_use]
    pub fn as_entity(&self) -> Option<&EntityDescriptorData> {
        match self {
            DescriptorData::Entity(e) => Some(e),
            DescriptorData::Link(_) => None,
        }
    }
}

impl From<EntityDescriptorData> for DescriptorData {
    fn from(value: EntityDescriptorData) -> Self {
        DescriptorData::Entity(value)
    }
}

impl From<LinkDescriptorData> for DescriptorData {
    fn from(value: LinkDescriptorData) -> Self {
        DescriptorData::Link(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_states() {
        assert!(!EntityState::Unchanged.is_pending());
        assert!(EntityState::Added.is_pending());
        assert!(EntityState::Modified.is_pending());
        assert!(EntityState::Deleted.is_pending());
    }

    #[test]
    fn stream_update_requires_media_link_entry() {
        let plain = EntityDescriptorData::new(1, "Ns.Photo", EntityState::Modified);
        assert!(!plain.has_pending_stream_update());

        let mle = EntityDescriptorData::new(2, "Ns.Photo", EntityState::Modified)
            .media_link_entry(EntityState::Modified);
        assert!(mle.has_pending_stream_update());
    }

    #[test]
    fn deleted_media_link_entry_has_no_stream_update() {
        let mle = EntityDescriptorData::new(3, "Ns.Photo", EntityState::Deleted)
            .media_link_entry(EntityState::Modified);
        assert!(!mle.has_pending_stream_update());
    }

    #[test]
    fn link_defaults_to_triggering_request() {
        let link = LinkDescriptorData::new(
            4,
            DescriptorId(1),
            "Orders",
            Some(DescriptorId(2)),
            EntityState::Added,
        );
        assert!(link.triggers_request);
        assert!(!link.folded().triggers_request);
    }

    #[test]
    fn descriptor_json_shape() {
        let json = r#"{"kind":"link","id":5,"source":1,"property":"Orders","target":2,"state":"Added","change_order":5}"#;
        let descriptor: DescriptorData = serde_json::from_str(json).unwrap();
        match descriptor {
            DescriptorData::Link(link) => {
                assert!(link.triggers_request);
                assert!(!link.is_collection);
                assert_eq!(link.target, Some(DescriptorId(2)));
            }
            DescriptorData::Entity(_) => panic!("expected link"),
        }
    }
}
