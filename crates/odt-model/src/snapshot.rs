//! Change-set snapshot
//!
//! An immutable copy of the tracking context's descriptors, captured before
//! a save starts. Both predictors read from the same snapshot, so nothing
//! the client does during the save can change the prediction.

use crate::descriptor::{DescriptorData, DescriptorId, EntityDescriptorData};
use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Immutable, change-ordered view of tracked descriptors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DescriptorData>", into = "Vec<DescriptorData>")]
pub struct ChangeSetSnapshot {
    descriptors: Vec<DescriptorData>,
    index: HashMap<DescriptorId, usize>,
}

impl ChangeSetSnapshot {
    /// Capture a snapshot
    ///
    /// Descriptors are ordered by `change_order`; ties keep capture order.
    ///
    /// # Errors
    /// - [`ModelError::DuplicateDescriptor`] when two descriptors share an id
    /// - [`ModelError::UnknownLinkEndpoint`] when a link's source or target
    ///   is not an entity in the snapshot
    pub fn new(descriptors: impl IntoIterator<Item = DescriptorData>) -> ModelResult<Self> {
        let mut descriptors: Vec<_> = descriptors.into_iter().collect();
        descriptors.sort_by_key(DescriptorData::change_order);

        let mut index = HashMap::with_capacity(descriptors.len());
        for (position, descriptor) in descriptors.iter().enumerate() {
            if index.insert(descriptor.id(), position).is_some() {
                return Err(ModelError::DuplicateDescriptor(descriptor.id()));
            }
        }

        let snapshot = Self { descriptors, index };
        snapshot.check_link_endpoints()?;
        Ok(snapshot)
    }

    /// Empty snapshot
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            descriptors: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn check_link_endpoints(&self) -> ModelResult<()> {
        for descriptor in &self.descriptors {
            let DescriptorData::Link(link) = descriptor else {
                continue;
            };
            for endpoint in std::iter::once(link.source).chain(link.target) {
                if self.entity(endpoint).is_none() {
                    return Err(ModelError::UnknownLinkEndpoint {
                        link: link.id,
                        entity: endpoint,
                    });
                }
            }
        }
        Ok(())
    }

    /// All descriptors in change order
    #[inline]
    #[must_use]
    pub fn descriptors(&self) -> &[DescriptorData] {
        &self.descriptors
    }

    /// Descriptors that take part in a save, in change order
    pub fn pending(&self) -> impl Iterator<Item = &DescriptorData> {
        self.descriptors.iter().filter(|d| {
            d.state().is_pending() || d.as_entity().is_some_and(EntityDescriptorData::has_pending_stream_update)
        })
    }

    /// Look up any descriptor by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: DescriptorId) -> Option<&DescriptorData> {
        self.index.get(&id).map(|&i| &self.descriptors[i])
    }

    /// Look up an entity descriptor by id
    #[inline]
    #[must_use]
    pub fn entity(&self, id: DescriptorId) -> Option<&EntityDescriptorData> {
        self.get(id).and_then(DescriptorData::as_entity)
    }

    /// Number of descriptors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the snapshot tracks nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Decode a snapshot fixture from JSON
    ///
    /// # Errors
    /// [`ModelError::InvalidFixture`] for malformed JSON, plus the errors of
    /// [`ChangeSetSnapshot::new`].
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let descriptors: Vec<DescriptorData> =
            serde_json::from_str(json).map_err(|e| ModelError::InvalidFixture(e.to_string()))?;
        Self::new(descriptors)
    }
}

impl Default for ChangeSetSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<Vec<DescriptorData>> for ChangeSetSnapshot {
    type Error = ModelError;

    fn try_from(value: Vec<DescriptorData>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChangeSetSnapshot> for Vec<DescriptorData> {
    fn from(value: ChangeSetSnapshot) -> Self {
        value.descriptors
    }
}
