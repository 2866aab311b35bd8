//! Response prediction
//!
//! Walks a pre-save snapshot in change order and produces the per-change
//! results a correct client reports back from SaveChanges.

use odt_model::{
    ChangeOperationResponseData, ChangeSetSnapshot, DataServiceResponseData, DescriptorData,
    DescriptorId, EntityDescriptorData, EntityState, LinkDescriptorData, ModelResult,
    ResponsePreference, SaveRequest, ServiceModel,
};
use http::StatusCode;

/// Predicts [`DataServiceResponseData`] from a snapshot
///
/// # Characteristics
/// - Order of results mirrors the snapshot's change order
/// - A media-link entry insert yields two results (media resource, then
///   properties)
/// - A pending stream update yields its own result ahead of the entity's
#[derive(Debug, Clone, Copy)]
pub struct ResponsePredictor<'m> {
    model: &'m ServiceModel,
}

impl<'m> ResponsePredictor<'m> {
    /// Create a predictor over a service model
    #[inline]
    #[must_use]
    pub fn new(model: &'m ServiceModel) -> Self {
        Self { model }
    }

    /// Predict the save result
    ///
    /// # Errors
    /// - [`odt_model::ModelError::UnresolvedEntityType`] when a pending entity's
    ///   type is not in the service model
    /// - [`odt_model::ModelError::StreamMismatch`] when a media link entry
    ///   and its type's default stream disagree
    pub fn predict(
        &self,
        snapshot: &ChangeSetSnapshot,
        request: &SaveRequest,
    ) -> ModelResult<DataServiceResponseData> {
        let mut operations = Vec::new();

        for descriptor in snapshot.descriptors() {
            match descriptor {
                DescriptorData::Entity(entity) => {
                    self.predict_entity(entity, request.preference, &mut operations)?;
                }
                DescriptorData::Link(link) => predict_link(link, &mut operations),
            }
        }

        tracing::debug!(
            operations = operations.len(),
            batch = request.is_batch(),
            "predicted save responses"
        );

        Ok(if request.is_batch() {
            DataServiceResponseData::batch(operations)
        } else {
            DataServiceResponseData::single(operations)
        })
    }

    fn predict_entity(
        &self,
        entity: &EntityDescriptorData,
        preference: ResponsePreference,
        operations: &mut Vec<ChangeOperationResponseData>,
    ) -> ModelResult<()> {
        let stream_update = entity.has_pending_stream_update();
        if !entity.state.is_pending() && !stream_update {
            return Ok(());
        }
        self.model.resolve_entity(entity)?;

        // the stream goes out before the entity's own state is considered
        if stream_update {
            push(operations, entity.id, StatusCode::NO_CONTENT);
        }

        let status = match entity.state {
            EntityState::Added => {
                let insert = preference.insert_status();
                if entity.is_media_link_entry {
                    // media resource POST, then the properties go out as an update
                    push(operations, entity.id, insert);
                    preference.update_status()
                } else {
                    insert
                }
            }
            EntityState::Modified => preference.update_status(),
            EntityState::Deleted => StatusCode::NO_CONTENT,
            EntityState::Unchanged => return Ok(()),
        };

        push(operations, entity.id, status);
        Ok(())
    }
}

fn predict_link(link: &LinkDescriptorData, operations: &mut Vec<ChangeOperationResponseData>) {
    match link.state {
        EntityState::Added | EntityState::Modified if !link.triggers_request => {}
        EntityState::Added | EntityState::Modified | EntityState::Deleted => {
            push(operations, link.id, StatusCode::NO_CONTENT);
        }
        EntityState::Unchanged => {}
    }
}

fn push(operations: &mut Vec<ChangeOperationResponseData>, id: DescriptorId, status: StatusCode) {
    operations.push(ChangeOperationResponseData::new(id, status));
}

#[cfg(test)]
mod tests {
    use super::*;
    use odt_model::{BatchStatus, ModelError};

    fn model() -> ServiceModel {
        ServiceModel::new()
            .with_entity_type("Ns.Customer", "Customers")
            .with_media_type("Ns.Photo", "Photos")
    }

    fn statuses(response: &DataServiceResponseData) -> Vec<u16> {
        response.operations.iter().map(|o| o.status.as_u16()).collect()
    }

    fn predict(descriptors: Vec<DescriptorData>, request: SaveRequest) -> DataServiceResponseData {
        let model = model();
        let snapshot = ChangeSetSnapshot::new(descriptors).unwrap();
        ResponsePredictor::new(&model).predict(&snapshot, &request).unwrap()
    }

    #[test]
    fn added_entity_uses_insert_rule() {
        let added = EntityDescriptorData::new(1, "Ns.Customer", EntityState::Added);

        let default = predict(vec![added.clone().into()], SaveRequest::single());
        assert_eq!(statuses(&default), vec![201]);

        let no_content = predict(
            vec![added.into()],
            SaveRequest::single().with_preference(ResponsePreference::NoContent),
        );
        assert_eq!(statuses(&no_content), vec![204]);
    }

    #[test]
    fn modified_entity_uses_update_rule() {
        let modified = EntityDescriptorData::new(1, "Ns.Customer", EntityState::Modified);

        let include = predict(
            vec![modified.clone().into()],
            SaveRequest::single().with_preference(ResponsePreference::IncludeContent),
        );
        assert_eq!(statuses(&include), vec![200]);

        let default = predict(vec![modified.into()], SaveRequest::single());
        assert_eq!(statuses(&default), vec![204]);
    }

    #[test]
    fn media_link_entry_insert_emits_two_operations() {
        let photo = EntityDescriptorData::new(1, "Ns.Photo", EntityState::Added)
            .media_link_entry(EntityState::Added);

        let response = predict(
            vec![photo.into()],
            SaveRequest::single().with_preference(ResponsePreference::IncludeContent),
        );
        assert_eq!(statuses(&response), vec![201, 200]);
        assert!(response.operations.iter().all(|o| o.descriptor == DescriptorId(1)));
    }

    #[test]
    fn stream_update_precedes_entity_update() {
        let photo = EntityDescriptorData::new(1, "Ns.Photo", EntityState::Modified)
            .media_link_entry(EntityState::Modified);

        let response = predict(
            vec![photo.into()],
            SaveRequest::single().with_preference(ResponsePreference::IncludeContent),
        );
        assert_eq!(statuses(&response), vec![204, 200]);
    }

    #[test]
    fn stream_only_change_on_unchanged_entity() {
        let photo = EntityDescriptorData::new(1, "Ns.Photo", EntityState::Unchanged)
            .media_link_entry(EntityState::Modified);
        let response = predict(vec![photo.into()], SaveRequest::single());
        assert_eq!(statuses(&response), vec![204]);
        assert_eq!(response.operations[0].descriptor, DescriptorId(1));
    }

    #[test]
    fn unchanged_media_link_entry_with_unchanged_stream_is_skipped() {
        let photo = EntityDescriptorData::new(1, "Ns.Photo", EntityState::Unchanged)
            .media_link_entry(EntityState::Unchanged);
        let response = predict(vec![photo.into()], SaveRequest::single());
        assert!(!response.has_changes());
    }

    #[test]
    fn media_flag_disagreeing_with_model_is_fatal() {
        let model = model();
        let plain_photo = EntityDescriptorData::new(1, "Ns.Photo", EntityState::Added);
        let snapshot = ChangeSetSnapshot::new(vec![plain_photo.into()]).unwrap();

        let result = ResponsePredictor::new(&model).predict(&snapshot, &SaveRequest::single());
        assert!(matches!(result, Err(ModelError::StreamMismatch { .. })));
    }

    #[test]
    fn deleted_media_link_entry_is_single_no_content() {
        let photo = EntityDescriptorData::new(1, "Ns.Photo", EntityState::Deleted)
            .media_link_entry(EntityState::Modified);
        let response = predict(vec![photo.into()], SaveRequest::single());
        assert_eq!(statuses(&response), vec![204]);
    }

    #[test]
    fn folded_links_are_skipped() {
        let customer = EntityDescriptorData::new(1, "Ns.Customer", EntityState::Added);
        let order = EntityDescriptorData::new(2, "Ns.Customer", EntityState::Added);
        let folded = LinkDescriptorData::new(3, DescriptorId(1), "Orders", Some(DescriptorId(2)), EntityState::Added)
            .collection()
            .folded();
        let deleted = LinkDescriptorData::new(4, DescriptorId(1), "Orders", Some(DescriptorId(2)), EntityState::Deleted)
            .collection()
            .folded();

        let response = predict(
            vec![customer.into(), order.into(), folded.into(), deleted.into()],
            SaveRequest::single(),
        );
        let ids: Vec<_> = response.operations.iter().map(|o| o.descriptor.0).collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn results_follow_change_order() {
        let first = EntityDescriptorData::new(1, "Ns.Customer", EntityState::Deleted).with_change_order(20);
        let second = EntityDescriptorData::new(2, "Ns.Customer", EntityState::Added).with_change_order(10);

        let response = predict(vec![first.into(), second.into()], SaveRequest::single());
        let ids: Vec<_> = response.operations.iter().map(|o| o.descriptor.0).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn batch_status_shaping() {
        let added = EntityDescriptorData::new(1, "Ns.Customer", EntityState::Added);
        let unchanged = EntityDescriptorData::new(2, "Ns.Customer", EntityState::Unchanged);

        let sent = predict(vec![added.clone().into()], SaveRequest::batch());
        assert_eq!(sent.batch_status.code(), 202);

        let not_sent = predict(vec![unchanged.into()], SaveRequest::batch());
        assert_eq!(not_sent.batch_status, BatchStatus::NotSent);

        let single = predict(vec![added.into()], SaveRequest::single());
        assert_eq!(single.batch_status.code(), -1);
    }

    #[test]
    fn unresolved_type_fails_fast() {
        let model = model();
        let ghost = EntityDescriptorData::new(1, "Ns.Ghost", EntityState::Added);
        let snapshot = ChangeSetSnapshot::new(vec![ghost.into()]).unwrap();

        let result = ResponsePredictor::new(&model).predict(&snapshot, &SaveRequest::single());
        assert_eq!(result, Err(ModelError::UnresolvedEntityType("Ns.Ghost".to_string())));
    }
}
