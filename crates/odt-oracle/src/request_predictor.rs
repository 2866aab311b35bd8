//! Request prediction
//!
//! Produces the requests a correct client sends for a snapshot: verb, uri
//! and the protocol headers the verifier checks. Headers left out of an
//! [`ExpectedRequest`] are not verified.

use crate::preference::is_create_or_update;
use http::Method;
use indexmap::IndexMap;
use odt_model::{
    header, ChangeSetSnapshot, DescriptorData, DescriptorId, EntityDescriptorData, EntityState,
    LinkDescriptorData, ModelError, ModelResult, ProtocolVersion, ResponsePreference,
    SaveRequest, ServiceModel,
};
use url::Url;

/// Expectation for one header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedHeader {
    /// Header must not be sent
    Absent,
    /// Header must be sent with exactly this value
    Value(String),
}

/// One predicted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedRequest {
    /// Canonical verb
    pub verb: Method,
    /// Absolute uri, or a uri relative to the service root
    pub uri: String,
    /// Headers to check; anything not listed is not verified
    pub headers: IndexMap<String, ExpectedHeader>,
    /// Descriptor the request is issued for; `None` for a `$batch` envelope
    pub descriptor: Option<DescriptorId>,
}

impl ExpectedRequest {
    /// Create an expectation without header checks
    #[must_use]
    pub fn new(verb: Method, uri: impl Into<String>) -> Self {
        Self {
            verb,
            uri: uri.into(),
            headers: IndexMap::new(),
            descriptor: None,
        }
    }

    /// Require a header value
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), ExpectedHeader::Value(value.into()));
        self
    }

    /// Require a header to be absent
    #[inline]
    #[must_use]
    pub fn without_header(mut self, name: impl Into<String>) -> Self {
        self.headers.insert(name.into(), ExpectedHeader::Absent);
        self
    }

    /// Attach the originating descriptor
    #[inline]
    #[must_use]
    pub fn for_descriptor(mut self, id: DescriptorId) -> Self {
        self.descriptor = Some(id);
        self
    }

    /// Whether the uri is absolute
    #[inline]
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        Url::parse(&self.uri).is_ok()
    }
}

/// What the predictor knows about the client configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientProfile {
    /// Service root; without it uris are predicted relative to the root
    pub service_root: Option<Url>,
    /// Version the client declares in `MaxDataServiceVersion`
    pub max_protocol_version: ProtocolVersion,
}

impl ClientProfile {
    /// Create a profile
    #[inline]
    #[must_use]
    pub fn new(service_root: Option<Url>, max_protocol_version: ProtocolVersion) -> Self {
        Self {
            service_root,
            max_protocol_version,
        }
    }

    fn absolute(&self, relative: &str) -> String {
        if Url::parse(relative).is_ok() {
            return relative.to_string();
        }
        match &self.service_root {
            Some(root) => format!(
                "{}/{}",
                root.as_str().trim_end_matches('/'),
                relative.trim_start_matches('/')
            ),
            None => relative.to_string(),
        }
    }
}

/// Predicts the ordered request sequence of a save
#[derive(Debug, Clone)]
pub struct RequestPredictor<'m> {
    model: &'m ServiceModel,
    profile: ClientProfile,
}

impl<'m> RequestPredictor<'m> {
    /// Create a predictor
    #[inline]
    #[must_use]
    pub fn new(model: &'m ServiceModel, profile: ClientProfile) -> Self {
        Self { model, profile }
    }

    /// Predict the requests of a save
    ///
    /// # Errors
    /// - [`ModelError::UnresolvedEntityType`] for an unknown entity type
    /// - [`ModelError::StreamMismatch`] when a media link entry and its
    ///   type's default stream disagree
    /// - [`ModelError::UnresolvableUri`] when an entity has neither an edit
    ///   link nor a key
    pub fn predict(
        &self,
        snapshot: &ChangeSetSnapshot,
        request: &SaveRequest,
    ) -> ModelResult<Vec<ExpectedRequest>> {
        let mut requests = Vec::new();
        for descriptor in snapshot.descriptors() {
            match descriptor {
                DescriptorData::Entity(entity) => {
                    self.entity_requests(entity, request, &mut requests)?;
                }
                DescriptorData::Link(link) => {
                    self.link_requests(snapshot, link, request.preference, &mut requests)?;
                }
            }
        }

        if request.is_batch() && !requests.is_empty() {
            let envelope = self
                .stamp(
                    ExpectedRequest::new(Method::POST, self.profile.absolute("$batch")),
                    ResponsePreference::Unspecified,
                );
            requests = vec![envelope];
        }

        tracing::debug!(requests = requests.len(), batch = request.is_batch(), "predicted save requests");
        Ok(requests)
    }

    fn entity_requests(
        &self,
        entity: &EntityDescriptorData,
        request: &SaveRequest,
        out: &mut Vec<ExpectedRequest>,
    ) -> ModelResult<()> {
        let stream_update = entity.has_pending_stream_update();
        if !entity.state.is_pending() && !stream_update {
            return Ok(());
        }
        let entity_set = &self.model.resolve_entity(entity)?.entity_set;
        let preference = request.preference;
        let update_verb = request.options.update_verb();

        if stream_update {
            let uri = format!("{}/$value", self.edit_link(entity, entity_set)?);
            out.push(self.entity_request(Method::PUT, uri, entity, preference));
        }

        match entity.state {
            EntityState::Added => {
                out.push(self.entity_request(Method::POST, entity_set.clone(), entity, preference));
                if entity.is_media_link_entry {
                    let uri = self.edit_link(entity, entity_set)?;
                    out.push(self.entity_request(update_verb, uri, entity, preference));
                }
            }
            EntityState::Modified => {
                let uri = self.edit_link(entity, entity_set)?;
                let expected = self.entity_request(update_verb, uri, entity, preference);
                out.push(with_etag(expected, entity));
            }
            EntityState::Deleted => {
                let uri = self.edit_link(entity, entity_set)?;
                let expected = self.entity_request(Method::DELETE, uri, entity, preference);
                out.push(with_etag(expected, entity));
            }
            EntityState::Unchanged => {}
        }
        Ok(())
    }

    fn link_requests(
        &self,
        snapshot: &ChangeSetSnapshot,
        link: &LinkDescriptorData,
        preference: ResponsePreference,
        out: &mut Vec<ExpectedRequest>,
    ) -> ModelResult<()> {
        let (verb, target_key) = match link.state {
            EntityState::Unchanged => return Ok(()),
            EntityState::Added | EntityState::Modified if !link.triggers_request => return Ok(()),
            EntityState::Added | EntityState::Modified if link.is_collection => (Method::POST, None),
            EntityState::Added | EntityState::Modified => (Method::PUT, None),
            EntityState::Deleted if link.is_collection => {
                (Method::DELETE, Some(self.target_key(snapshot, link)?))
            }
            EntityState::Deleted => (Method::DELETE, None),
        };

        let source = snapshot
            .entity(link.source)
            .ok_or(ModelError::UnknownLinkEndpoint {
                link: link.id,
                entity: link.source,
            })?;
        let source_set = &self.model.resolve(&source.type_name)?.entity_set;
        let mut uri = format!("{}/$links/{}", self.edit_link(source, source_set)?, link.property);
        if let Some(key) = target_key {
            uri = format!("{uri}({key})");
        }

        let expected = self.stamp(ExpectedRequest::new(verb, self.profile.absolute(&uri)), preference);
        out.push(expected.for_descriptor(link.id));
        Ok(())
    }

    fn target_key(&self, snapshot: &ChangeSetSnapshot, link: &LinkDescriptorData) -> ModelResult<String> {
        link.target
            .and_then(|id| snapshot.entity(id))
            .and_then(|target| target.key.clone())
            .ok_or_else(|| ModelError::unresolvable_uri(link.id, "deleted collection link has no target key"))
    }

    fn edit_link(&self, entity: &EntityDescriptorData, entity_set: &str) -> ModelResult<String> {
        match (&entity.edit_link, &entity.key) {
            (Some(link), _) => Ok(link.clone()),
            (None, Some(key)) => Ok(format!("{entity_set}({key})")),
            (None, None) => Err(ModelError::unresolvable_uri(entity.id, "no edit link or key")),
        }
    }

    fn entity_request(
        &self,
        verb: Method,
        uri: String,
        entity: &EntityDescriptorData,
        preference: ResponsePreference,
    ) -> ExpectedRequest {
        self.stamp(ExpectedRequest::new(verb, self.profile.absolute(&uri)), preference)
            .for_descriptor(entity.id)
    }

    /// Add the protocol headers every request carries
    fn stamp(&self, expected: ExpectedRequest, preference: ResponsePreference) -> ExpectedRequest {
        let expected = expected.with_header(
            header::MAX_DATA_SERVICE_VERSION,
            self.profile.max_protocol_version.header_value(),
        );
        match preference.prefer_header_value() {
            Some(value) if is_create_or_update(&expected.verb) => {
                expected.with_header(header::PREFER, value)
            }
            _ => expected.without_header(header::PREFER),
        }
    }
}

fn with_etag(expected: ExpectedRequest, entity: &EntityDescriptorData) -> ExpectedRequest {
    match &entity.etag {
        Some(etag) => expected.with_header(header::IF_MATCH, etag.clone()),
        None => expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odt_model::SaveChangesOptions;
    use pretty_assertions::assert_eq;

    fn model() -> ServiceModel {
        ServiceModel::new()
            .with_entity_type("Ns.Customer", "Customers")
            .with_entity_type("Ns.Order", "Orders")
            .with_media_type("Ns.Photo", "Photos")
    }

    fn profile() -> ClientProfile {
        ClientProfile::new(Some(Url::parse("http://host/svc/").unwrap()), ProtocolVersion::V3)
    }

    fn predict(descriptors: Vec<DescriptorData>, request: SaveRequest) -> Vec<ExpectedRequest> {
        let model = model();
        let snapshot = ChangeSetSnapshot::new(descriptors).unwrap();
        RequestPredictor::new(&model, profile()).predict(&snapshot, &request).unwrap()
    }

    fn lines(requests: &[ExpectedRequest]) -> Vec<String> {
        requests.iter().map(|r| format!("{} {}", r.verb, r.uri)).collect()
    }

    #[test]
    fn entity_verbs_and_uris() {
        let requests = predict(
            vec![
                EntityDescriptorData::new(1, "Ns.Customer", EntityState::Added).into(),
                EntityDescriptorData::new(2, "Ns.Customer", EntityState::Modified).with_key("2").into(),
                EntityDescriptorData::new(3, "Ns.Order", EntityState::Deleted)
                    .with_edit_link("http://other/svc/Orders(3)")
                    .into(),
            ],
            SaveRequest::single(),
        );

        assert_eq!(
            lines(&requests),
            vec![
                "POST http://host/svc/Customers",
                "MERGE http://host/svc/Customers(2)",
                "DELETE http://other/svc/Orders(3)",
            ]
        );
    }

    #[test]
    fn update_verb_follows_options() {
        let modified = EntityDescriptorData::new(1, "Ns.Customer", EntityState::Modified).with_key("1");
        let request = SaveRequest::new(SaveChangesOptions::PATCH_ON_UPDATE, ResponsePreference::Unspecified);
        let requests = predict(vec![modified.into()], request);
        assert_eq!(requests[0].verb, Method::PATCH);
    }

    #[test]
    fn prefer_only_on_create_or_update() {
        let requests = predict(
            vec![
                EntityDescriptorData::new(1, "Ns.Customer", EntityState::Added).into(),
                EntityDescriptorData::new(2, "Ns.Customer", EntityState::Deleted).with_key("2").into(),
            ],
            SaveRequest::single().with_preference(ResponsePreference::NoContent),
        );

        assert_eq!(
            requests[0].headers.get(header::PREFER),
            Some(&ExpectedHeader::Value("return-no-content".to_string()))
        );
        assert_eq!(requests[1].headers.get(header::PREFER), Some(&ExpectedHeader::Absent));
        assert_eq!(
            requests[1].headers.get(header::MAX_DATA_SERVICE_VERSION),
            Some(&ExpectedHeader::Value("3.0;NetFx".to_string()))
        );
    }

    #[test]
    fn etag_becomes_if_match() {
        let modified = EntityDescriptorData::new(1, "Ns.Customer", EntityState::Modified)
            .with_key("1")
            .with_etag("W/\"7\"");
        let requests = predict(vec![modified.into()], SaveRequest::single());
        assert_eq!(
            requests[0].headers.get(header::IF_MATCH),
            Some(&ExpectedHeader::Value("W/\"7\"".to_string()))
        );
    }

    #[test]
    fn media_link_entry_insert_then_update() {
        let photo = EntityDescriptorData::new(1, "Ns.Photo", EntityState::Added)
            .with_key("1")
            .media_link_entry(EntityState::Added);
        let requests = predict(vec![photo.into()], SaveRequest::single());
        assert_eq!(
            lines(&requests),
            vec!["POST http://host/svc/Photos", "MERGE http://host/svc/Photos(1)"]
        );
    }

    #[test]
    fn stream_update_goes_first() {
        let photo = EntityDescriptorData::new(1, "Ns.Photo", EntityState::Modified)
            .with_key("1")
            .media_link_entry(EntityState::Modified);
        let requests = predict(vec![photo.into()], SaveRequest::single());
        assert_eq!(
            lines(&requests),
            vec!["PUT http://host/svc/Photos(1)/$value", "MERGE http://host/svc/Photos(1)"]
        );
    }

    #[test]
    fn stream_only_change_on_unchanged_entity() {
        let photo = EntityDescriptorData::new(1, "Ns.Photo", EntityState::Unchanged)
            .with_key("1")
            .media_link_entry(EntityState::Modified);
        let requests = predict(vec![photo.into()], SaveRequest::single());
        assert_eq!(lines(&requests), vec!["PUT http://host/svc/Photos(1)/$value"]);
        assert_eq!(requests[0].descriptor, Some(DescriptorId(1)));
    }

    #[test]
    fn link_requests() {
        let customer = EntityDescriptorData::new(1, "Ns.Customer", EntityState::Unchanged).with_key("1");
        let order = EntityDescriptorData::new(2, "Ns.Order", EntityState::Unchanged).with_key("2");
        let added = LinkDescriptorData::new(3, DescriptorId(1), "Orders", Some(DescriptorId(2)), EntityState::Added)
            .collection();
        let removed = LinkDescriptorData::new(4, DescriptorId(1), "Orders", Some(DescriptorId(2)), EntityState::Deleted)
            .collection();
        let reference = LinkDescriptorData::new(5, DescriptorId(2), "Customer", Some(DescriptorId(1)), EntityState::Modified);
        let folded = LinkDescriptorData::new(6, DescriptorId(2), "Customer", Some(DescriptorId(1)), EntityState::Added)
            .folded();

        let requests = predict(
            vec![
                customer.into(),
                order.into(),
                added.into(),
                removed.into(),
                reference.into(),
                folded.into(),
            ],
            SaveRequest::single(),
        );
        assert_eq!(
            lines(&requests),
            vec![
                "POST http://host/svc/Customers(1)/$links/Orders",
                "DELETE http://host/svc/Customers(1)/$links/Orders(2)",
                "PUT http://host/svc/Orders(2)/$links/Customer",
            ]
        );
    }

    #[test]
    fn batch_collapses_into_one_envelope() {
        let requests = predict(
            vec![
                EntityDescriptorData::new(1, "Ns.Customer", EntityState::Added).into(),
                EntityDescriptorData::new(2, "Ns.Customer", EntityState::Deleted).with_key("2").into(),
            ],
            SaveRequest::batch().with_preference(ResponsePreference::IncludeContent),
        );
        assert_eq!(lines(&requests), vec!["POST http://host/svc/$batch"]);
        assert_eq!(requests[0].headers.get(header::PREFER), Some(&ExpectedHeader::Absent));
        assert_eq!(requests[0].descriptor, None);
    }

    #[test]
    fn empty_batch_sends_nothing() {
        let requests = predict(
            vec![EntityDescriptorData::new(1, "Ns.Customer", EntityState::Unchanged).into()],
            SaveRequest::batch(),
        );
        assert!(requests.is_empty());
    }

    #[test]
    fn relative_uris_without_service_root() {
        let model = model();
        let snapshot = ChangeSetSnapshot::new(vec![
            EntityDescriptorData::new(1, "Ns.Customer", EntityState::Modified).with_key("1").into(),
        ])
        .unwrap();
        let requests = RequestPredictor::new(&model, ClientProfile::default())
            .predict(&snapshot, &SaveRequest::single())
            .unwrap();
        assert_eq!(requests[0].uri, "Customers(1)");
        assert!(!requests[0].is_absolute());
    }

    #[test]
    fn entity_without_address_is_fatal() {
        let model = model();
        let snapshot = ChangeSetSnapshot::new(vec![
            EntityDescriptorData::new(1, "Ns.Customer", EntityState::Deleted).into(),
        ])
        .unwrap();
        let result = RequestPredictor::new(&model, profile()).predict(&snapshot, &SaveRequest::single());
        assert!(matches!(result, Err(ModelError::UnresolvableUri { .. })));
    }
}
