//! Seam to the client under test
//!
//! The harness never talks HTTP itself. It drives a [`TrackingContext`],
//! listens to the requests it sends and reads its descriptors.

use async_trait::async_trait;
use odt_model::{
    DataServiceResponseData, DescriptorData, HttpExchange, ResponsePreference,
    SaveChangesOptions, VersionPair,
};
use std::sync::Arc;

/// Handle for a registered request observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// Receives every request/response pair the client emits
pub trait RequestObserver: Send + Sync {
    /// Called once per exchange, in emission order
    fn on_request_sent(&self, exchange: &HttpExchange);
}

/// Error raised by the client's save call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedClientError {
    /// Error category, e.g. `DataServiceRequestException`
    pub kind: String,
    /// Message text
    pub message: String,
    /// Inner failure
    pub inner: Option<Box<ObservedClientError>>,
    /// Raw error body returned by the service, if this failure carries one
    pub response_body: Option<String>,
}

impl ObservedClientError {
    /// Create an error without inner failure or body
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            inner: None,
            response_body: None,
        }
    }

    /// With inner failure
    #[inline]
    #[must_use]
    pub fn with_inner(mut self, inner: ObservedClientError) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    /// With raw service error body
    #[inline]
    #[must_use]
    pub fn with_response_body(mut self, body: impl Into<String>) -> Self {
        self.response_body = Some(body.into());
        self
    }

    /// This error followed by its inner failures, outermost first
    pub fn chain(&self) -> impl Iterator<Item = &ObservedClientError> {
        std::iter::successors(Some(self), |e| e.inner.as_deref())
    }
}

impl std::fmt::Display for ObservedClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ObservedClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// The client's change-tracking context, as the harness sees it
#[async_trait]
pub trait TrackingContext: Send + Sync {
    /// Tracked descriptors in registration order
    fn descriptors(&self) -> Vec<DescriptorData>;

    /// Configured response preference
    fn response_preference(&self) -> ResponsePreference;

    /// Declared protocol versions
    fn protocol_versions(&self) -> VersionPair;

    /// Start delivering request notifications to `observer`
    fn add_request_observer(&self, observer: Arc<dyn RequestObserver>) -> ObserverId;

    /// Stop delivering notifications; returns false if `id` was not registered
    fn remove_request_observer(&self, id: ObserverId) -> bool;

    /// Turn live change tracking on or off
    fn set_tracking_enabled(&self, enabled: bool);

    /// The product call under test
    async fn save_changes(
        &self,
        options: SaveChangesOptions,
    ) -> Result<DataServiceResponseData, ObservedClientError>;
}
