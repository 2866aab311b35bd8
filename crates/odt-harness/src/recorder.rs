//! HTTP log recorder and scoped guards
//!
//! The recorder is registered with exactly one context for exactly one
//! save; [`RecorderRegistration`] removes it again on every exit path.
//! [`TrackingSuspension`] keeps the context's live tracking off while the
//! harness verifies requests.

use crate::context::{ObserverId, RequestObserver, TrackingContext};
use odt_model::{HttpExchange, HttpRequestData};
use parking_lot::Mutex;
use std::sync::Arc;

/// Records exchanges in emission order
#[derive(Debug, Default)]
pub struct HttpLogRecorder {
    log: Mutex<Vec<HttpExchange>>,
}

impl HttpLogRecorder {
    /// Create a shareable recorder
    #[inline]
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register with a context; the returned guard unregisters on drop
    pub fn register<'c, C>(self: &Arc<Self>, context: &'c C) -> RecorderRegistration<'c, C>
    where
        C: TrackingContext + ?Sized,
    {
        let observer: Arc<dyn RequestObserver> = self.clone();
        let id = context.add_request_observer(observer);
        tracing::debug!(observer = id.0, "registered http log recorder");
        RecorderRegistration {
            context,
            id,
            recorder: Arc::clone(self),
        }
    }

    /// Recorded exchanges
    #[must_use]
    pub fn exchanges(&self) -> Vec<HttpExchange> {
        self.log.lock().clone()
    }

    /// Recorded requests
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequestData> {
        self.log.lock().iter().map(|e| e.request.clone()).collect()
    }

    /// Number of recorded exchanges
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    /// Whether nothing has been recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }
}

impl RequestObserver for HttpLogRecorder {
    fn on_request_sent(&self, exchange: &HttpExchange) {
        tracing::trace!(method = %exchange.request.method, uri = %exchange.request.uri, "recorded exchange");
        self.log.lock().push(exchange.clone());
    }
}

/// Keeps a recorder registered for as long as it lives
#[must_use = "dropping the registration unregisters the recorder"]
pub struct RecorderRegistration<'c, C: TrackingContext + ?Sized> {
    context: &'c C,
    id: ObserverId,
    recorder: Arc<HttpLogRecorder>,
}

impl<C: TrackingContext + ?Sized> RecorderRegistration<'_, C> {
    /// The registered recorder
    #[inline]
    #[must_use]
    pub fn recorder(&self) -> &Arc<HttpLogRecorder> {
        &self.recorder
    }

    /// Observer handle
    #[inline]
    #[must_use]
    pub fn id(&self) -> ObserverId {
        self.id
    }
}

impl<C: TrackingContext + ?Sized> Drop for RecorderRegistration<'_, C> {
    fn drop(&mut self) {
        if !self.context.remove_request_observer(self.id) {
            tracing::warn!(observer = self.id.0, "recorder was already unregistered");
        }
    }
}

/// Keeps live change tracking off for as long as it lives
#[must_use = "dropping the suspension re-enables tracking"]
pub struct TrackingSuspension<'c, C: TrackingContext + ?Sized> {
    context: &'c C,
}

impl<'c, C: TrackingContext + ?Sized> TrackingSuspension<'c, C> {
    /// Suspend tracking on `context`
    pub fn new(context: &'c C) -> Self {
        context.set_tracking_enabled(false);
        Self { context }
    }
}

impl<C: TrackingContext + ?Sized> Drop for TrackingSuspension<'_, C> {
    fn drop(&mut self) {
        self.context.set_tracking_enabled(true);
    }
}
