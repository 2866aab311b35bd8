//! Testing utilities for the ODT workspace
//!
//! Shared fixtures, a scripted client context, and log capture.

#![allow(missing_docs)]

use async_trait::async_trait;
use http::{Method, StatusCode};
use odt_harness::{ObservedClientError, ObserverId, RequestObserver, TrackingContext};
use odt_model::{
    header, DataServiceResponseData, DescriptorData, DescriptorId, EntityDescriptorData, EntityState,
    HttpExchange, HttpRequestData, HttpResponseData, LinkDescriptorData, ProtocolVersion,
    ResponsePreference, SaveChangesOptions, ServiceModel, VersionPair,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

pub const SERVICE_ROOT: &str = "http://localhost:8080/Northwind.svc/";
pub const CUSTOMER: &str = "NorthwindModel.Customer";
pub const ORDER: &str = "NorthwindModel.Order";
pub const PHOTO: &str = "NorthwindModel.Photo";

/// Route test logs through the test writer; `RUST_LOG` overrides the filter
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("odt_harness=debug,odt_oracle=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Shared buffer the fmt subscriber writes formatted events into
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).to_string()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }
}

/// Thread-local subscriber capturing every level until the guard drops
pub fn capture_logs() -> (tracing::subscriber::DefaultGuard, CapturedLogs) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (guard, logs)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn northwind_model() -> ServiceModel {
    ServiceModel::new()
        .with_entity_type(CUSTOMER, "Customers")
        .with_entity_type(ORDER, "Orders")
        .with_media_type(PHOTO, "Photos")
}

pub fn customer(id: u64, state: EntityState) -> DescriptorData {
    EntityDescriptorData::new(id, CUSTOMER, state)
        .with_key(format!("'C{id}'"))
        .into()
}

pub fn order(id: u64, state: EntityState) -> DescriptorData {
    EntityDescriptorData::new(id, ORDER, state)
        .with_key(id.to_string())
        .into()
}

pub fn photo(id: u64, state: EntityState, stream_state: EntityState) -> DescriptorData {
    EntityDescriptorData::new(id, PHOTO, state)
        .with_key(id.to_string())
        .media_link_entry(stream_state)
        .into()
}

/// Collection link `Customers('C{source}')/Orders` to order `target`
pub fn orders_link(id: u64, source: u64, target: u64, state: EntityState) -> DescriptorData {
    LinkDescriptorData::new(id, DescriptorId(source), "Orders", Some(DescriptorId(target)), state)
        .collection()
        .into()
}

/// Observed request with headers
pub fn observed(method: Method, uri: &str, headers: &[(&str, &str)]) -> HttpRequestData {
    headers
        .iter()
        .fold(HttpRequestData::new(method, uri), |request, (name, value)| {
            request.with_header(name, value).unwrap()
        })
}

/// Observed request carrying the protocol headers a 3.0 client sends
pub fn observed_v3(method: Method, uri: &str, prefer: Option<&str>) -> HttpRequestData {
    let version = ProtocolVersion::V3.header_value();
    let mut request = observed(
        method,
        uri,
        &[
            (header::DATA_SERVICE_VERSION, version.as_str()),
            (header::MAX_DATA_SERVICE_VERSION, version.as_str()),
        ],
    );
    if let Some(value) = prefer {
        request = request.with_header(header::PREFER, value).unwrap();
    }
    request
}

// ---------------------------------------------------------------------------
// Scripted context
// ---------------------------------------------------------------------------

/// Client context that replays a scripted save
///
/// `save_changes` hands every scripted exchange to the registered observers
/// in order, then returns the scripted outcome.
pub struct ScriptedContext {
    descriptors: Vec<DescriptorData>,
    preference: ResponsePreference,
    versions: VersionPair,
    script: Vec<HttpExchange>,
    outcome: Result<DataServiceResponseData, ObservedClientError>,
    next_id: AtomicU64,
    observers: Mutex<Vec<(ObserverId, Arc<dyn RequestObserver>)>>,
    tracking: AtomicBool,
    suspensions: AtomicUsize,
    saves: Mutex<Vec<SaveChangesOptions>>,
}

impl ScriptedContext {
    pub fn new(descriptors: Vec<DescriptorData>) -> Self {
        Self {
            descriptors,
            preference: ResponsePreference::Unspecified,
            versions: VersionPair::new(ProtocolVersion::V3, ProtocolVersion::V3),
            script: Vec::new(),
            outcome: Ok(DataServiceResponseData::single(Vec::new())),
            next_id: AtomicU64::new(1),
            observers: Mutex::new(Vec::new()),
            tracking: AtomicBool::new(true),
            suspensions: AtomicUsize::new(0),
            saves: Mutex::new(Vec::new()),
        }
    }

    pub fn with_preference(mut self, preference: ResponsePreference) -> Self {
        self.preference = preference;
        self
    }

    pub fn with_versions(mut self, versions: VersionPair) -> Self {
        self.versions = versions;
        self
    }

    pub fn sends(mut self, request: HttpRequestData, status: StatusCode) -> Self {
        self.script
            .push(HttpExchange::new(request, Some(HttpResponseData::new(status))));
        self
    }

    pub fn returns(mut self, response: DataServiceResponseData) -> Self {
        self.outcome = Ok(response);
        self
    }

    pub fn fails_with(mut self, error: ObservedClientError) -> Self {
        self.outcome = Err(error);
        self
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn tracking_enabled(&self) -> bool {
        self.tracking.load(Ordering::SeqCst)
    }

    /// Number of times tracking was switched off
    pub fn suspensions(&self) -> usize {
        self.suspensions.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> Vec<SaveChangesOptions> {
        self.saves.lock().clone()
    }
}

#[async_trait]
impl TrackingContext for ScriptedContext {
    fn descriptors(&self) -> Vec<DescriptorData> {
        self.descriptors.clone()
    }

    fn response_preference(&self) -> ResponsePreference {
        self.preference
    }

    fn protocol_versions(&self) -> VersionPair {
        self.versions
    }

    fn add_request_observer(&self, observer: Arc<dyn RequestObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.observers.lock().push((id, observer));
        id
    }

    fn remove_request_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(registered, _)| *registered != id);
        observers.len() != before
    }

    fn set_tracking_enabled(&self, enabled: bool) {
        if !enabled {
            self.suspensions.fetch_add(1, Ordering::SeqCst);
        }
        self.tracking.store(enabled, Ordering::SeqCst);
    }

    async fn save_changes(
        &self,
        options: SaveChangesOptions,
    ) -> Result<DataServiceResponseData, ObservedClientError> {
        self.saves.lock().push(options);
        let observers: Vec<_> = self.observers.lock().iter().map(|(_, o)| Arc::clone(o)).collect();
        for exchange in &self.script {
            for observer in &observers {
                observer.on_request_sent(exchange);
            }
        }
        self.outcome.clone()
    }
}
