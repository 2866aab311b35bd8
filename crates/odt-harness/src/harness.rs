//! Phased save-changes verification
//!
//! One run drives the phases in order, never overlapping:
//!
//! 1. `initialize_state`: capture the change-set snapshot
//! 2. `setup_before_product_call`: register the HTTP log recorder
//! 3. product call: `save_changes` on the client under test
//! 4. `on_product_call_success` or `on_product_call_failure`
//! 5. `cleanup_after_product_call`: unregister the recorder
//!
//! Verification failures are collected into a [`VerificationReport`];
//! only harness wiring defects abort the run with a [`HarnessError`].

use crate::catalog::ResourceCatalog;
use crate::config::HarnessConfig;
use crate::context::{ObservedClientError, TrackingContext};
use crate::error::{HarnessError, HarnessResult};
use crate::error_comparer::{ErrorComparer, ErrorComparison, ExpectedClientError};
use crate::recorder::{HttpLogRecorder, TrackingSuspension};
use odt_model::{
    ChangeSetSnapshot, DataServiceResponseData, HttpRequestData, ResponsePreference, SaveRequest,
    ServiceModel,
};
use odt_oracle::{
    check_preference, verify_requests, verify_responses, verify_wire_statuses, ClientProfile,
    PreferenceViolation, RequestPredictor, ResponsePredictor, VerificationFailure,
};
use std::fmt;
use tracing::Instrument;

/// Harness phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Snapshot captured
    InitializeState,
    /// Recorder registered
    SetupBeforeProductCall,
    /// Save call issued
    ProductCall,
    /// Save succeeded, traffic verified
    OnProductCallSuccess,
    /// Save failed, Prefer checked and error compared
    OnProductCallFailure,
    /// Recorder unregistered
    CleanupAfterProductCall,
}

impl Phase {
    /// Phase name as used in logs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitializeState => "initialize_state",
            Self::SetupBeforeProductCall => "setup_before_product_call",
            Self::ProductCall => "product_call",
            Self::OnProductCallSuccess => "on_product_call_success",
            Self::OnProductCallFailure => "on_product_call_failure",
            Self::CleanupAfterProductCall => "cleanup_after_product_call",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed check
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Finding {
    /// Reported save result differs from the prediction
    #[error("responses: {0}")]
    Responses(VerificationFailure),

    /// Observed requests differ from the prediction
    #[error("requests: {0}")]
    Requests(VerificationFailure),

    /// Statuses the server sent differ from the prediction
    #[error("wire statuses: {0}")]
    WireStatuses(VerificationFailure),

    /// Observed request violates the Prefer/version rules
    #[error("request {index}: {violation}")]
    Preference {
        /// Observed request position
        index: usize,
        /// Violation
        violation: PreferenceViolation,
    },

    /// Raised error differs from the baseline
    #[error("error: {0}")]
    Error(ErrorComparison),
}

/// Outcome of one harness run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    /// Phases in the order they ran
    pub phases: Vec<Phase>,
    /// Failed checks, in discovery order
    pub findings: Vec<Finding>,
    /// Number of exchanges the recorder saw
    pub observed_requests: usize,
    /// Whether the product call raised an error
    pub save_failed: bool,
}

impl VerificationReport {
    /// Whether every check passed
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!(%phase, "entering phase");
        self.phases.push(phase);
    }

    fn record(&mut self, finding: Finding) {
        tracing::warn!(%finding, "verification finding");
        self.findings.push(finding);
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== SaveChanges Verification Report ===\n\n");
        let phases: Vec<_> = self.phases.iter().map(|p| p.as_str()).collect();
        report.push_str(&format!("Phases: {}\n", phases.join(" -> ")));
        report.push_str(&format!("Observed Requests: {}\n", self.observed_requests));
        report.push_str(&format!("Save Failed: {}\n", self.save_failed));
        report.push_str(&format!("Findings: {}\n", self.findings.len()));

        if !self.findings.is_empty() {
            report.push_str("\n=== Findings ===\n");
            for (i, finding) in self.findings.iter().enumerate() {
                report.push_str(&format!("{}. {}\n", i + 1, finding));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));
        report
    }

    /// Turn a failed report into [`HarnessError::VerificationFailed`]
    ///
    /// # Errors
    /// When any finding was recorded.
    pub fn into_result(self) -> HarnessResult<Self> {
        if self.passed() {
            Ok(self)
        } else {
            Err(HarnessError::VerificationFailed(self.generate_text()))
        }
    }
}

struct SaveState {
    snapshot: ChangeSetSnapshot,
    request: SaveRequest,
    profile: ClientProfile,
}

/// Drives one save through the verification phases
#[derive(Debug, Clone)]
pub struct SaveChangesHarness {
    config: HarnessConfig,
    model: ServiceModel,
    comparer: ErrorComparer,
}

impl SaveChangesHarness {
    /// Create a harness without message catalogs
    #[must_use]
    pub fn new(config: HarnessConfig, model: ServiceModel) -> Self {
        Self::with_catalogs(config, model, ResourceCatalog::new(), ResourceCatalog::new())
    }

    /// Create a harness with client and server message catalogs
    #[must_use]
    pub fn with_catalogs(
        config: HarnessConfig,
        model: ServiceModel,
        client: ResourceCatalog,
        server: ResourceCatalog,
    ) -> Self {
        let comparer =
            ErrorComparer::new(client, server).with_server_messages(config.verify_server_messages);
        Self {
            config,
            model,
            comparer,
        }
    }

    /// Harness configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run one save and verify it
    ///
    /// When `request` carries no preference, the context's configured
    /// preference is used.
    ///
    /// # Errors
    /// - [`HarnessError::Model`] for an invalid snapshot or unknown entity type
    /// - [`HarnessError::Catalog`] when the error baseline names an unknown
    ///   resource
    pub async fn run<C>(
        &self,
        context: &C,
        request: SaveRequest,
        expected_error: Option<&ExpectedClientError>,
    ) -> HarnessResult<VerificationReport>
    where
        C: TrackingContext + ?Sized,
    {
        let span = tracing::info_span!(
            "save_changes",
            batch = request.is_batch(),
            expect_error = expected_error.is_some()
        );

        async move {
            let mut report = VerificationReport::default();

            report.enter(Phase::InitializeState);
            let state = self.initialize_state(context, request)?;

            report.enter(Phase::SetupBeforeProductCall);
            let registration = HttpLogRecorder::new().register(context);

            report.enter(Phase::ProductCall);
            let outcome = context.save_changes(state.request.options).await;

            match outcome {
                Ok(response) => {
                    report.enter(Phase::OnProductCallSuccess);
                    self.on_product_call_success(
                        context,
                        &state,
                        &response,
                        registration.recorder(),
                        expected_error,
                        &mut report,
                    )?;
                }
                Err(error) => {
                    report.enter(Phase::OnProductCallFailure);
                    report.save_failed = true;
                    let observed = registration.recorder().requests();
                    self.check_preferences(&observed, state.request.preference, &mut report);
                    self.compare_error(expected_error, Some(&error), &mut report)?;
                }
            }

            report.enter(Phase::CleanupAfterProductCall);
            report.observed_requests = registration.recorder().len();
            drop(registration);

            tracing::info!(
                passed = report.passed(),
                findings = report.findings.len(),
                requests = report.observed_requests,
                "save verification complete"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    fn initialize_state<C>(&self, context: &C, request: SaveRequest) -> HarnessResult<SaveState>
    where
        C: TrackingContext + ?Sized,
    {
        let snapshot = ChangeSetSnapshot::new(context.descriptors())?;
        let preference = if request.preference.is_set() {
            request.preference
        } else {
            context.response_preference()
        };
        let versions = context.protocol_versions();
        tracing::debug!(
            descriptors = snapshot.len(),
            pending = snapshot.pending().count(),
            ?preference,
            current = %versions.current,
            max = %versions.max,
            "captured change set"
        );

        Ok(SaveState {
            snapshot,
            request: request.with_preference(preference),
            profile: self.config.client_profile(versions.max),
        })
    }

    fn on_product_call_success<C>(
        &self,
        context: &C,
        state: &SaveState,
        response: &DataServiceResponseData,
        recorder: &HttpLogRecorder,
        expected_error: Option<&ExpectedClientError>,
        report: &mut VerificationReport,
    ) -> HarnessResult<()>
    where
        C: TrackingContext + ?Sized,
    {
        let predicted = ResponsePredictor::new(&self.model).predict(&state.snapshot, &state.request)?;
        if let Err(failure) = verify_responses(&predicted, response) {
            report.record(Finding::Responses(failure));
        }

        let _suspension = TrackingSuspension::new(context);

        let expected = RequestPredictor::new(&self.model, state.profile.clone())
            .predict(&state.snapshot, &state.request)?;
        let observed = recorder.requests();
        if let Err(failure) = verify_requests(&expected, &observed) {
            report.record(Finding::Requests(failure));
        }
        if let Err(failure) = verify_wire_statuses(&predicted, &recorder.exchanges()) {
            report.record(Finding::WireStatuses(failure));
        }

        self.check_preferences(&observed, state.request.preference, report);
        self.compare_error(expected_error, None, report)
    }

    fn check_preferences(
        &self,
        observed: &[HttpRequestData],
        preference: ResponsePreference,
        report: &mut VerificationReport,
    ) {
        if !self.config.verify_prefer_header {
            return;
        }
        for (index, request) in observed.iter().enumerate() {
            if let Err(violation) = check_preference(request, preference) {
                report.record(Finding::Preference { index, violation });
            }
        }
    }

    fn compare_error(
        &self,
        expected: Option<&ExpectedClientError>,
        actual: Option<&ObservedClientError>,
        report: &mut VerificationReport,
    ) -> HarnessResult<()> {
        match self.comparer.compare(expected, actual) {
            Ok(()) => Ok(()),
            Err(ErrorComparison::Catalog(e)) => Err(e.into()),
            Err(comparison) => {
                report.record(Finding::Error(comparison));
                Ok(())
            }
        }
    }
}
