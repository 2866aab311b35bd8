//! ODT Harness - SaveChanges verification over a live client
//!
//! Drives the client's save call through ordered phases, records the HTTP
//! traffic it emits, and checks it against the oracle's predictions:
//! - [`SaveChangesHarness`]: phased run producing a [`VerificationReport`]
//! - [`HttpLogRecorder`]: scoped request observer
//! - [`ErrorComparer`]: expected-error baselines backed by [`ResourceCatalog`]s
//! - [`HarnessConfig`]: TOML-loadable settings
//!
//! # Example
//!
//! ```rust,ignore
//! use odt_harness::{HarnessConfig, SaveChangesHarness};
//! use odt_model::SaveRequest;
//!
//! # async fn example(context: &impl odt_harness::TrackingContext, model: odt_model::ServiceModel)
//! #     -> Result<(), odt_harness::HarnessError> {
//! let harness = SaveChangesHarness::new(HarnessConfig::new(), model);
//! let report = harness.run(context, SaveRequest::batch(), None).await?;
//! println!("{}", report.generate_text());
//! report.into_result()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod error_comparer;
pub mod harness;
pub mod recorder;
pub mod server_error;

pub use catalog::ResourceCatalog;
pub use config::HarnessConfig;
pub use context::{ObservedClientError, ObserverId, RequestObserver, TrackingContext};
pub use error::{CatalogError, ConfigError, HarnessError, HarnessResult};
pub use error_comparer::{
    ErrorComparer, ErrorComparison, ExpectedClientError, ExpectedMessage, ResourceRef,
};
pub use harness::{Finding, Phase, SaveChangesHarness, VerificationReport};
pub use recorder::{HttpLogRecorder, RecorderRegistration, TrackingSuspension};
pub use server_error::ServerErrorPayload;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing save-changes verifications
    pub use crate::{
        ExpectedClientError, HarnessConfig, ObservedClientError, ResourceCatalog, ResourceRef,
        SaveChangesHarness, TrackingContext, VerificationReport,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
