//! ODT Oracle
//!
//! Predicts the traffic a correct OData client produces when it saves a
//! change set, and compares that prediction with what was observed.
//!
//! # Core Concepts
//!
//! - [`ResponsePredictor`]: per-change status codes and batch status
//! - [`RequestPredictor`]: verbs, uris and protocol headers
//! - [`verify_requests`] / [`verify_responses`] / [`verify_wire_statuses`]:
//!   positional comparison that reports every mismatch
//! - [`check_preference`]: Prefer header vs. protocol version consistency
//!
//! # Example
//!
//! ```rust,ignore
//! use odt_oracle::{verify_requests, ClientProfile, RequestPredictor, ResponsePredictor};
//!
//! let responses = ResponsePredictor::new(&model).predict(&snapshot, &request)?;
//! let requests = RequestPredictor::new(&model, ClientProfile::default()).predict(&snapshot, &request)?;
//! verify_requests(&requests, &observed)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod preference;
mod request_predictor;
mod response_predictor;
mod verifier;

pub use error::{Mismatch, PreferenceViolation, VerificationFailure};
pub use preference::{check_preference, is_create_or_update};
pub use request_predictor::{ClientProfile, ExpectedHeader, ExpectedRequest, RequestPredictor};
pub use response_predictor::ResponsePredictor;
pub use verifier::{verify_requests, verify_responses, verify_wire_statuses};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
