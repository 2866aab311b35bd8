//! Positional comparison of predicted vs. observed traffic
//!
//! Tolerances: relative expected uris match any observed uri ending with
//! them, and headers the expectation does not mention are not checked.

use crate::error::{Mismatch, VerificationFailure};
use crate::request_predictor::{ExpectedHeader, ExpectedRequest};
use odt_model::{DataServiceResponseData, HttpExchange, HttpRequestData};

/// Compare predicted requests with observed ones
///
/// Lengths must match; pairs are then compared by position up to the
/// shorter length so that every divergence is reported in one pass.
///
/// # Errors
/// [`VerificationFailure`] carrying every mismatch.
pub fn verify_requests(
    expected: &[ExpectedRequest],
    observed: &[HttpRequestData],
) -> Result<(), VerificationFailure> {
    let mut mismatches = Vec::new();

    if expected.len() != observed.len() {
        mismatches.push(Mismatch::RequestCount {
            expected: expected.len(),
            observed: observed.len(),
        });
    }

    for (index, (expected, observed)) in expected.iter().zip(observed).enumerate() {
        compare_request(index, expected, observed, &mut mismatches);
    }

    tracing::debug!(
        expected = expected.len(),
        observed = observed.len(),
        mismatches = mismatches.len(),
        "verified requests"
    );
    VerificationFailure::check(mismatches)
}

fn compare_request(
    index: usize,
    expected: &ExpectedRequest,
    observed: &HttpRequestData,
    mismatches: &mut Vec<Mismatch>,
) {
    if !observed.method.as_str().eq_ignore_ascii_case(expected.verb.as_str()) {
        mismatches.push(Mismatch::Method {
            index,
            expected: expected.verb.to_string(),
            observed: observed.method.to_string(),
        });
    }

    let uri_matches = if expected.is_absolute() {
        observed.uri == expected.uri
    } else {
        observed.uri.ends_with(&expected.uri)
    };
    if !uri_matches {
        mismatches.push(Mismatch::Uri {
            index,
            expected: expected.uri.clone(),
            observed: observed.uri.clone(),
        });
    }

    for (name, expectation) in &expected.headers {
        let actual = observed.headers.get(name.as_str()).map(|v| String::from_utf8_lossy(v.as_bytes()));
        match (expectation, actual) {
            (ExpectedHeader::Absent, None) => {}
            (ExpectedHeader::Absent, Some(value)) => mismatches.push(Mismatch::UnexpectedHeader {
                index,
                header: name.clone(),
                observed: value.into_owned(),
            }),
            (ExpectedHeader::Value(value), None) => mismatches.push(Mismatch::MissingHeader {
                index,
                header: name.clone(),
                expected: value.clone(),
            }),
            (ExpectedHeader::Value(value), Some(actual)) if *value != actual => {
                mismatches.push(Mismatch::HeaderValue {
                    index,
                    header: name.clone(),
                    expected: value.clone(),
                    observed: actual.into_owned(),
                });
            }
            (ExpectedHeader::Value(_), Some(_)) => {}
        }
    }
}

/// Compare a predicted save result with the one the client reported
///
/// # Errors
/// [`VerificationFailure`] carrying every mismatch.
pub fn verify_responses(
    expected: &DataServiceResponseData,
    observed: &DataServiceResponseData,
) -> Result<(), VerificationFailure> {
    let mut mismatches = Vec::new();

    if expected.is_batch != observed.is_batch {
        mismatches.push(Mismatch::BatchFlag {
            expected: expected.is_batch,
            observed: observed.is_batch,
        });
    }
    if expected.batch_status != observed.batch_status {
        mismatches.push(Mismatch::BatchStatus {
            expected: expected.batch_status.code(),
            observed: observed.batch_status.code(),
        });
    }
    if expected.operations.len() != observed.operations.len() {
        mismatches.push(Mismatch::OperationCount {
            expected: expected.operations.len(),
            observed: observed.operations.len(),
        });
    }

    let pairs = expected.operations.iter().zip(&observed.operations).enumerate();
    for (index, (expected, observed)) in pairs {
        if expected.descriptor != observed.descriptor {
            mismatches.push(Mismatch::OperationDescriptor {
                index,
                expected: expected.descriptor,
                observed: observed.descriptor,
            });
        }
        if expected.status != observed.status {
            mismatches.push(Mismatch::OperationStatus {
                index,
                expected: expected.status.as_u16(),
                observed: observed.status.as_u16(),
            });
        }
    }

    VerificationFailure::check(mismatches)
}

/// Compare the statuses the server actually sent with the predicted ones
///
/// Only meaningful outside batch mode, where every predicted operation
/// travels as its own request. Exchanges without a response and a count
/// difference are left to [`verify_requests`].
///
/// # Errors
/// [`VerificationFailure`] naming each request whose status differs.
pub fn verify_wire_statuses(
    expected: &DataServiceResponseData,
    exchanges: &[HttpExchange],
) -> Result<(), VerificationFailure> {
    if expected.is_batch {
        return Ok(());
    }

    let mismatches = expected
        .operations
        .iter()
        .zip(exchanges)
        .enumerate()
        .filter_map(|(index, (operation, exchange))| {
            let observed = exchange.response.as_ref()?.status;
            (observed != operation.status).then(|| Mismatch::WireStatus {
                index,
                expected: operation.status.as_u16(),
                observed: observed.as_u16(),
            })
        })
        .collect();

    VerificationFailure::check(mismatches)
}
