//! Prefer header and protocol version consistency
//!
//! A client that sends `Prefer` must also declare a protocol version that
//! supports it. Failures here blame the client under test.

use crate::error::PreferenceViolation;
use http::Method;
use odt_model::{header, HttpRequestData, ProtocolVersion, ResponsePreference};

/// Whether the verb creates or updates a resource
#[must_use]
pub fn is_create_or_update(method: &Method) -> bool {
    *method == Method::POST
        || *method == Method::PUT
        || *method == Method::PATCH
        || method.as_str().eq_ignore_ascii_case("MERGE")
}

fn is_batch_envelope(request: &HttpRequestData) -> bool {
    request
        .uri
        .split(['?', '#'])
        .next()
        .is_some_and(|path| path.ends_with("/$batch") || path == "$batch")
}

/// Check one observed request against the configured preference
///
/// The `$batch` envelope is exempt; the preference travels in its parts.
///
/// # Errors
/// The first [`PreferenceViolation`] found.
pub fn check_preference(
    request: &HttpRequestData,
    preference: ResponsePreference,
) -> Result<(), PreferenceViolation> {
    if is_batch_envelope(request) {
        return Ok(());
    }

    let expected = preference
        .prefer_header_value()
        .filter(|_| is_create_or_update(&request.method));
    let observed = request.header(header::PREFER);

    match (expected, observed) {
        (None, None) => return Ok(()),
        (Some(_), None) => {
            return Err(PreferenceViolation::MissingPrefer {
                method: request.method.to_string(),
                uri: request.uri.clone(),
                preference,
            });
        }
        (None, Some(value)) => {
            return Err(PreferenceViolation::UnexpectedPrefer {
                method: request.method.to_string(),
                uri: request.uri.clone(),
                value: value.to_string(),
            });
        }
        (Some(expected), Some(value)) if expected != value => {
            return Err(PreferenceViolation::WrongPreferValue {
                uri: request.uri.clone(),
                expected: expected.to_string(),
                observed: value.to_string(),
            });
        }
        (Some(_), Some(_)) => {}
    }

    for name in [header::DATA_SERVICE_VERSION, header::MAX_DATA_SERVICE_VERSION] {
        check_minimum_version(request, name)?;
    }
    Ok(())
}

fn check_minimum_version(request: &HttpRequestData, name: &'static str) -> Result<(), PreferenceViolation> {
    let value = request
        .header(name)
        .ok_or_else(|| PreferenceViolation::MissingVersion {
            header: name,
            uri: request.uri.clone(),
        })?;
    let found: ProtocolVersion = value.parse().map_err(|_| PreferenceViolation::InvalidVersion {
        header: name,
        value: value.to_string(),
    })?;

    if found < ProtocolVersion::RESPONSE_PREFERENCE_MIN {
        tracing::warn!(header = name, %found, uri = %request.uri, "Prefer sent with sub-minimum protocol version");
        return Err(PreferenceViolation::VersionTooLow {
            header: name,
            found,
            minimum: ProtocolVersion::RESPONSE_PREFERENCE_MIN,
            uri: request.uri.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use odt_model::merge_method;

    fn request(method: Method, prefer: Option<&str>, dsv: &str, max: &str) -> HttpRequestData {
        let mut request = HttpRequestData::new(method, "http://host/svc/Customers")
            .with_header(header::DATA_SERVICE_VERSION, dsv)
            .unwrap()
            .with_header(header::MAX_DATA_SERVICE_VERSION, max)
            .unwrap();
        if let Some(value) = prefer {
            request = request.with_header(header::PREFER, value).unwrap();
        }
        request
    }

    #[test]
    fn create_or_update_verbs() {
        assert!(is_create_or_update(&Method::POST));
        assert!(is_create_or_update(&Method::PUT));
        assert!(is_create_or_update(&Method::PATCH));
        assert!(is_create_or_update(&merge_method()));
        assert!(!is_create_or_update(&Method::DELETE));
        assert!(!is_create_or_update(&Method::GET));
    }

    #[test]
    fn matching_prefer_passes() {
        let req = request(Method::POST, Some("return-content"), "3.0;NetFx", "3.0;NetFx");
        assert!(check_preference(&req, ResponsePreference::IncludeContent).is_ok());
    }

    #[test]
    fn no_preference_no_header_passes() {
        let req = request(Method::POST, None, "1.0;NetFx", "3.0;NetFx");
        assert!(check_preference(&req, ResponsePreference::Unspecified).is_ok());
    }

    #[test]
    fn missing_prefer_fails() {
        let req = request(Method::PUT, None, "3.0", "3.0");
        let err = check_preference(&req, ResponsePreference::NoContent).unwrap_err();
        assert!(matches!(err, PreferenceViolation::MissingPrefer { .. }));
    }

    #[test]
    fn prefer_on_delete_fails() {
        let req = request(Method::DELETE, Some("return-content"), "3.0", "3.0");
        let err = check_preference(&req, ResponsePreference::IncludeContent).unwrap_err();
        assert!(matches!(err, PreferenceViolation::UnexpectedPrefer { .. }));
    }

    #[test]
    fn wrong_value_fails() {
        let req = request(Method::POST, Some("return-content"), "3.0", "3.0");
        let err = check_preference(&req, ResponsePreference::NoContent).unwrap_err();
        assert!(matches!(err, PreferenceViolation::WrongPreferValue { .. }));
    }

    #[test]
    fn sub_minimum_version_names_the_version() {
        let req = request(Method::POST, Some("return-content"), "2.0;NetFx", "3.0;NetFx");
        let err = check_preference(&req, ResponsePreference::IncludeContent).unwrap_err();
        assert!(matches!(
            err,
            PreferenceViolation::VersionTooLow { header: header::DATA_SERVICE_VERSION, found, .. }
                if found == ProtocolVersion::V2
        ));
        assert!(err.to_string().contains("2.0"));
    }

    #[test]
    fn sub_minimum_max_version_fails() {
        let req = request(Method::POST, Some("return-content"), "3.0", "1.0");
        let err = check_preference(&req, ResponsePreference::IncludeContent).unwrap_err();
        assert!(matches!(
            err,
            PreferenceViolation::VersionTooLow { header: header::MAX_DATA_SERVICE_VERSION, .. }
        ));
    }

    #[test]
    fn batch_envelope_is_exempt() {
        let req = HttpRequestData::new(Method::POST, "http://host/svc/$batch");
        assert!(check_preference(&req, ResponsePreference::IncludeContent).is_ok());
    }
}
