//! Captured wire exchanges
//!
//! Requests and responses as the client's "request sent" notification
//! reports them. Values are immutable once captured; the builders below
//! exist for fixtures and adapters.

use crate::error::{ModelError, ModelResult};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};

/// Protocol header names checked by the verifiers
pub mod header {
    /// Response preference
    pub const PREFER: &str = "Prefer";
    /// Protocol version of the request payload
    pub const DATA_SERVICE_VERSION: &str = "DataServiceVersion";
    /// Highest protocol version the client understands
    pub const MAX_DATA_SERVICE_VERSION: &str = "MaxDataServiceVersion";
    /// Concurrency token
    pub const IF_MATCH: &str = "If-Match";
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> ModelResult<()> {
    let invalid = || ModelError::InvalidHeader(format!("{name}: {value}"));
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    headers.insert(name, value);
    Ok(())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// One outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequestData {
    /// Verb as sent
    pub method: Method,
    /// Absolute request uri
    pub uri: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body, if any
    pub body: Option<Vec<u8>>,
}

impl HttpRequestData {
    /// Create a request without headers or body
    #[must_use]
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// With header
    ///
    /// # Errors
    /// [`ModelError::InvalidHeader`] if the name or value is not valid HTTP.
    pub fn with_header(mut self, name: &str, value: &str) -> ModelResult<Self> {
        insert_header(&mut self.headers, name, value)?;
        Ok(self)
    }

    /// With body
    #[inline]
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Header value as text; case-insensitive on the name
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_str(&self.headers, name)
    }

    /// Whether the header is present at all
    #[inline]
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }
}

/// One incoming response
#[derive(Debug, Clone)]
pub struct HttpResponseData {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body, if any
    pub body: Option<Vec<u8>>,
}

impl HttpResponseData {
    /// Create a response without headers or body
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// With header
    ///
    /// # Errors
    /// [`ModelError::InvalidHeader`] if the name or value is not valid HTTP.
    pub fn with_header(mut self, name: &str, value: &str) -> ModelResult<Self> {
        insert_header(&mut self.headers, name, value)?;
        Ok(self)
    }

    /// With body
    #[inline]
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Header value as text; case-insensitive on the name
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_str(&self.headers, name)
    }
}

/// A request paired with its response, in emission order
#[derive(Debug, Clone)]
pub struct HttpExchange {
    /// What the client sent
    pub request: HttpRequestData,
    /// What came back; `None` when the transport failed
    pub response: Option<HttpResponseData>,
}

impl HttpExchange {
    /// Create an exchange
    #[inline]
    #[must_use]
    pub fn new(request: HttpRequestData, response: Option<HttpResponseData>) -> Self {
        Self { request, response }
    }
}
