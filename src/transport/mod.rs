//! Transport abstraction for the management API
//!
//! The core only needs "send a request, get back a status, headers and a
//! body". [`Transport`] is that seam; [`http::HttpTransport`] is the reqwest
//! implementation and tests substitute scripted fakes.
//!
//! # Example
//!
//! ```ignore
//! use arm_core::transport::{HttpTransport, Request, Transport};
//!
//! async fn example(transport: &HttpTransport) -> anyhow::Result<()> {
//!     let response = transport.send(Request::get("/subscriptions")).await?;
//!     println!("{}", response.status);
//!     Ok(())
//! }
//! ```

pub mod http;

pub use http::{HttpTransport, ProbeTransport};

use crate::payload::ErrorDetail;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Headers that carry a server-side polling hint, most precise first
const RETRY_AFTER_MS_HEADERS: &[&str] = &["retry-after-ms", "x-ms-retry-after-ms"];

/// A request against the management API
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path relative to the transport's base URL, or an absolute URL (as handed out by polling headers)
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// A response from the management API
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header, ignoring names or values that aren't valid
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::from_bytes(name.as_bytes()),
            reqwest::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Header value as a string, ignoring values that aren't valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Request timeouts, throttling and server errors are worth retrying
    pub fn is_transient(&self) -> bool {
        self.status == StatusCode::REQUEST_TIMEOUT
            || self.status == StatusCode::TOO_MANY_REQUESTS
            || self.status.is_server_error()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as JSON, or `None` when the body is empty or not JSON
    pub fn json_value(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    pub fn error_detail(&self) -> ErrorDetail {
        ErrorDetail::from_body(&self.body).unwrap_or_else(|| {
            ErrorDetail::new(
                self.status.as_u16().to_string(),
                self.status.canonical_reason().unwrap_or("unexpected status"),
            )
        })
    }

    /// Server-supplied polling hint, from `retry-after-ms` style headers or `Retry-After`
    /// (delta-seconds or an HTTP-date)
    pub fn retry_after(&self) -> Option<Duration> {
        for name in RETRY_AFTER_MS_HEADERS {
            if let Some(ms) = self.header(name).and_then(|v| v.trim().parse::<u64>().ok()) {
                return Some(Duration::from_millis(ms));
            }
        }

        let value = self.header("retry-after")?.trim();
        if let Ok(seconds) = value.parse::<u64>() {
            return Some(Duration::from_secs(seconds));
        }

        let at = chrono::DateTime::parse_from_rfc2822(value).ok()?;
        let delta = at.with_timezone(&chrono::Utc) - chrono::Utc::now();
        Some(delta.to_std().unwrap_or(Duration::ZERO))
    }
}

/// A request that never produced a usable response
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("sending request: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid request URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A retryable status that was still being returned when retries ran out
    #[error("server returned {status}: {detail}")]
    Status { status: u16, detail: ErrorDetail },
}

impl TransportError {
    pub fn connection<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection(Box::new(source))
    }

    pub fn from_response(response: &Response) -> Self {
        Self::Status {
            status: response.status.as_u16(),
            detail: response.error_detail(),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}
