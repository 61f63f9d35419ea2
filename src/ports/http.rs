//! HTTP client port for outbound requests.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed future type alias used by [`HttpClient`] to keep the trait dyn-compatible.
pub type HttpFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;

/// An outbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Upper-case method name.
    pub method: String,
    /// Absolute URL.
    pub url: String,
    /// Request headers.
    pub headers: BTreeMap<String, String>,
    /// Raw request body.
    pub body: Option<String>,
    /// Timeout covering the whole exchange, in milliseconds.
    pub timeout_ms: u64,
}

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response headers (lower-case names).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Response body decoded as UTF-8 (lossy).
    pub body: String,
}

/// Why an HTTP exchange produced no response.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum HttpError {
    /// The request was aborted because it exceeded its timeout.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// The bound that was exceeded.
        timeout_ms: u64,
    },
    /// Connection, TLS, or protocol failure.
    #[error("request failed: {0}")]
    Failed(String),
}

impl From<String> for HttpError {
    fn from(message: String) -> Self {
        Self::Failed(message)
    }
}

/// Sends HTTP requests.
pub trait HttpClient: Send + Sync {
    /// Sends the request and waits for the full response body.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Timeout`] when the timeout elapses and
    /// [`HttpError::Failed`] for every other transport failure.
    fn send(&self, request: &HttpRequest) -> HttpFuture<'_>;
}
