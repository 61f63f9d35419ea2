//! Recording adapter for the `HttpClient` port.

use std::sync::{Arc, Mutex};

use super::record_interaction;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{HttpClient, HttpFuture, HttpRequest};

/// Records HTTP exchanges while delegating to an inner client.
pub struct RecordingHttpClient {
    inner: Arc<dyn HttpClient>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingHttpClient {
    /// Creates a recording client wrapping `inner`.
    pub fn new(inner: Arc<dyn HttpClient>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl HttpClient for RecordingHttpClient {
    fn send(&self, request: &HttpRequest) -> HttpFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            let result = self.inner.send(&request).await;
            record_interaction(&self.recorder, "http", "send", &request, &result);
            result
        })
    }
}
