//! Replaying adapter for the `HttpClient` port.

use std::sync::{Arc, Mutex};

use super::next_output;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{HttpClient, HttpError, HttpFuture, HttpRequest, HttpResponse};

/// Serves recorded HTTP responses from a cassette.
pub struct ReplayingHttpClient {
    replayer: Option<Arc<Mutex<CassetteReplayer>>>,
}

impl ReplayingHttpClient {
    /// Creates a client backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer: Some(replayer) }
    }

    /// Creates a client with no cassette. Panics when called.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }
}

impl HttpClient for ReplayingHttpClient {
    fn send(&self, _request: &HttpRequest) -> HttpFuture<'_> {
        let output: Result<HttpResponse, HttpError> =
            next_output(self.replayer.as_ref(), "http", "send");
        Box::pin(async move { output })
    }
}
