//! Live adapter for the `HttpClient` port using reqwest.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, Method};

use crate::ports::{HttpClient, HttpError, HttpFuture, HttpRequest, HttpResponse};

/// HTTP client backed by a shared `reqwest::Client`.
///
/// Redirects are never followed: the host allowlist is checked against the
/// request URL only, so a 3xx response is returned to the caller as-is.
#[derive(Debug, Clone)]
pub struct LiveHttpClient {
    client: Result<Client, String>,
}

impl LiveHttpClient {
    /// Creates a new live HTTP client.
    ///
    /// If the TLS backend cannot be initialized every request fails with the
    /// builder's error.
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"));
        Self { client }
    }
}

impl Default for LiveHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn header_map(
    headers: &std::collections::BTreeMap<String, String>,
) -> Result<HeaderMap, HttpError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HttpError::Failed(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| HttpError::Failed(format!("invalid value for header '{name}': {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

impl HttpClient for LiveHttpClient {
    fn send(&self, request: &HttpRequest) -> HttpFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| {
                HttpError::Failed(format!("invalid method '{}': {e}", request.method))
            })?;
            let timeout_ms = request.timeout_ms;
            let timed_out = |e: &reqwest::Error| e.is_timeout();

            let client = self.client.as_ref().map_err(|e| HttpError::Failed(e.clone()))?;
            let mut builder = client
                .request(method, &request.url)
                .headers(header_map(&request.headers)?)
                .timeout(Duration::from_millis(timeout_ms));
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(|e| {
                if timed_out(&e) {
                    HttpError::Timeout { timeout_ms }
                } else {
                    HttpError::Failed(e.to_string())
                }
            })?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_ascii_lowercase(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let bytes = response.bytes().await.map_err(|e| {
                if timed_out(&e) {
                    HttpError::Timeout { timeout_ms }
                } else {
                    HttpError::Failed(format!("failed to read response body: {e}"))
                }
            })?;

            Ok(HttpResponse { status, headers, body: String::from_utf8_lossy(&bytes).into_owned() })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::{ErrorKind, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    /// Answers a single connection on a loopback port with `response`.
    fn serve_once(response: String) -> (u16, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        (port, handle)
    }

    fn get(url: String) -> HttpRequest {
        HttpRequest {
            method: "GET".into(),
            url,
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: 5_000,
        }
    }

    #[test]
    fn rejects_malformed_headers() {
        let headers = BTreeMap::from([("bad header".to_string(), "x".to_string())]);
        assert!(matches!(header_map(&headers), Err(HttpError::Failed(_))));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_failure() {
        let request = get("http://127.0.0.1:1/health".into());
        let err = LiveHttpClient::new().send(&request).await.unwrap_err();
        assert!(matches!(err, HttpError::Failed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn redirects_are_returned_not_followed() {
        let target = TcpListener::bind("127.0.0.1:0").unwrap();
        target.set_nonblocking(true).unwrap();
        let target_port = target.local_addr().unwrap().port();
        let location = format!("http://127.0.0.1:{target_port}/meta");
        let (port, server) = serve_once(format!(
            "HTTP/1.1 302 Found\r\nLocation: {location}\r\n\
             Content-Length: 0\r\nConnection: close\r\n\r\n"
        ));

        let response = LiveHttpClient::new()
            .send(&get(format!("http://127.0.0.1:{port}/start")))
            .await
            .unwrap();
        server.join().unwrap();

        assert_eq!(response.status, 302);
        assert_eq!(response.headers.get("location"), Some(&location));
        assert!(matches!(target.accept(), Err(e) if e.kind() == ErrorKind::WouldBlock));
    }
}
