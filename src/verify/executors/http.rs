//! `http` executor.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{head_excerpt, security_violation};
use crate::ports::{HttpClient, HttpError, HttpRequest};
use crate::strategy::{FailureReason, HttpStrategy, StrategyResult, VerificationStrategy};
use crate::verify::assertions::{failed_json_assertions, status_matches};
use crate::verify::security::check_url;
use crate::verify::{ExecuteFuture, ExecutionContext, StrategyExecutor};

/// Default timeout for `http` strategies.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

static ENV_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env token pattern must compile")
});

/// Replaces `${VAR}` tokens using `lookup`. Unknown variables become empty
/// and are collected into `missing`.
fn substitute(
    text: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
    missing: &mut Vec<String>,
) -> String {
    ENV_TOKEN
        .replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            lookup(name).unwrap_or_else(|| {
                missing.push(name.to_string());
                String::new()
            })
        })
        .into_owned()
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Issues an HTTP request and checks the response.
pub struct HttpExecutor {
    client: Arc<dyn HttpClient>,
    lookup: fn(&str) -> Option<String>,
}

impl HttpExecutor {
    /// Creates an executor sending requests through `client`. `${VAR}`
    /// tokens resolve against the process environment.
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client, lookup: process_env }
    }

    /// Replaces the variable lookup used for `${VAR}` substitution.
    #[must_use]
    pub fn with_env_lookup(mut self, lookup: fn(&str) -> Option<String>) -> Self {
        self.lookup = lookup;
        self
    }

    fn build_request(
        &self,
        strategy: &HttpStrategy,
    ) -> Result<(HttpRequest, Vec<String>), StrategyResult> {
        let mut missing = Vec::new();
        let url = substitute(&strategy.url, &self.lookup, &mut missing);
        let mut headers: BTreeMap<String, String> = strategy
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), substitute(value, &self.lookup, &mut missing)))
            .collect();
        if !missing.is_empty() {
            warn!(variables = ?missing, "unset variables substituted as empty");
        }

        let checked = check_url(&url, strategy.allowed_hosts.as_deref())
            .map_err(|violation| security_violation(&violation).with_detail("url", url.as_str()))?;

        let body = match &strategy.body {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(raw.clone()),
            Some(value) => {
                if !headers.keys().any(|name| name.eq_ignore_ascii_case("content-type")) {
                    headers.insert("content-type".to_string(), "application/json".to_string());
                }
                Some(value.to_string())
            }
        };

        let request = HttpRequest {
            method: strategy.method.as_deref().unwrap_or("GET").trim().to_ascii_uppercase(),
            url: checked.to_string(),
            headers,
            body,
            timeout_ms: strategy.timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS),
        };
        Ok((request, missing))
    }

    async fn run(&self, strategy: &HttpStrategy) -> StrategyResult {
        let body_pattern = strategy.expected_body_pattern.as_deref().map(Regex::new);
        let body_pattern = match body_pattern.transpose() {
            Ok(pattern) => pattern,
            Err(e) => {
                return StrategyResult::failure(
                    FailureReason::InvalidPattern,
                    format!("Invalid expectedBodyPattern: {e}"),
                );
            }
        };
        let (request, missing) = match self.build_request(strategy) {
            Ok(built) => built,
            Err(result) => return result,
        };

        debug!(
            method = %request.method,
            url = %request.url,
            timeout_ms = request.timeout_ms,
            "sending request"
        );
        let base = StrategyResult::fail("")
            .with_detail("method", request.method.as_str())
            .with_detail("url", request.url.as_str());
        let base = if missing.is_empty() {
            base
        } else {
            base.with_detail("unresolvedVariables", json!(missing))
        };

        let response = match self.client.send(&request).await {
            Ok(response) => response,
            Err(HttpError::Timeout { timeout_ms }) => {
                let mut result = base.with_reason(FailureReason::Timeout);
                result.output = format!(
                    "{} {} timed out after {timeout_ms}ms",
                    request.method, request.url
                );
                return result;
            }
            Err(HttpError::Failed(message)) => {
                let mut result = base
                    .with_reason(FailureReason::RequestFailed)
                    .with_detail("error", message.as_str());
                result.output = format!("{} {} failed: {message}", request.method, request.url);
                return result;
            }
        };

        let status_matched = status_matches(strategy.expected_status.as_ref(), response.status);
        let body_matched = body_pattern.as_ref().map(|re| re.is_match(&response.body));

        let mut result = base
            .with_detail("status", response.status)
            .with_detail(
                "expectedStatus",
                strategy
                    .expected_status
                    .as_ref()
                    .map_or_else(|| json!("2xx"), |codes| json!(codes.to_vec())),
            )
            .with_detail("statusMatched", status_matched)
            .with_detail("bodyPatternMatched", body_matched.map_or(Value::Null, Value::Bool))
            .with_detail("body", head_excerpt(&response.body));

        let mut assertion_errors = Vec::new();
        if !strategy.json_assertions.is_empty() {
            let parsed = serde_json::from_str::<Value>(&response.body);
            if let Err(e) = &parsed {
                result = result.with_detail("bodyParseError", e.to_string());
            }
            let document = parsed.unwrap_or(Value::Null);
            assertion_errors = failed_json_assertions(&document, &strategy.json_assertions);
            result = result
                .with_detail("jsonAssertionErrors", Value::Array(assertion_errors.clone()));
        }

        let mut problems = Vec::new();
        if !status_matched {
            problems.push(format!("unexpected status {}", response.status));
        }
        if body_matched == Some(false) {
            problems.push("body did not match pattern".to_string());
        }
        if !assertion_errors.is_empty() {
            problems.push(format!("{} JSON assertion(s) failed", assertion_errors.len()));
        }

        result.success = problems.is_empty();
        result.output = if result.success {
            format!("{} {} returned {}", request.method, request.url, response.status)
        } else {
            format!("{} {}: {}", request.method, request.url, problems.join("; "))
        };
        result
    }
}

impl StrategyExecutor for HttpExecutor {
    fn execute<'a>(
        &'a self,
        _ctx: &'a ExecutionContext<'a>,
        strategy: &'a VerificationStrategy,
    ) -> ExecuteFuture<'a> {
        Box::pin(async move {
            match strategy {
                VerificationStrategy::Http(http) => self.run(http).await,
                other => StrategyResult::failure(
                    FailureReason::InvalidConfig,
                    format!("http executor cannot run a '{}' strategy", other.kind()),
                ),
            }
        })
    }
}
