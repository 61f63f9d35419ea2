//! Strategy result types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Machine-readable diagnostics attached to a result.
pub type Details = Map<String, Value>;

/// Why a strategy did not pass, surfaced as `details.reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// A path, command or URL guard rejected the strategy.
    SecurityViolation,
    /// No test command could be resolved.
    NoTestFramework,
    /// No end-to-end command could be resolved.
    NoE2eFramework,
    /// The subprocess or request exceeded its time bound.
    Timeout,
    /// The HTTP request failed below the protocol level.
    RequestFailed,
    /// The agent invocation itself failed.
    AiCallFailed,
    /// A manual check cannot run unattended.
    CiEnvironment,
    /// One or more checklist items were not confirmed.
    ChecklistIncomplete,
    /// A yes/no confirmation was declined.
    NotConfirmed,
    /// Collecting input or running the check raised an error.
    Error,
    /// The strategy is missing a required field or has an unusable one.
    InvalidConfig,
    /// A configured regular expression does not compile.
    InvalidPattern,
    /// No file matched the configured globs.
    NoFilesMatched,
    /// A composite child has no registered executor.
    ExecutorNotFound,
    /// The subprocess could not be started.
    SpawnFailed,
}

impl FailureReason {
    /// The kebab-case tag stored in `details.reason`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SecurityViolation => "security-violation",
            Self::NoTestFramework => "no-test-framework",
            Self::NoE2eFramework => "no-e2e-framework",
            Self::Timeout => "timeout",
            Self::RequestFailed => "request-failed",
            Self::AiCallFailed => "ai-call-failed",
            Self::CiEnvironment => "ci-environment",
            Self::ChecklistIncomplete => "checklist-incomplete",
            Self::NotConfirmed => "not-confirmed",
            Self::Error => "error",
            Self::InvalidConfig => "invalid-config",
            Self::InvalidPattern => "invalid-pattern",
            Self::NoFilesMatched => "no-files-matched",
            Self::ExecutorNotFound => "executor-not-found",
            Self::SpawnFailed => "spawn-failed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of executing one strategy.
///
/// `success` must always be derivable from `details`; `output` is only a
/// rendering for humans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyResult {
    /// Whether the strategy passed.
    pub success: bool,
    /// Human-readable summary.
    pub output: String,
    /// Machine-readable diagnostics.
    #[serde(default)]
    pub details: Details,
    /// Elapsed wall-clock time.
    #[serde(rename = "durationMs", with = "duration_ms", default)]
    pub duration: Duration,
}

impl StrategyResult {
    /// A passing result with the given summary.
    pub fn pass(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            details: Details::new(),
            duration: Duration::ZERO,
        }
    }

    /// A failing result with the given summary.
    pub fn fail(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            details: Details::new(),
            duration: Duration::ZERO,
        }
    }

    /// A failing result tagged with `details.reason`.
    pub fn failure(reason: FailureReason, output: impl Into<String>) -> Self {
        Self::fail(output).with_reason(reason)
    }

    /// Sets `details.reason`.
    #[must_use]
    pub fn with_reason(self, reason: FailureReason) -> Self {
        self.with_detail("reason", reason.as_str())
    }

    /// Sets a single detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Merges a set of detail entries, overwriting existing keys.
    #[must_use]
    pub fn with_details(mut self, details: Details) -> Self {
        self.details.extend(details);
        self
    }

    /// Sets the elapsed time.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// The `details.reason` tag, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.details.get("reason").and_then(Value::as_str)
    }

    /// Looks up a detail entry.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
