//! Strategy executors, one per strategy type.
//!
//! Leaf executors hold the ports they need (`Arc<dyn ...>`) and never touch
//! the OS except through them, apart from the `file` executor which reads
//! the project tree directly.

mod ai;
mod command;
mod composite;
mod file;
mod http;
mod manual;
mod script;
mod subprocess;

pub use ai::{AiExecutor, Verdict, DEFAULT_AI_TIMEOUT_MS, DEFAULT_MIN_CONFIDENCE};
pub use command::CommandExecutor;
pub use composite::CompositeExecutor;
pub use file::FileExecutor;
pub use http::{HttpExecutor, DEFAULT_HTTP_TIMEOUT_MS};
pub use manual::{is_ci_environment, ManualExecutor};
pub use script::ScriptExecutor;
pub use subprocess::DEFAULT_PROCESS_TIMEOUT_MS;
pub use test::{Framework, TestExecutor, DEFAULT_E2E_TIMEOUT_MS};

use tracing::warn;

use super::error::SecurityViolation;
use crate::strategy::{FailureReason, StrategyResult};

/// Longest excerpt of process output or response body kept in details.
const MAX_EXCERPT_CHARS: usize = 4000;

/// Result for a strategy rejected by a guard. Nothing was executed.
fn security_violation(violation: &SecurityViolation) -> StrategyResult {
    warn!(%violation, "security guard rejected strategy");
    StrategyResult::failure(
        FailureReason::SecurityViolation,
        format!("Security violation: {violation}"),
    )
    .with_detail("violation", violation.to_string())
}

/// Keeps the last `MAX_EXCERPT_CHARS` characters of `text`.
fn tail_excerpt(text: &str) -> String {
    let count = text.chars().count();
    if count <= MAX_EXCERPT_CHARS {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - MAX_EXCERPT_CHARS).collect();
    format!("[... {} characters truncated]\n{tail}", count - MAX_EXCERPT_CHARS)
}

/// Keeps the first `MAX_EXCERPT_CHARS` characters of `text`.
fn head_excerpt(text: &str) -> String {
    let count = text.chars().count();
    if count <= MAX_EXCERPT_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_EXCERPT_CHARS).collect();
    format!("{head}\n[... {} characters truncated]", count - MAX_EXCERPT_CHARS)
}
