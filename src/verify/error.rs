//! Engine error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::strategy::StrategyKind;

/// Hard errors raised by [`execute_strategy`](super::execute_strategy).
///
/// Verification failures are never errors; they are results with
/// `success == false`. Only configuration defects surface here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// The strategy's type has no registered executor.
    #[error("no executor registered for strategy type '{kind}'")]
    UnregisteredStrategy {
        /// The unresolved type tag.
        kind: StrategyKind,
    },
}

/// A guard rejected a path, command, or URL before it reached the OS.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityViolation {
    /// The path resolves outside the project root.
    #[error("path '{path}' resolves outside the project root {}", root.display())]
    PathEscape {
        /// The path as written in the strategy.
        path: String,
        /// The project root it was resolved against.
        root: PathBuf,
    },
    /// The command matches a destructive pattern.
    #[error("command rejected as dangerous ({description}): {command}")]
    DangerousCommand {
        /// The assembled command line.
        command: String,
        /// Which pattern matched.
        description: &'static str,
    },
    /// The URL cannot be parsed.
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl {
        /// The URL after variable substitution.
        url: String,
        /// Parser message.
        message: String,
    },
    /// The URL uses a scheme other than http or https.
    #[error("URL scheme '{scheme}' is not allowed")]
    DisallowedScheme {
        /// The rejected scheme.
        scheme: String,
    },
    /// The URL host is not on the allowlist.
    #[error("host '{host}' is not in the allowed hosts list")]
    DisallowedHost {
        /// The rejected host.
        host: String,
    },
}
