//! Process runner port for executing shell commands.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A fully assembled subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInvocation {
    /// Command line passed to the system shell.
    pub command: String,
    /// Absolute working directory.
    pub cwd: PathBuf,
    /// Environment variables merged over the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Hard wall-clock timeout in milliseconds.
    pub timeout_ms: u64,
}

/// The output of a finished (or killed) subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    /// Exit code; `None` when the process was killed by a signal or timeout.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process was killed because it exceeded its timeout.
    pub timed_out: bool,
}

/// Runs shell commands with a bounded timeout.
///
/// Abstracting process execution lets tests observe (or forbid) spawns and
/// lets cassettes replay recorded outputs.
pub trait ProcessRunner: Send + Sync {
    /// Runs the invocation to completion or until its timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or awaited.
    fn run(&self, invocation: &ProcessInvocation) -> Result<ProcessOutput, String>;
}
