//! AI agent port for judging acceptance criteria.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

/// Boxed future type alias used by [`AgentCaller`] to keep the trait dyn-compatible.
pub type AgentFuture<'a> =
    Pin<Box<dyn Future<Output = Result<AgentResponse, String>> + Send + 'a>>;

/// Options forwarded to the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOptions {
    /// Requested model, if the strategy names one.
    pub model: Option<String>,
    /// Directory the agent should treat as the project root.
    pub cwd: PathBuf,
    /// Timeout for the call in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// What the agent answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Whether the agent ran to completion.
    pub success: bool,
    /// Raw agent output.
    pub output: String,
    /// Which concrete agent answered.
    #[serde(default)]
    pub agent_used: Option<String>,
    /// Error reported by the agent when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
}

/// Invokes an AI agent with a prompt.
///
/// The verification engine is agnostic to which agent process answers.
pub trait AgentCaller: Send + Sync {
    /// Sends the prompt and waits for the agent's answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent cannot be reached at all.
    fn call(&self, prompt: &str, options: &AgentOptions) -> AgentFuture<'_>;
}
