//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the verification engine and an
//! external system (subprocesses, network, AI agent, terminal, project
//! tooling). Implementations live in `src/adapters/`.

pub mod agent;
pub mod capabilities;
pub mod http;
pub mod process;
pub mod prompt;

pub use agent::{AgentCaller, AgentFuture, AgentOptions, AgentResponse};
pub use capabilities::{CapabilityDetector, ProjectCapabilities};
pub use http::{HttpClient, HttpError, HttpFuture, HttpRequest, HttpResponse};
pub use process::{ProcessInvocation, ProcessOutput, ProcessRunner};
pub use prompt::InteractivePrompt;
