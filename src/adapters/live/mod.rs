//! Live adapters for real external interactions.

pub mod agent;
pub mod capabilities;
pub mod http;
pub mod process;
pub mod prompt;

pub use agent::LiveAgentCaller;
pub use capabilities::LiveCapabilityDetector;
pub use http::LiveHttpClient;
pub use process::LiveProcessRunner;
pub use prompt::TerminalPrompt;
