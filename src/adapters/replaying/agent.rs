//! Replaying adapter for the `AgentCaller` port.

use std::sync::{Arc, Mutex};

use super::next_output;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{AgentCaller, AgentFuture, AgentOptions, AgentResponse};

/// Serves recorded agent answers from a cassette.
pub struct ReplayingAgentCaller {
    replayer: Option<Arc<Mutex<CassetteReplayer>>>,
}

impl ReplayingAgentCaller {
    /// Creates a caller backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer: Some(replayer) }
    }

    /// Creates a caller with no cassette. Panics when called.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }
}

impl AgentCaller for ReplayingAgentCaller {
    fn call(&self, _prompt: &str, _options: &AgentOptions) -> AgentFuture<'_> {
        let output: Result<AgentResponse, String> =
            next_output(self.replayer.as_ref(), "agent", "call");
        Box::pin(async move { output })
    }
}
