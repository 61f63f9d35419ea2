//! Recording adapter for the `AgentCaller` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_interaction;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{AgentCaller, AgentFuture, AgentOptions};

/// Records agent calls while delegating to an inner caller.
pub struct RecordingAgentCaller {
    inner: Arc<dyn AgentCaller>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingAgentCaller {
    /// Creates a recording caller wrapping `inner`.
    pub fn new(inner: Arc<dyn AgentCaller>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct CallInput<'a> {
    prompt: &'a str,
    options: &'a AgentOptions,
}

impl AgentCaller for RecordingAgentCaller {
    fn call(&self, prompt: &str, options: &AgentOptions) -> AgentFuture<'_> {
        let prompt = prompt.to_string();
        let options = options.clone();
        Box::pin(async move {
            let result = self.inner.call(&prompt, &options).await;
            let input = CallInput { prompt: &prompt, options: &options };
            record_interaction(&self.recorder, "agent", "call", &input, &result);
            result
        })
    }
}
