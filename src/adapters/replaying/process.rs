//! Replaying adapter for the `ProcessRunner` port.

use std::sync::{Arc, Mutex};

use super::next_output;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{ProcessInvocation, ProcessOutput, ProcessRunner};

/// Serves recorded subprocess results from a cassette.
pub struct ReplayingProcessRunner {
    replayer: Option<Arc<Mutex<CassetteReplayer>>>,
}

impl ReplayingProcessRunner {
    /// Creates a runner backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer: Some(replayer) }
    }

    /// Creates a runner with no cassette. Panics when called.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }
}

impl ProcessRunner for ReplayingProcessRunner {
    fn run(&self, _invocation: &ProcessInvocation) -> Result<ProcessOutput, String> {
        next_output(self.replayer.as_ref(), "process", "run")
    }
}
