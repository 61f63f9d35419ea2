//! Replaying adapter for the `InteractivePrompt` port.

use std::sync::{Arc, Mutex};

use super::next_output;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::InteractivePrompt;

/// Serves recorded human answers from a cassette.
pub struct ReplayingPrompt {
    replayer: Option<Arc<Mutex<CassetteReplayer>>>,
}

impl ReplayingPrompt {
    /// Creates a prompt backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer: Some(replayer) }
    }

    /// Creates a prompt with no cassette. Panics when called.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }
}

impl InteractivePrompt for ReplayingPrompt {
    fn ask_yes_no(&self, _prompt: &str) -> Result<bool, String> {
        next_output(self.replayer.as_ref(), "prompt", "ask_yes_no")
    }

    fn ask_checklist(&self, _items: &[String]) -> Result<Vec<bool>, String> {
        next_output(self.replayer.as_ref(), "prompt", "ask_checklist")
    }
}
