//! Recording adapter for the `InteractivePrompt` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_interaction;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::InteractivePrompt;

/// Records human answers while delegating to an inner prompt.
pub struct RecordingPrompt {
    inner: Arc<dyn InteractivePrompt>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingPrompt {
    /// Creates a recording prompt wrapping `inner`.
    pub fn new(inner: Arc<dyn InteractivePrompt>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct QuestionInput<'a> {
    prompt: &'a str,
}

#[derive(Serialize)]
struct ChecklistInput<'a> {
    items: &'a [String],
}

impl InteractivePrompt for RecordingPrompt {
    fn ask_yes_no(&self, prompt: &str) -> Result<bool, String> {
        let result = self.inner.ask_yes_no(prompt);
        let input = QuestionInput { prompt };
        record_interaction(&self.recorder, "prompt", "ask_yes_no", &input, &result);
        result
    }

    fn ask_checklist(&self, items: &[String]) -> Result<Vec<bool>, String> {
        let result = self.inner.ask_checklist(items);
        let input = ChecklistInput { items };
        record_interaction(&self.recorder, "prompt", "ask_checklist", &input, &result);
        result
    }
}
