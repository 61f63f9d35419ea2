//! Recording adapters that capture interactions to cassettes.
//!
//! Each adapter delegates to an inner port and records the call's input and
//! the serde encoding of its output. Fallible calls record the whole
//! `Result`, which serde encodes as `{"Ok": ...}` or `{"Err": ...}`.

pub mod agent;
pub mod capabilities;
pub mod http;
pub mod process;
pub mod prompt;

pub use agent::RecordingAgentCaller;
pub use capabilities::RecordingCapabilityDetector;
pub use http::RecordingHttpClient;
pub use process::RecordingProcessRunner;
pub use prompt::RecordingPrompt;

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::warn;

use crate::cassette::recorder::CassetteRecorder;

/// Appends one interaction to `recorder`.
///
/// A value that fails to serialize is logged and skipped; recording never
/// changes what the wrapped call returns.
pub(crate) fn record_interaction<I, O>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    output: &O,
) where
    I: Serialize + ?Sized,
    O: Serialize + ?Sized,
{
    let (input, output) = match (serde_json::to_value(input), serde_json::to_value(output)) {
        (Ok(input), Ok(output)) => (input, output),
        (Err(e), _) | (_, Err(e)) => {
            warn!(port, method, error = %e, "skipping interaction that cannot be serialized");
            return;
        }
    };
    recorder.lock().unwrap_or_else(PoisonError::into_inner).record(port, method, input, output);
}
