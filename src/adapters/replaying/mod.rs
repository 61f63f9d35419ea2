//! Replaying adapters that serve recorded interactions.
//!
//! Adapters without a cassette panic on first use, so a test that touches a
//! port it did not configure fails loudly instead of reaching the real system.

pub mod agent;
pub mod capabilities;
pub mod http;
pub mod process;
pub mod prompt;

pub use agent::ReplayingAgentCaller;
pub use capabilities::ReplayingCapabilityDetector;
pub use http::ReplayingHttpClient;
pub use process::ReplayingProcessRunner;
pub use prompt::ReplayingPrompt;

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;

use crate::cassette::replayer::CassetteReplayer;

/// Takes the next recorded output for `port::method` and decodes it.
///
/// # Panics
///
/// Panics when no cassette is configured for the port, when the cassette is
/// exhausted, or when the recorded output does not decode as `T`.
pub(crate) fn next_output<T: DeserializeOwned>(
    replayer: Option<&Arc<Mutex<CassetteReplayer>>>,
    port: &str,
    method: &str,
) -> T {
    let Some(replayer) = replayer else {
        panic!("No cassette configured for port {port:?}; cannot replay {port}::{method}");
    };
    let output = replayer
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .next_interaction(port, method)
        .output;
    serde_json::from_value(output).unwrap_or_else(|e| {
        panic!("Recorded output for {port}::{method} does not match the expected shape: {e}")
    })
}
