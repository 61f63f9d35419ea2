//! Replaying adapter for the `CapabilityDetector` port.

use std::path::Path;
use std::sync::{Arc, Mutex};

use super::next_output;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{CapabilityDetector, ProjectCapabilities};

/// Serves recorded capability detection from a cassette.
pub struct ReplayingCapabilityDetector {
    replayer: Option<Arc<Mutex<CassetteReplayer>>>,
}

impl ReplayingCapabilityDetector {
    /// Creates a detector backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer: Some(replayer) }
    }

    /// Creates a detector with no cassette. Panics when called.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }
}

impl CapabilityDetector for ReplayingCapabilityDetector {
    fn detect(&self, _project_root: &Path) -> ProjectCapabilities {
        next_output(self.replayer.as_ref(), "capabilities", "detect")
    }
}
