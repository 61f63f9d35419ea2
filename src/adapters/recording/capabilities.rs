//! Recording adapter for the `CapabilityDetector` port.

use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_interaction;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{CapabilityDetector, ProjectCapabilities};

/// Records capability detection while delegating to an inner detector.
pub struct RecordingCapabilityDetector {
    inner: Arc<dyn CapabilityDetector>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingCapabilityDetector {
    /// Creates a recording detector wrapping `inner`.
    pub fn new(inner: Arc<dyn CapabilityDetector>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct DetectInput<'a> {
    project_root: &'a Path,
}

impl CapabilityDetector for RecordingCapabilityDetector {
    fn detect(&self, project_root: &Path) -> ProjectCapabilities {
        let capabilities = self.inner.detect(project_root);
        let input = DetectInput { project_root };
        record_interaction(&self.recorder, "capabilities", "detect", &input, &capabilities);
        capabilities
    }
}
