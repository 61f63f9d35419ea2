//! Project capability port for locating test commands.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Test tooling detected for a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCapabilities {
    /// Command that runs the unit/integration suite.
    pub test_command: Option<String>,
    /// Framework behind `test_command` (e.g. `"vitest"`, `"pytest"`).
    pub test_framework: Option<String>,
    /// Command that runs the end-to-end suite.
    pub e2e_command: Option<String>,
    /// Framework behind `e2e_command` (e.g. `"playwright"`).
    pub e2e_framework: Option<String>,
}

/// Detects how a project runs its tests.
pub trait CapabilityDetector: Send + Sync {
    /// Inspects the project at `project_root`.
    fn detect(&self, project_root: &Path) -> ProjectCapabilities;
}

/// Fixed capabilities, independent of the project on disk.
impl CapabilityDetector for ProjectCapabilities {
    fn detect(&self, _project_root: &Path) -> ProjectCapabilities {
        self.clone()
    }
}
