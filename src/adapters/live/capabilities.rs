//! Live capability detection from the project's manifest files.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::ports::{CapabilityDetector, ProjectCapabilities};

/// Detects test tooling from files at the project root.
///
/// Checked in order: `package.json`, `Cargo.toml`, `go.mod`, pytest markers.
/// The first ecosystem providing a unit test command wins; e2e detection only
/// looks at `package.json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveCapabilityDetector;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    #[serde(default)]
    scripts: serde_json::Map<String, Value>,
    #[serde(default)]
    dependencies: serde_json::Map<String, Value>,
    #[serde(default)]
    dev_dependencies: serde_json::Map<String, Value>,
}

impl PackageJson {
    fn depends_on(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }

    fn script(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).and_then(Value::as_str)
    }
}

fn from_package_json(pkg: &PackageJson, caps: &mut ProjectCapabilities) {
    let unit = ["vitest", "jest", "mocha"].into_iter().find(|fw| {
        pkg.depends_on(fw) || pkg.script("test").is_some_and(|script| script.contains(fw))
    });
    if let Some(framework) = unit {
        caps.test_framework = Some(framework.to_string());
        caps.test_command = Some(if pkg.script("test").is_some() {
            "npm test".to_string()
        } else {
            format!("npx {framework}")
        });
    }

    if pkg.depends_on("@playwright/test") || pkg.depends_on("playwright") {
        caps.e2e_framework = Some("playwright".into());
        caps.e2e_command = Some("npx playwright test".into());
    } else if pkg.depends_on("cypress") {
        caps.e2e_framework = Some("cypress".into());
        caps.e2e_command = Some("npx cypress run".into());
    }
}

fn has_pytest_markers(root: &Path) -> bool {
    if root.join("pytest.ini").is_file() || root.join("conftest.py").is_file() {
        return true;
    }
    fs::read_to_string(root.join("pyproject.toml")).is_ok_and(|text| text.contains("[tool.pytest"))
}

impl CapabilityDetector for LiveCapabilityDetector {
    fn detect(&self, project_root: &Path) -> ProjectCapabilities {
        let mut caps = ProjectCapabilities::default();

        if let Ok(text) = fs::read_to_string(project_root.join("package.json")) {
            match serde_json::from_str::<PackageJson>(&text) {
                Ok(pkg) => from_package_json(&pkg, &mut caps),
                Err(e) => debug!(error = %e, "ignoring unparseable package.json"),
            }
        }

        if caps.test_command.is_none() {
            if project_root.join("Cargo.toml").is_file() {
                caps.test_command = Some("cargo test".into());
                caps.test_framework = Some("cargo".into());
            } else if project_root.join("go.mod").is_file() {
                caps.test_command = Some("go test ./...".into());
                caps.test_framework = Some("go".into());
            } else if has_pytest_markers(project_root) {
                caps.test_command = Some("pytest".into());
                caps.test_framework = Some("pytest".into());
            }
        }

        debug!(
            root = %project_root.display(),
            test = ?caps.test_framework,
            e2e = ?caps.e2e_framework,
            "detected project capabilities"
        );
        caps
    }
}
