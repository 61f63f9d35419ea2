//! `verity check` command.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::block_on;
use crate::context::ServiceContext;
use crate::strategy::{parse_feature_document, StrategyResult};
use crate::verify::execute_strategy;

/// Execute the `check` command.
///
/// Loads the feature document, runs its verification tree against
/// `root` (or the current directory) and writes a report to `out`.
///
/// # Errors
///
/// Returns an error string if the document cannot be loaded, declares no
/// verification, dispatch fails, or the verification does not pass.
pub fn run(
    ctx: &ServiceContext,
    feature_path: &Path,
    root: Option<&Path>,
    json: bool,
    out: &mut impl Write,
) -> Result<(), String> {
    let content = std::fs::read_to_string(feature_path)
        .map_err(|e| format!("Failed to read {}: {e}", feature_path.display()))?;
    let document = parse_feature_document(&content)?;
    let Some(strategy) = document.verification.as_ref() else {
        return Err(format!("Feature '{}' declares no verification strategy", document.feature.id));
    };
    let root = project_root(root)?;

    let registry = ctx.registry();
    let result = block_on(execute_strategy(&registry, &root, strategy, &document.feature))?
        .map_err(|e| e.to_string())?;

    if json {
        let encoded = serde_json::to_string_pretty(&result)
            .map_err(|e| format!("Failed to encode result: {e}"))?;
        writeln!(out, "{encoded}").map_err(|e| format!("write error: {e}"))?;
    } else {
        write_report(out, &document.feature.id, strategy.kind().as_str(), &result)
            .map_err(|e| format!("write error: {e}"))?;
    }

    if result.success {
        Ok(())
    } else {
        Err(format!("Verification failed for feature '{}'", document.feature.id))
    }
}

fn project_root(root: Option<&Path>) -> Result<PathBuf, String> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir()
            .map_err(|e| format!("Failed to read current directory: {e}"))?,
    };
    root.canonicalize().map_err(|e| format!("Invalid project root {}: {e}", root.display()))
}

fn status_label(success: bool) -> &'static str {
    if success { "PASS" } else { "FAIL" }
}

fn write_report(
    out: &mut impl Write,
    feature_id: &str,
    kind: &str,
    result: &StrategyResult,
) -> std::io::Result<()> {
    writeln!(
        out,
        "{}  {feature_id} ({kind}, {}ms)",
        status_label(result.success),
        result.duration.as_millis()
    )?;
    writeln!(out, "  {}", result.output)?;
    if let Some(reason) = result.reason() {
        writeln!(out, "  reason: {reason}")?;
    }
    if let Some(Value::Array(children)) = result.detail("nestedResults") {
        write_nested(out, children, 1)?;
    }
    Ok(())
}

/// Renders a composite's `nestedResults` as an indented tree.
fn write_nested(out: &mut impl Write, children: &[Value], depth: usize) -> std::io::Result<()> {
    let indent = "  ".repeat(depth);
    for child in children {
        let success = child["success"].as_bool().unwrap_or(false);
        let kind = child["type"].as_str().unwrap_or("?");
        let output = child["output"].as_str().unwrap_or_default();
        write!(out, "{indent}- {} {kind}: {output}", status_label(success))?;
        match child["reason"].as_str() {
            Some(reason) => writeln!(out, " [{reason}]")?,
            None => writeln!(out)?,
        }
        if let Some(Value::Array(grandchildren)) = child["details"].get("nestedResults") {
            write_nested(out, grandchildren, depth + 1)?;
        }
    }
    Ok(())
}
