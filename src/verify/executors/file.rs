//! `file` executor: glob expansion plus per-file checks.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use super::security_violation;
use crate::strategy::{FailureReason, FileCheck, FileStrategy, StrategyResult, VerificationStrategy};
use crate::verify::security::{ensure_contained, normalize_path, resolve_within};
use crate::verify::{ExecuteFuture, ExecutionContext, StrategyExecutor};

/// Checks files in the project tree.
#[derive(Debug, Default)]
pub struct FileExecutor;

/// Outcome of one check on one file.
struct CheckOutcome {
    check: &'static str,
    passed: bool,
    message: String,
}

/// A check with its regex compiled up front.
enum PreparedCheck<'a> {
    Plain(&'a FileCheck),
    Pattern(Regex),
}

impl PreparedCheck<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::Plain(check) => check.name(),
            Self::Pattern(_) => "containsPattern",
        }
    }
}

fn prepare(checks: &[FileCheck]) -> Result<Vec<PreparedCheck<'_>>, StrategyResult> {
    checks
        .iter()
        .map(|check| match check {
            FileCheck::ContainsPattern(pattern) => Regex::new(pattern)
                .map(PreparedCheck::Pattern)
                .map_err(|e| {
                    StrategyResult::failure(
                        FailureReason::InvalidPattern,
                        format!("Invalid pattern '{pattern}': {e}"),
                    )
                    .with_detail("pattern", pattern.as_str())
                }),
            other => Ok(PreparedCheck::Plain(other)),
        })
        .collect()
}

/// Expands every glob under `root`. Matches are deduplicated and sorted.
///
/// Each match maps to `None`, or to the error that kept it from resolving
/// (a dangling symlink). Matches that resolve outside `root` abort the
/// expansion.
fn expand(
    root: &Path,
    patterns: &[&str],
) -> Result<BTreeMap<PathBuf, Option<String>>, StrategyResult> {
    let root = normalize_path(root);
    let root = root.as_path();
    let escaped_root = Pattern::escape(&root.to_string_lossy());
    let mut matched = BTreeMap::new();
    for pattern in patterns {
        let resolved = resolve_within(root, pattern).map_err(|v| security_violation(&v))?;
        let relative = resolved.strip_prefix(root).unwrap_or(&resolved);
        let full = if relative.as_os_str().is_empty() {
            escaped_root.clone()
        } else {
            format!("{escaped_root}/{}", relative.to_string_lossy())
        };

        let paths = glob::glob(&full).map_err(|e| {
            StrategyResult::failure(
                FailureReason::InvalidPattern,
                format!("Invalid glob '{pattern}': {e}"),
            )
            .with_detail("pattern", *pattern)
        })?;
        for path in paths.flatten() {
            let unresolved = match path.canonicalize() {
                Ok(_) => {
                    ensure_contained(root, &path).map_err(|v| security_violation(&v))?;
                    None
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "matched path does not resolve");
                    Some(e.to_string())
                }
            };
            matched.insert(path, unresolved);
        }
    }
    Ok(matched)
}

fn run_check(path: &Path, check: &PreparedCheck<'_>) -> CheckOutcome {
    let outcome = |passed: bool, message: String| CheckOutcome {
        check: check.name(),
        passed,
        message,
    };
    let read = || fs::read(path).map(|bytes| String::from_utf8_lossy(&bytes).into_owned());

    match check {
        PreparedCheck::Pattern(re) => match read() {
            Ok(content) if re.is_match(&content) => {
                outcome(true, format!("content matches /{re}/"))
            }
            Ok(_) => outcome(false, format!("content does not match /{re}/")),
            Err(e) => outcome(false, format!("cannot read file: {e}")),
        },
        PreparedCheck::Plain(FileCheck::Exists) => {
            let exists = path.exists();
            outcome(exists, if exists { "exists" } else { "does not exist" }.to_string())
        }
        PreparedCheck::Plain(FileCheck::NotEmpty) => match fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => outcome(true, format!("{} bytes", meta.len())),
            Ok(_) => outcome(false, "file is empty".to_string()),
            Err(e) => outcome(false, format!("cannot stat file: {e}")),
        },
        PreparedCheck::Plain(FileCheck::MatchesContent(expected)) => match read() {
            Ok(content) if &content == expected => {
                outcome(true, "content matches exactly".to_string())
            }
            Ok(content) => outcome(
                false,
                format!("content differs ({} bytes, expected {})", content.len(), expected.len()),
            ),
            Err(e) => outcome(false, format!("cannot read file: {e}")),
        },
        PreparedCheck::Plain(FileCheck::SizeConstraint(bounds)) => match fs::metadata(path) {
            Ok(meta) => {
                let passed = bounds.admits(meta.len());
                outcome(
                    passed,
                    format!(
                        "{} bytes (min {:?}, max {:?})",
                        meta.len(),
                        bounds.min,
                        bounds.max
                    ),
                )
            }
            Err(e) => outcome(false, format!("cannot stat file: {e}")),
        },
        PreparedCheck::Plain(FileCheck::Permissions(mode)) => {
            check_permissions(path, mode, outcome)
        }
        PreparedCheck::Plain(FileCheck::ContainsPattern(_)) => {
            outcome(false, "pattern was not compiled".to_string())
        }
    }
}

#[cfg(unix)]
fn check_permissions(
    path: &Path,
    mode: &str,
    outcome: impl Fn(bool, String) -> CheckOutcome,
) -> CheckOutcome {
    use std::os::unix::fs::PermissionsExt;

    let digits = mode.trim().trim_start_matches("0o");
    let Ok(expected) = u32::from_str_radix(digits, 8) else {
        return outcome(false, format!("invalid permission mode '{mode}'"));
    };
    match fs::metadata(path) {
        Ok(meta) => {
            let actual = meta.permissions().mode() & 0o777;
            let expected = expected & 0o777;
            outcome(actual == expected, format!("mode {actual:o}, expected {expected:o}"))
        }
        Err(e) => outcome(false, format!("cannot stat file: {e}")),
    }
}

#[cfg(not(unix))]
fn check_permissions(
    _path: &Path,
    _mode: &str,
    outcome: impl Fn(bool, String) -> CheckOutcome,
) -> CheckOutcome {
    outcome(true, "skipped: POSIX permissions unavailable on this platform".to_string())
}

fn verify(root: &Path, strategy: &FileStrategy) -> StrategyResult {
    let patterns = strategy.patterns();
    if patterns.is_empty() {
        return StrategyResult::failure(
            FailureReason::InvalidConfig,
            "File strategy has no 'path' or 'paths'",
        );
    }

    let default_checks = [FileCheck::Exists];
    let checks = if strategy.checks.is_empty() {
        &default_checks[..]
    } else {
        &strategy.checks[..]
    };
    let prepared = match prepare(checks) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let files = match expand(root, &patterns) {
        Ok(files) => files,
        Err(result) => return result,
    };
    debug!(patterns = ?patterns, matched = files.len(), "expanded file globs");
    if files.is_empty() {
        return StrategyResult::failure(
            FailureReason::NoFilesMatched,
            format!("No files matched: {}", patterns.join(", ")),
        )
        .with_detail("patterns", json!(patterns))
        .with_detail("filesChecked", 0);
    }

    let base = normalize_path(root);
    let mut results = Vec::with_capacity(files.len());
    let mut failures = Vec::new();
    for (path, unresolved) in &files {
        let display = path.strip_prefix(&base).unwrap_or(path).display().to_string();
        let mut outcomes = Vec::new();
        match unresolved {
            Some(error) => outcomes.push(CheckOutcome {
                check: "resolve",
                passed: false,
                message: format!("cannot resolve path: {error}"),
            }),
            None => {
                for check in &prepared {
                    let outcome = run_check(path, check);
                    let passed = outcome.passed;
                    outcomes.push(outcome);
                    if !passed {
                        break;
                    }
                }
            }
        }
        let passed = outcomes.iter().all(|o| o.passed);
        if let Some(failed) = outcomes.iter().find(|o| !o.passed) {
            failures.push(format!("{display} ({}: {})", failed.check, failed.message));
        }
        let checks: Vec<Value> = outcomes
            .iter()
            .map(|o| json!({"check": o.check, "passed": o.passed, "message": o.message}))
            .collect();
        results.push(json!({"file": display, "passed": passed, "checks": checks}));
    }

    let total = results.len();
    let mut result = if failures.is_empty() {
        StrategyResult::pass(format!("All {total} file(s) passed {} check(s)", prepared.len()))
    } else {
        StrategyResult::fail(format!(
            "{} of {total} file(s) failed: {}",
            failures.len(),
            failures.join("; ")
        ))
    };
    result = result
        .with_detail("patterns", json!(patterns))
        .with_detail("filesChecked", total)
        .with_detail("results", Value::Array(results));
    result
}

impl StrategyExecutor for FileExecutor {
    fn execute<'a>(
        &'a self,
        ctx: &'a ExecutionContext<'a>,
        strategy: &'a VerificationStrategy,
    ) -> ExecuteFuture<'a> {
        Box::pin(async move {
            match strategy {
                VerificationStrategy::File(file) => verify(ctx.project_root, file),
                other => StrategyResult::failure(
                    FailureReason::InvalidConfig,
                    format!("file executor cannot run a '{}' strategy", other.kind()),
                ),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::SizeConstraint;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::write(root.join("src/index.ts"), "export const a = 1;\n").unwrap();
        fs::write(root.join("src/nested/util.ts"), "export function b() {}\n").unwrap();
        fs::write(root.join("README.md"), "").unwrap();
        dir
    }

    fn strategy(paths: &[&str], checks: Vec<FileCheck>) -> FileStrategy {
        FileStrategy {
            paths: paths.iter().map(ToString::to_string).collect(),
            checks,
            ..FileStrategy::default()
        }
    }

    #[test]
    fn recursive_glob_with_content_check() {
        let dir = project();
        let checks = vec![FileCheck::ContainsPattern("export".into())];
        let result = verify(dir.path(), &strategy(&["src/**/*.ts"], checks));
        assert!(result.success, "{}", result.output);
        assert_eq!(result.detail("filesChecked"), Some(&json!(2)));
    }

    #[test]
    fn defaults_to_exists_check() {
        let dir = project();
        let mut file = FileStrategy { path: Some("README.md".into()), ..FileStrategy::default() };
        let result = verify(dir.path(), &file);
        assert!(result.success);
        assert_eq!(result.detail("results").unwrap()[0]["checks"][0]["check"], json!("exists"));

        file.checks = vec![FileCheck::NotEmpty];
        assert!(!verify(dir.path(), &file).success);
    }

    #[test]
    fn short_circuits_per_file() {
        let dir = project();
        let result = verify(
            dir.path(),
            &strategy(
                &["README.md"],
                vec![FileCheck::NotEmpty, FileCheck::ContainsPattern("x".into())],
            ),
        );
        let checks = result.detail("results").unwrap()[0]["checks"].as_array().unwrap().clone();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0]["passed"], json!(false));
    }

    #[test]
    fn overlapping_globs_are_deduplicated() {
        let dir = project();
        let result = verify(dir.path(), &strategy(&["src/*.ts", "src/index.ts"], vec![]));
        assert_eq!(result.detail("filesChecked"), Some(&json!(1)));
    }

    #[test]
    fn no_match_fails() {
        let dir = project();
        let result = verify(dir.path(), &strategy(&["lib/*.rs"], vec![]));
        assert!(!result.success);
        assert_eq!(result.reason(), Some("no-files-matched"));
        assert!(result.output.starts_with("No files matched"));
    }

    #[test]
    fn size_and_exact_content() {
        let dir = project();
        let checks = vec![
            FileCheck::SizeConstraint(SizeConstraint { min: Some(1), max: Some(100) }),
            FileCheck::MatchesContent("export const a = 1;\n".into()),
        ];
        assert!(verify(dir.path(), &strategy(&["src/index.ts"], checks)).success);

        let too_small = vec![FileCheck::SizeConstraint(SizeConstraint {
            min: Some(1000),
            max: None,
        })];
        assert!(!verify(dir.path(), &strategy(&["src/index.ts"], too_small)).success);
    }

    #[cfg(unix)]
    #[test]
    fn permission_bits_are_compared() {
        use std::os::unix::fs::PermissionsExt;

        let dir = project();
        let script = dir.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let mode = |bits: &str| strategy(&["run.sh"], vec![FileCheck::Permissions(bits.into())]);
        assert!(verify(dir.path(), &mode("755")).success);
        assert!(!verify(dir.path(), &mode("644")).success);
    }

    #[test]
    fn traversal_and_bad_patterns_are_rejected() {
        let dir = project();
        let result = verify(dir.path(), &strategy(&["../../etc/passwd"], vec![]));
        assert_eq!(result.reason(), Some("security-violation"));

        let bad_regex = vec![FileCheck::ContainsPattern("(".into())];
        let result = verify(dir.path(), &strategy(&["src/*.ts"], bad_regex));
        assert_eq!(result.reason(), Some("invalid-pattern"));

        let result = verify(dir.path(), &FileStrategy::default());
        assert_eq!(result.reason(), Some("invalid-config"));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_fails_that_file_only() {
        let dir = project();
        let link = dir.path().join("broken.md");
        std::os::unix::fs::symlink(dir.path().join("gone.md"), link).unwrap();

        let result = verify(dir.path(), &strategy(&["*.md"], vec![]));
        assert!(!result.success);
        assert_eq!(result.reason(), None);
        assert_eq!(result.detail("filesChecked"), Some(&json!(2)));

        let results = result.detail("results").unwrap().as_array().unwrap();
        let broken = results.iter().find(|r| r["file"] == json!("broken.md")).unwrap();
        assert_eq!(broken["checks"][0]["check"], json!("resolve"));
        let message = broken["checks"][0]["message"].as_str().unwrap();
        assert!(message.starts_with("cannot resolve path"), "{message}");
        let readme = results.iter().find(|r| r["file"] == json!("README.md")).unwrap();
        assert_eq!(readme["passed"], json!(true));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_the_root_is_a_violation() {
        let dir = project();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.md"), "token").unwrap();
        let link = dir.path().join("leak.md");
        std::os::unix::fs::symlink(outside.path().join("secret.md"), link).unwrap();

        let result = verify(dir.path(), &strategy(&["*.md"], vec![]));
        assert_eq!(result.reason(), Some("security-violation"));
    }
}
