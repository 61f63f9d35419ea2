//! Shared subprocess evaluation for `test`, `e2e`, `script` and `command`.

use std::path::Path;

use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use super::{security_violation, tail_excerpt};
use crate::ports::{ProcessInvocation, ProcessOutput, ProcessRunner};
use crate::strategy::{FailureReason, OutputExpectations, ProcessOptions, StrategyResult};
use crate::verify::security::{check_command, resolve_within};

/// Default timeout for `test`, `script` and `command` strategies.
pub const DEFAULT_PROCESS_TIMEOUT_MS: u64 = 60_000;

/// A fully assembled command plus the strategy's process options.
pub(super) struct Subprocess<'a> {
    pub command: String,
    pub process: &'a ProcessOptions,
    pub expect: &'a OutputExpectations,
    pub default_timeout_ms: u64,
}

/// Compiled output expectations.
struct Patterns {
    stdout: Option<Regex>,
    stderr: Option<Regex>,
    not: Vec<Regex>,
}

impl Patterns {
    fn compile(expect: &OutputExpectations) -> Result<Self, (String, regex::Error)> {
        let compile = |pattern: &String| Regex::new(pattern).map_err(|e| (pattern.clone(), e));
        Ok(Self {
            stdout: expect.stdout_pattern.as_ref().map(compile).transpose()?,
            stderr: expect.stderr_pattern.as_ref().map(compile).transpose()?,
            not: expect.not_patterns.iter().map(compile).collect::<Result<_, _>>()?,
        })
    }
}

/// Guards, runs and evaluates a subprocess.
///
/// The command and working directory are checked before the runner is
/// touched; a rejected invocation never spawns.
pub(super) fn run(
    runner: &dyn ProcessRunner,
    project_root: &Path,
    spec: Subprocess<'_>,
) -> StrategyResult {
    if let Err(violation) = check_command(&spec.command) {
        return security_violation(&violation).with_detail("command", spec.command);
    }
    let cwd = match resolve_within(project_root, spec.process.cwd.as_deref().unwrap_or(".")) {
        Ok(cwd) => cwd,
        Err(violation) => {
            return security_violation(&violation).with_detail("command", spec.command);
        }
    };

    let patterns = match Patterns::compile(spec.expect) {
        Ok(patterns) => patterns,
        Err((pattern, e)) => {
            return StrategyResult::failure(
                FailureReason::InvalidPattern,
                format!("Invalid pattern '{pattern}': {e}"),
            )
            .with_detail("pattern", pattern);
        }
    };

    let mut env = spec.process.env.clone();
    env.insert("CI".to_string(), "true".to_string());
    let invocation = ProcessInvocation {
        command: spec.command,
        cwd,
        env,
        timeout_ms: spec.process.timeout.unwrap_or(spec.default_timeout_ms),
    };

    debug!(
        command = %invocation.command,
        cwd = %invocation.cwd.display(),
        timeout_ms = invocation.timeout_ms,
        "running subprocess"
    );
    let output = match runner.run(&invocation) {
        Ok(output) => output,
        Err(e) => {
            return StrategyResult::failure(
                FailureReason::SpawnFailed,
                format!("Failed to run '{}': {e}", invocation.command),
            )
            .with_detail("command", invocation.command)
            .with_detail("error", e);
        }
    };

    evaluate(&invocation, spec.expect, &patterns, &output)
}

fn evaluate(
    invocation: &ProcessInvocation,
    expect: &OutputExpectations,
    patterns: &Patterns,
    output: &ProcessOutput,
) -> StrategyResult {
    let base = StrategyResult::fail("")
        .with_detail("command", invocation.command.as_str())
        .with_detail("cwd", invocation.cwd.display().to_string())
        .with_detail("exitCode", output.exit_code)
        .with_detail("timedOut", output.timed_out)
        .with_detail("stdout", tail_excerpt(&output.stdout))
        .with_detail("stderr", tail_excerpt(&output.stderr));

    if output.timed_out {
        let mut result = base.with_reason(FailureReason::Timeout);
        result.output = format!(
            "'{}' timed out after {}ms",
            invocation.command, invocation.timeout_ms
        );
        return result;
    }

    let accepted = expect
        .expected_exit_code
        .as_ref()
        .map_or_else(|| vec![0], |codes| codes.to_vec());
    let exit_code_matched = output.exit_code.is_some_and(|code| accepted.contains(&code));

    let stdout_matched = patterns.stdout.as_ref().map(|re| re.is_match(&output.stdout));
    let stderr_matched = patterns.stderr.as_ref().map(|re| re.is_match(&output.stderr));
    let not_pattern_matches: Vec<&str> = patterns
        .not
        .iter()
        .filter(|re| re.is_match(&output.stdout) || re.is_match(&output.stderr))
        .map(Regex::as_str)
        .collect();

    let success = exit_code_matched
        && stdout_matched != Some(false)
        && stderr_matched != Some(false)
        && not_pattern_matches.is_empty();

    let mut problems = Vec::new();
    if !exit_code_matched {
        problems.push(match output.exit_code {
            Some(code) => format!("exit code {code} not in {accepted:?}"),
            None => "process terminated by signal".to_string(),
        });
    }
    if stdout_matched == Some(false) {
        problems.push("stdout did not match pattern".to_string());
    }
    if stderr_matched == Some(false) {
        problems.push("stderr did not match pattern".to_string());
    }
    if !not_pattern_matches.is_empty() {
        problems.push(format!("forbidden output matched: {}", not_pattern_matches.join(", ")));
    }

    let mut result = base
        .with_detail("expectedExitCode", json!(accepted))
        .with_detail("exitCodeMatched", exit_code_matched)
        .with_detail("stdoutPatternMatched", stdout_matched.map_or(Value::Null, Value::Bool))
        .with_detail("stderrPatternMatched", stderr_matched.map_or(Value::Null, Value::Bool))
        .with_detail("notPatternMatches", json!(not_pattern_matches));
    result.success = success;
    result.output = if success {
        format!("'{}' passed", invocation.command)
    } else {
        format!("'{}' failed: {}", invocation.command, problems.join("; "))
    };
    result
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::strategy::OneOrMany;

    /// Returns a canned output and remembers the invocations it saw.
    struct Canned {
        output: ProcessOutput,
        calls: AtomicUsize,
        last: Mutex<Option<ProcessInvocation>>,
    }

    impl Canned {
        fn new(exit_code: i32, stdout: &str, stderr: &str) -> Self {
            Self {
                output: ProcessOutput {
                    exit_code: Some(exit_code),
                    stdout: stdout.into(),
                    stderr: stderr.into(),
                    timed_out: false,
                },
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            }
        }
    }

    impl ProcessRunner for Canned {
        fn run(&self, invocation: &ProcessInvocation) -> Result<ProcessOutput, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(invocation.clone());
            Ok(self.output.clone())
        }
    }

    fn spec<'a>(
        command: &str,
        process: &'a ProcessOptions,
        expect: &'a OutputExpectations,
    ) -> Subprocess<'a> {
        Subprocess { command: command.into(), process, expect, default_timeout_ms: 1000 }
    }

    #[test]
    fn zero_exit_passes_and_sets_ci() {
        let runner = Canned::new(0, "ok\n", "");
        let process = ProcessOptions::default();
        let expect = OutputExpectations::default();
        let result = run(&runner, Path::new("/project"), spec("make check", &process, &expect));

        assert!(result.success, "{}", result.output);
        assert_eq!(result.detail("exitCode"), Some(&json!(0)));
        let invocation = runner.last.lock().unwrap().clone().unwrap();
        assert_eq!(invocation.env.get("CI").map(String::as_str), Some("true"));
        assert_eq!(invocation.cwd, Path::new("/project"));
        assert_eq!(invocation.timeout_ms, 1000);
    }

    #[test]
    fn exit_code_set_is_honoured() {
        let runner = Canned::new(2, "", "");
        let process = ProcessOptions::default();
        let expect = OutputExpectations {
            expected_exit_code: Some(OneOrMany::Many(vec![0, 2])),
            ..OutputExpectations::default()
        };
        assert!(run(&runner, Path::new("/p"), spec("lint", &process, &expect)).success);

        let expect = OutputExpectations::default();
        let result = run(&runner, Path::new("/p"), spec("lint", &process, &expect));
        assert!(!result.success);
        assert_eq!(result.detail("exitCodeMatched"), Some(&json!(false)));
    }

    #[test]
    fn not_patterns_fail_a_zero_exit() {
        let runner = Canned::new(0, "", "DeprecationWarning: old api");
        let process = ProcessOptions::default();
        let expect = OutputExpectations {
            stdout_pattern: Some("^$".into()),
            not_patterns: vec!["Deprecation".into(), "panic".into()],
            ..OutputExpectations::default()
        };
        let result = run(&runner, Path::new("/p"), spec("build", &process, &expect));
        assert!(!result.success);
        assert_eq!(result.detail("notPatternMatches"), Some(&json!(["Deprecation"])));
        assert_eq!(result.detail("stdoutPatternMatched"), Some(&json!(true)));
    }

    #[test]
    fn timeout_is_distinct_from_exit_failure() {
        let runner = Canned {
            output: ProcessOutput { exit_code: None, timed_out: true, ..ProcessOutput::default() },
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        };
        let process = ProcessOptions { timeout: Some(5), ..ProcessOptions::default() };
        let expect = OutputExpectations::default();
        let result = run(&runner, Path::new("/p"), spec("sleep 10", &process, &expect));
        assert_eq!(result.reason(), Some("timeout"));
        assert_eq!(runner.last.lock().unwrap().as_ref().map(|i| i.timeout_ms), Some(5));
    }

    #[test]
    fn guards_run_before_spawning() {
        let runner = Canned::new(0, "", "");
        let expect = OutputExpectations::default();

        let process = ProcessOptions::default();
        let result = run(&runner, Path::new("/p"), spec("rm -rf /tmp", &process, &expect));
        assert_eq!(result.reason(), Some("security-violation"));

        let process = ProcessOptions {
            cwd: Some("../outside".into()),
            ..ProcessOptions::default()
        };
        let result = run(&runner, Path::new("/p"), spec("ls", &process, &expect));
        assert_eq!(result.reason(), Some("security-violation"));

        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalid_pattern_is_reported_without_spawning() {
        let runner = Canned::new(0, "", "");
        let process = ProcessOptions::default();
        let expect = OutputExpectations {
            stderr_pattern: Some("(".into()),
            ..OutputExpectations::default()
        };
        let result = run(&runner, Path::new("/p"), spec("ls", &process, &expect));
        assert_eq!(result.reason(), Some("invalid-pattern"));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn spawn_error_is_reported() {
        struct Broken;
        impl ProcessRunner for Broken {
            fn run(&self, _invocation: &ProcessInvocation) -> Result<ProcessOutput, String> {
                Err("No such file or directory".into())
            }
        }
        let process = ProcessOptions::default();
        let expect = OutputExpectations::default();
        let result = run(&Broken, Path::new("/p"), spec("ls", &process, &expect));
        assert_eq!(result.reason(), Some("spawn-failed"));
    }
}
