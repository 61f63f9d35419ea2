//! `script` executor.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use shell_escape::escape;

use super::security_violation;
use super::subprocess::{self, Subprocess, DEFAULT_PROCESS_TIMEOUT_MS};
use crate::ports::ProcessRunner;
use crate::strategy::{FailureReason, ScriptStrategy, StrategyResult, VerificationStrategy};
use crate::verify::security::resolve_within;
use crate::verify::{ExecuteFuture, ExecutionContext, StrategyExecutor};

/// Interpreter prefix for a script file, chosen by extension.
fn interpreter(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()? {
        "sh" => Some("sh"),
        "bash" => Some("bash"),
        "py" => Some("python3"),
        "js" | "mjs" | "cjs" => Some("node"),
        "ts" => Some("npx tsx"),
        "rb" => Some("ruby"),
        _ => None,
    }
}

/// Runs a project script, either an explicit command or a file under the root.
pub struct ScriptExecutor {
    process: Arc<dyn ProcessRunner>,
}

impl ScriptExecutor {
    /// Creates an executor running scripts through `process`.
    pub fn new(process: Arc<dyn ProcessRunner>) -> Self {
        Self { process }
    }

    fn run(&self, project_root: &Path, strategy: &ScriptStrategy) -> StrategyResult {
        let base = match (&strategy.command, &strategy.path) {
            (Some(command), _) if !command.trim().is_empty() => command.clone(),
            (_, Some(path)) => {
                let resolved = match resolve_within(project_root, path) {
                    Ok(resolved) => resolved,
                    Err(violation) => return security_violation(&violation),
                };
                if !resolved.is_file() {
                    return StrategyResult::failure(
                        FailureReason::InvalidConfig,
                        format!("Script not found: {path}"),
                    )
                    .with_detail("path", path.as_str());
                }
                let script = escape(Cow::Owned(resolved.display().to_string())).into_owned();
                match interpreter(&resolved) {
                    Some(interpreter) => format!("{interpreter} {script}"),
                    None => script,
                }
            }
            _ => {
                return StrategyResult::failure(
                    FailureReason::InvalidConfig,
                    "Script strategy needs a 'command' or a 'path'",
                );
            }
        };

        let command = std::iter::once(base)
            .chain(strategy.args.iter().map(|arg| escape(Cow::Borrowed(arg.as_str())).into_owned()))
            .collect::<Vec<_>>()
            .join(" ");

        subprocess::run(
            self.process.as_ref(),
            project_root,
            Subprocess {
                command,
                process: &strategy.process,
                expect: &strategy.expect,
                default_timeout_ms: DEFAULT_PROCESS_TIMEOUT_MS,
            },
        )
    }
}

impl StrategyExecutor for ScriptExecutor {
    fn execute<'a>(
        &'a self,
        ctx: &'a ExecutionContext<'a>,
        strategy: &'a VerificationStrategy,
    ) -> ExecuteFuture<'a> {
        Box::pin(async move {
            match strategy {
                VerificationStrategy::Script(script) => self.run(ctx.project_root, script),
                other => StrategyResult::failure(
                    FailureReason::InvalidConfig,
                    format!("script executor cannot run a '{}' strategy", other.kind()),
                ),
            }
        })
    }
}
