//! `command` executor.

use std::borrow::Cow;
use std::sync::Arc;

use shell_escape::escape;

use super::subprocess::{self, Subprocess, DEFAULT_PROCESS_TIMEOUT_MS};
use crate::ports::ProcessRunner;
use crate::strategy::{FailureReason, StrategyResult, VerificationStrategy};
use crate::verify::{ExecuteFuture, ExecutionContext, StrategyExecutor};

/// Runs an arbitrary shell command.
pub struct CommandExecutor {
    process: Arc<dyn ProcessRunner>,
}

impl CommandExecutor {
    /// Creates an executor running commands through `process`.
    pub fn new(process: Arc<dyn ProcessRunner>) -> Self {
        Self { process }
    }
}

impl StrategyExecutor for CommandExecutor {
    fn execute<'a>(
        &'a self,
        ctx: &'a ExecutionContext<'a>,
        strategy: &'a VerificationStrategy,
    ) -> ExecuteFuture<'a> {
        Box::pin(async move {
            let VerificationStrategy::Command(strategy) = strategy else {
                return StrategyResult::failure(
                    FailureReason::InvalidConfig,
                    format!("command executor cannot run a '{}' strategy", strategy.kind()),
                );
            };
            if strategy.command.trim().is_empty() {
                return StrategyResult::failure(
                    FailureReason::InvalidConfig,
                    "Command strategy has no 'command'",
                );
            }

            let mut command = strategy.command.trim().to_string();
            for arg in &strategy.args {
                command.push(' ');
                command.push_str(&escape(Cow::Borrowed(arg.as_str())));
            }

            subprocess::run(
                self.process.as_ref(),
                ctx.project_root,
                Subprocess {
                    command,
                    process: &strategy.process,
                    expect: &strategy.expect,
                    default_timeout_ms: DEFAULT_PROCESS_TIMEOUT_MS,
                },
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;
    use crate::ports::{ProcessInvocation, ProcessOutput};
    use crate::strategy::{CommandStrategy, Feature};
    use crate::verify::StrategyRegistry;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ProcessRunner for Recorder {
        fn run(&self, invocation: &ProcessInvocation) -> Result<ProcessOutput, String> {
            self.0.lock().unwrap().push(invocation.command.clone());
            Ok(ProcessOutput {
                exit_code: Some(0),
                stdout: "v1.2.3\n".into(),
                ..ProcessOutput::default()
            })
        }
    }

    async fn execute(runner: Arc<Recorder>, strategy: CommandStrategy) -> StrategyResult {
        let executor = CommandExecutor::new(runner);
        let registry = StrategyRegistry::new();
        let feature = Feature::new("f", "");
        let ctx = ExecutionContext {
            registry: &registry,
            project_root: Path::new("/project"),
            feature: &feature,
        };
        executor.execute(&ctx, &VerificationStrategy::Command(strategy)).await
    }

    #[tokio::test]
    async fn appends_escaped_args() {
        let runner = Arc::new(Recorder::default());
        let strategy = CommandStrategy {
            command: "grep -c".into(),
            args: vec!["export default".into(), "src/index.ts".into()],
            ..CommandStrategy::default()
        };
        assert!(execute(runner.clone(), strategy).await.success);
        assert_eq!(runner.0.lock().unwrap().as_slice(), ["grep -c 'export default' src/index.ts"]);
    }

    #[tokio::test]
    async fn stdout_pattern_is_checked() {
        let mut strategy = CommandStrategy {
            command: "tool --version".into(),
            ..CommandStrategy::default()
        };
        strategy.expect.stdout_pattern = Some(r"^v\d+\.\d+".into());
        assert!(execute(Arc::new(Recorder::default()), strategy.clone()).await.success);

        strategy.expect.stdout_pattern = Some("^2\\.".into());
        let result = execute(Arc::new(Recorder::default()), strategy).await;
        assert!(!result.success);
        assert_eq!(result.detail("stdoutPatternMatched"), Some(&serde_json::json!(false)));
    }

    #[tokio::test]
    async fn empty_command_is_invalid() {
        let runner = Arc::new(Recorder::default());
        let blank = CommandStrategy {
            command: "  ".into(),
            ..CommandStrategy::default()
        };
        let result = execute(runner.clone(), blank).await;
        assert_eq!(result.reason(), Some("invalid-config"));
        assert!(runner.0.lock().unwrap().is_empty());
    }
}
