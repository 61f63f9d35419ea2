//! `manual` executor.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::ports::InteractivePrompt;
use crate::strategy::{FailureReason, ManualStrategy, StrategyResult, VerificationStrategy};
use crate::verify::{ExecuteFuture, ExecutionContext, StrategyExecutor};

/// Environment variables whose presence marks an unattended run.
const CI_MARKERS: [&str; 6] = [
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "CIRCLECI",
    "JENKINS_URL",
    "TF_BUILD",
];

/// Returns `true` when the process appears to run under CI.
#[must_use]
pub fn is_ci_environment() -> bool {
    let ci = std::env::var("CI")
        .is_ok_and(|value| !value.is_empty() && value != "0" && value != "false");
    ci || CI_MARKERS.iter().any(|marker| std::env::var_os(marker).is_some())
}

/// Asks a human to confirm the feature.
pub struct ManualExecutor {
    prompt: Arc<dyn InteractivePrompt>,
    ci: bool,
}

impl ManualExecutor {
    /// Creates an executor asking through `prompt`; CI is detected from the environment.
    pub fn new(prompt: Arc<dyn InteractivePrompt>) -> Self {
        Self { prompt, ci: is_ci_environment() }
    }

    /// Overrides CI detection.
    #[must_use]
    pub fn with_ci(mut self, ci: bool) -> Self {
        self.ci = ci;
        self
    }

    fn run(&self, feature_id: &str, strategy: &ManualStrategy) -> StrategyResult {
        if self.ci {
            return StrategyResult::failure(
                FailureReason::CiEnvironment,
                "Manual verification cannot run in a CI environment",
            );
        }

        let people = |result: StrategyResult| {
            let result = match &strategy.assignee {
                Some(assignee) => result.with_detail("assignee", assignee.as_str()),
                None => result,
            };
            match &strategy.reviewer {
                Some(reviewer) => result.with_detail("reviewer", reviewer.as_str()),
                None => result,
            }
        };

        if strategy.checklist.is_empty() {
            let question = if strategy.instructions.trim().is_empty() {
                format!("Has feature '{feature_id}' been verified?")
            } else {
                strategy.instructions.clone()
            };
            return people(match self.prompt.ask_yes_no(&question) {
                Ok(true) => {
                    StrategyResult::pass("Manually confirmed").with_detail("confirmed", true)
                }
                Ok(false) => StrategyResult::failure(
                    FailureReason::NotConfirmed,
                    "Manual confirmation declined",
                )
                .with_detail("confirmed", false),
                Err(e) => StrategyResult::failure(
                    FailureReason::Error,
                    format!("Failed to collect confirmation: {e}"),
                ),
            });
        }

        let answers = match self.prompt.ask_checklist(&strategy.checklist) {
            Ok(answers) => answers,
            Err(e) => {
                return people(StrategyResult::failure(
                    FailureReason::Error,
                    format!("Failed to collect checklist answers: {e}"),
                ));
            }
        };
        // Missing answers count as unchecked.
        let incomplete: Vec<&str> = strategy
            .checklist
            .iter()
            .enumerate()
            .filter(|(index, _)| !answers.get(*index).copied().unwrap_or(false))
            .map(|(_, item)| item.as_str())
            .collect();
        info!(
            items = strategy.checklist.len(),
            incomplete = incomplete.len(),
            "checklist answered"
        );

        let total = strategy.checklist.len();
        let result = if incomplete.is_empty() {
            StrategyResult::pass(format!("All {total} checklist item(s) confirmed"))
        } else {
            StrategyResult::failure(
                FailureReason::ChecklistIncomplete,
                format!("{} of {total} checklist item(s) not confirmed", incomplete.len()),
            )
        };
        people(
            result
                .with_detail("incompleteItems", json!(incomplete))
                .with_detail("answers", json!(answers)),
        )
    }
}

impl StrategyExecutor for ManualExecutor {
    fn execute<'a>(
        &'a self,
        ctx: &'a ExecutionContext<'a>,
        strategy: &'a VerificationStrategy,
    ) -> ExecuteFuture<'a> {
        Box::pin(async move {
            match strategy {
                VerificationStrategy::Manual(manual) => self.run(&ctx.feature.id, manual),
                other => StrategyResult::failure(
                    FailureReason::InvalidConfig,
                    format!("manual executor cannot run a '{}' strategy", other.kind()),
                ),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Scripted {
        yes_no: Result<bool, String>,
        checklist: Result<Vec<bool>, String>,
        asked: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(yes_no: Result<bool, String>, checklist: Result<Vec<bool>, String>) -> Arc<Self> {
            Arc::new(Self { yes_no, checklist, asked: Mutex::new(Vec::new()) })
        }
    }

    impl InteractivePrompt for Scripted {
        fn ask_yes_no(&self, prompt: &str) -> Result<bool, String> {
            self.asked.lock().unwrap().push(prompt.to_string());
            self.yes_no.clone()
        }

        fn ask_checklist(&self, items: &[String]) -> Result<Vec<bool>, String> {
            self.asked.lock().unwrap().extend(items.iter().cloned());
            self.checklist.clone()
        }
    }

    fn checklist(items: &[&str]) -> ManualStrategy {
        ManualStrategy {
            checklist: items.iter().map(ToString::to_string).collect(),
            ..ManualStrategy::default()
        }
    }

    #[test]
    fn ci_refuses_without_prompting() {
        let prompt = Scripted::new(Ok(true), Ok(vec![]));
        let executor = ManualExecutor::new(prompt.clone()).with_ci(true);
        let result = executor.run("f", &ManualStrategy::default());
        assert_eq!(result.reason(), Some("ci-environment"));
        assert!(prompt.asked.lock().unwrap().is_empty());
    }

    #[test]
    fn checklist_lists_incomplete_items() {
        let prompt = Scripted::new(Ok(true), Ok(vec![true, false, true]));
        let executor = ManualExecutor::new(prompt).with_ci(false);
        let result = executor.run("f", &checklist(&["logs in", "logs out", "resets password"]));
        assert!(!result.success);
        assert_eq!(result.reason(), Some("checklist-incomplete"));
        assert_eq!(result.detail("incompleteItems"), Some(&json!(["logs out"])));
    }

    #[test]
    fn complete_checklist_passes() {
        let prompt = Scripted::new(Ok(false), Ok(vec![true, true]));
        let executor = ManualExecutor::new(prompt).with_ci(false);
        assert!(executor.run("f", &checklist(&["a", "b"])).success);
    }

    #[test]
    fn empty_checklist_falls_back_to_confirmation() {
        let prompt = Scripted::new(Ok(true), Err("unused".into()));
        let executor = ManualExecutor::new(prompt.clone()).with_ci(false);
        let strategy = ManualStrategy {
            instructions: "Open /login and sign in".into(),
            reviewer: Some("qa".into()),
            ..ManualStrategy::default()
        };
        let result = executor.run("f", &strategy);
        assert!(result.success);
        assert_eq!(result.detail("reviewer"), Some(&json!("qa")));
        assert_eq!(prompt.asked.lock().unwrap().as_slice(), ["Open /login and sign in"]);
    }

    #[test]
    fn declined_and_failed_prompts() {
        let local = |prompt: Arc<Scripted>| ManualExecutor::new(prompt).with_ci(false);

        let executor = local(Scripted::new(Ok(false), Ok(vec![])));
        assert_eq!(executor.run("f", &ManualStrategy::default()).reason(), Some("not-confirmed"));

        let executor = local(Scripted::new(Err("stdin closed".into()), Ok(vec![])));
        assert_eq!(executor.run("f", &ManualStrategy::default()).reason(), Some("error"));

        let executor = local(Scripted::new(Ok(true), Err("stdin closed".into())));
        assert_eq!(executor.run("f", &checklist(&["a"])).reason(), Some("error"));
    }
}
