//! `composite` executor: ordered AND/OR evaluation with short-circuiting.

use std::time::Instant;

use serde_json::{json, Value};
use tracing::debug;

use crate::strategy::{
    CompositeOperator, CompositeStrategy, FailureReason, StrategyResult, VerificationStrategy,
};
use crate::verify::{ExecuteFuture, ExecutionContext, StrategyExecutor};

/// Evaluates nested strategies through the registry in the execution context.
///
/// Children run one at a time in declared order. `and` stops at the first
/// failure, `or` at the first success. An empty list passes under both.
#[derive(Debug, Default)]
pub struct CompositeExecutor;

async fn run_child<'a>(
    ctx: &'a ExecutionContext<'a>,
    child: &'a VerificationStrategy,
) -> StrategyResult {
    let kind = child.kind();
    let Some(executor) = ctx.registry.get(kind) else {
        return StrategyResult::failure(
            FailureReason::ExecutorNotFound,
            format!("No executor registered for strategy type '{kind}'"),
        );
    };
    let started = Instant::now();
    executor.execute(ctx, child).await.with_duration(started.elapsed())
}

fn nested_entry(index: usize, child: &VerificationStrategy, result: &StrategyResult) -> Value {
    json!({
        "type": child.kind(),
        "index": index,
        "success": result.success,
        "output": result.output,
        "reason": result.reason(),
        "details": result.details,
        "durationMs": u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
    })
}

async fn evaluate<'a>(
    ctx: &'a ExecutionContext<'a>,
    strategy: &'a CompositeStrategy,
) -> StrategyResult {
    let operator = strategy.resolved_operator();
    let total = strategy.strategies.len();
    // `and` stops on the first failure, `or` on the first success.
    let stop_on = operator == CompositeOperator::Or;

    let mut nested = Vec::with_capacity(total);
    let mut short_circuited = false;
    for (index, child) in strategy.strategies.iter().enumerate() {
        let result = run_child(ctx, child).await;
        debug!(
            operator = operator.as_str(),
            index,
            kind = %child.kind(),
            success = result.success,
            "composite child finished"
        );
        nested.push(nested_entry(index, child, &result));
        if result.success == stop_on {
            short_circuited = true;
            break;
        }
    }

    let executed = nested.len();
    let success = if total == 0 {
        true
    } else if short_circuited {
        stop_on
    } else {
        !stop_on
    };
    let passed = nested.iter().filter(|entry| entry["success"] == json!(true)).count();

    let output = match (operator, success) {
        _ if total == 0 => "No nested strategies; passing vacuously".to_string(),
        (CompositeOperator::And, true) => format!("All {total} nested strategies passed"),
        (CompositeOperator::And, false) => {
            format!("Nested strategy {executed} of {total} failed; stopped evaluation")
        }
        (CompositeOperator::Or, true) => format!("Nested strategy {executed} of {total} passed"),
        (CompositeOperator::Or, false) => format!("None of {total} nested strategies passed"),
    };

    let result = if success { StrategyResult::pass(output) } else { StrategyResult::fail(output) };
    result
        .with_detail("operator", operator.as_str())
        .with_detail("shortCircuited", short_circuited)
        .with_detail("executedCount", executed)
        .with_detail("totalCount", total)
        .with_detail("passedCount", passed)
        .with_detail("nestedResults", Value::Array(nested))
}

impl StrategyExecutor for CompositeExecutor {
    fn execute<'a>(
        &'a self,
        ctx: &'a ExecutionContext<'a>,
        strategy: &'a VerificationStrategy,
    ) -> ExecuteFuture<'a> {
        Box::pin(async move {
            match strategy {
                VerificationStrategy::Composite(composite) => evaluate(ctx, composite).await,
                other => StrategyResult::failure(
                    FailureReason::InvalidConfig,
                    format!("composite executor cannot run a '{}' strategy", other.kind()),
                ),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::strategy::{CommandStrategy, Feature, StrategyKind};
    use crate::verify::{execute_strategy, StrategyRegistry};

    /// Passes when the command text is "pass"; counts invocations.
    #[derive(Default)]
    struct ByCommand(AtomicUsize);

    impl StrategyExecutor for ByCommand {
        fn execute<'a>(
            &'a self,
            _ctx: &'a ExecutionContext<'a>,
            strategy: &'a VerificationStrategy,
        ) -> ExecuteFuture<'a> {
            self.0.fetch_add(1, Ordering::SeqCst);
            let passed =
                matches!(strategy, VerificationStrategy::Command(c) if c.command == "pass");
            Box::pin(async move {
                if passed {
                    StrategyResult::pass("ok")
                } else {
                    StrategyResult::fail("no")
                }
            })
        }
    }

    fn leaf(outcome: &str) -> VerificationStrategy {
        VerificationStrategy::Command(CommandStrategy {
            command: outcome.into(),
            ..CommandStrategy::default()
        })
    }

    fn composite(
        operator: CompositeOperator,
        children: Vec<VerificationStrategy>,
    ) -> VerificationStrategy {
        VerificationStrategy::Composite(CompositeStrategy {
            operator: Some(operator),
            strategies: children,
            ..CompositeStrategy::default()
        })
    }

    async fn evaluate_tree(tree: &VerificationStrategy) -> (StrategyResult, usize) {
        let leaves = Arc::new(ByCommand::default());
        let mut registry = StrategyRegistry::new();
        registry.register(StrategyKind::Command, leaves.clone());
        registry.register(StrategyKind::Composite, Arc::new(CompositeExecutor));
        let feature = Feature::new("f", "");
        let result = execute_strategy(&registry, Path::new("/p"), tree, &feature)
            .await
            .unwrap();
        (result, leaves.0.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn and_stops_at_first_failure() {
        let tree = composite(
            CompositeOperator::And,
            vec![leaf("pass"), leaf("fail"), leaf("pass")],
        );
        let (result, calls) = evaluate_tree(&tree).await;
        assert!(!result.success);
        assert_eq!(result.detail("shortCircuited"), Some(&json!(true)));
        assert_eq!(result.detail("executedCount"), Some(&json!(2)));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn and_runs_everything_when_all_pass() {
        let tree = composite(CompositeOperator::And, vec![leaf("pass"), leaf("pass")]);
        let (result, calls) = evaluate_tree(&tree).await;
        assert!(result.success);
        assert_eq!(result.detail("shortCircuited"), Some(&json!(false)));
        assert_eq!(result.detail("executedCount"), Some(&json!(2)));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn or_stops_at_first_success() {
        let tree = composite(CompositeOperator::Or, vec![leaf("fail"), leaf("pass"), leaf("fail")]);
        let (result, calls) = evaluate_tree(&tree).await;
        assert!(result.success);
        assert_eq!(result.detail("shortCircuited"), Some(&json!(true)));
        assert_eq!(result.detail("executedCount"), Some(&json!(2)));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn or_fails_when_nothing_passes() {
        let tree = composite(CompositeOperator::Or, vec![leaf("fail"), leaf("fail")]);
        let (result, _) = evaluate_tree(&tree).await;
        assert!(!result.success);
        assert_eq!(result.detail("executedCount"), Some(&json!(2)));
        assert_eq!(result.detail("shortCircuited"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn empty_lists_pass_for_both_operators() {
        for operator in [CompositeOperator::And, CompositeOperator::Or] {
            let (result, _) = evaluate_tree(&composite(operator, vec![])).await;
            assert!(result.success, "{operator:?}");
            assert_eq!(result.detail("executedCount"), Some(&json!(0)));
        }
    }

    #[tokio::test]
    async fn nested_composites_recurse() {
        let inner = composite(CompositeOperator::Or, vec![leaf("fail"), leaf("pass")]);
        let tree = composite(CompositeOperator::And, vec![inner, leaf("pass")]);
        let (result, calls) = evaluate_tree(&tree).await;
        assert!(result.success, "{}", result.output);
        assert_eq!(calls, 3);

        let nested = result.detail("nestedResults").unwrap();
        assert_eq!(nested[0]["type"], json!("composite"));
        assert_eq!(nested[0]["details"]["executedCount"], json!(2));
        assert_eq!(nested[1]["index"], json!(1));
    }

    #[tokio::test]
    async fn unregistered_child_is_a_failure_not_a_skip() {
        let tree = composite(
            CompositeOperator::Or,
            vec![VerificationStrategy::Manual(Default::default()), leaf("pass")],
        );
        let (result, calls) = evaluate_tree(&tree).await;
        assert!(result.success);
        assert_eq!(calls, 1);
        let nested = result.detail("nestedResults").unwrap();
        assert_eq!(nested[0]["success"], json!(false));
        assert_eq!(nested[0]["reason"], json!("executor-not-found"));

        let tree = composite(
            CompositeOperator::And,
            vec![VerificationStrategy::Manual(Default::default()), leaf("pass")],
        );
        let (result, calls) = evaluate_tree(&tree).await;
        assert!(!result.success);
        assert_eq!(calls, 0);
    }
}
