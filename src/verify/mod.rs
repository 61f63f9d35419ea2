//! Verification engine: registry, dispatch, executors, and guards.
//!
//! A caller builds a [`StrategyRegistry`] (usually through
//! [`ServiceContext::registry`](crate::context::ServiceContext::registry)),
//! then hands a strategy tree to [`execute_strategy`]. Leaf failures come
//! back as results; only an unregistered strategy type is an error.

pub mod assertions;
mod error;
pub mod executors;
mod registry;
pub mod security;

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

pub use error::{SecurityViolation, VerifyError};
pub use registry::{ExecuteFuture, ExecutionContext, StrategyExecutor, StrategyRegistry};

use crate::strategy::{Feature, StrategyResult, VerificationStrategy};

/// Resolves the strategy's executor through `registry` and runs it.
///
/// The returned result carries the elapsed wall-clock time.
///
/// # Errors
///
/// Returns [`VerifyError::UnregisteredStrategy`] when no executor is
/// registered for the strategy's type.
pub async fn execute_strategy(
    registry: &StrategyRegistry,
    project_root: &Path,
    strategy: &VerificationStrategy,
    feature: &Feature,
) -> Result<StrategyResult, VerifyError> {
    let kind = strategy.kind();
    let executor = registry.get(kind).ok_or(VerifyError::UnregisteredStrategy { kind })?;

    debug!(
        feature = %feature.id,
        kind = %kind,
        root = %project_root.display(),
        "dispatching strategy"
    );
    let ctx = ExecutionContext { registry, project_root, feature };
    let started = Instant::now();
    let result = executor.execute(&ctx, strategy).await.with_duration(started.elapsed());

    info!(
        feature = %feature.id,
        kind = %kind,
        success = result.success,
        reason = result.reason().unwrap_or("none"),
        duration_ms = u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
        "strategy finished"
    );
    Ok(result)
}
