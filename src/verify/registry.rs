//! Strategy registry mapping type tags to executors.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use crate::strategy::{Feature, StrategyKind, StrategyResult, VerificationStrategy};

/// Boxed future type alias used by [`StrategyExecutor`] to keep the trait dyn-compatible.
pub type ExecuteFuture<'a> = Pin<Box<dyn Future<Output = StrategyResult> + Send + 'a>>;

/// Everything an executor needs besides the strategy itself.
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    /// Registry used to resolve nested strategies.
    pub registry: &'a StrategyRegistry,
    /// Absolute project root.
    pub project_root: &'a Path,
    /// The feature under verification.
    pub feature: &'a Feature,
}

/// Runs one strategy type and produces a result.
///
/// Executors never return errors: every local failure is reported as a
/// result with `success == false` and a `details.reason`.
pub trait StrategyExecutor: Send + Sync {
    /// Executes `strategy`, which is expected to be of this executor's type.
    fn execute<'a>(
        &'a self,
        ctx: &'a ExecutionContext<'a>,
        strategy: &'a VerificationStrategy,
    ) -> ExecuteFuture<'a>;
}

/// Lookup table from strategy type to executor.
///
/// Built once at startup (or per test) and read-only afterwards.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    executors: HashMap<StrategyKind, Arc<dyn StrategyExecutor>>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `executor` for `kind`, returning the executor it replaced.
    pub fn register(
        &mut self,
        kind: StrategyKind,
        executor: Arc<dyn StrategyExecutor>,
    ) -> Option<Arc<dyn StrategyExecutor>> {
        self.executors.insert(kind, executor)
    }

    /// Looks up the executor for `kind`.
    #[must_use]
    pub fn get(&self, kind: StrategyKind) -> Option<&Arc<dyn StrategyExecutor>> {
        self.executors.get(&kind)
    }

    /// Returns `true` if `kind` has an executor.
    #[must_use]
    pub fn has(&self, kind: StrategyKind) -> bool {
        self.executors.contains_key(&kind)
    }

    /// Registered kinds in declaration order.
    #[must_use]
    pub fn types(&self) -> Vec<StrategyKind> {
        let mut kinds: Vec<StrategyKind> = self.executors.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.executors.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry").field("types", &self.types()).finish()
    }
}
