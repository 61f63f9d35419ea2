//! Service context bundling all port trait objects.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::live::{
    LiveAgentCaller, LiveCapabilityDetector, LiveHttpClient, LiveProcessRunner, TerminalPrompt,
};
use crate::adapters::recording::{
    RecordingAgentCaller, RecordingCapabilityDetector, RecordingHttpClient, RecordingProcessRunner,
    RecordingPrompt,
};
use crate::adapters::replaying::{
    ReplayingAgentCaller, ReplayingCapabilityDetector, ReplayingHttpClient, ReplayingProcessRunner,
    ReplayingPrompt,
};
use crate::cassette::config::{CassetteConfig, PortReplayers};
use crate::cassette::format::Cassette;
use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::session::RecordingSession;
use crate::ports::{AgentCaller, CapabilityDetector, HttpClient, InteractivePrompt, ProcessRunner};
use crate::strategy::StrategyKind;
use crate::verify::executors::{
    AiExecutor, CommandExecutor, CompositeExecutor, FileExecutor, HttpExecutor, ManualExecutor,
    ScriptExecutor, TestExecutor,
};
use crate::verify::{StrategyExecutor, StrategyRegistry};

/// Bundles all port trait objects into a single context.
///
/// Constructors wire up live, recording, or replaying adapters; the fields
/// are public so tests can drop in their own stubs.
#[derive(Clone)]
pub struct ServiceContext {
    /// Runs subprocesses for test, e2e, script and command strategies.
    pub process: Arc<dyn ProcessRunner>,
    /// Sends requests for http strategies.
    pub http: Arc<dyn HttpClient>,
    /// Judges ai strategies.
    pub agent: Arc<dyn AgentCaller>,
    /// Asks a human for manual strategies.
    pub prompt: Arc<dyn InteractivePrompt>,
    /// Locates test commands for test and e2e strategies.
    pub capabilities: Arc<dyn CapabilityDetector>,
}

impl ServiceContext {
    /// Creates a context talking to the real system.
    #[must_use]
    pub fn live() -> Self {
        Self {
            process: Arc::new(LiveProcessRunner),
            http: Arc::new(LiveHttpClient::new()),
            agent: Arc::new(LiveAgentCaller::new()),
            prompt: Arc::new(TerminalPrompt::stdio()),
            capabilities: Arc::new(LiveCapabilityDetector),
        }
    }

    /// Creates a live context whose every port call is recorded into `dir`.
    ///
    /// Drop the context (and any registry built from it) before calling
    /// [`RecordingSession::finish`].
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette directory cannot be created.
    pub fn recording_at(dir: impl Into<PathBuf>) -> Result<(Self, RecordingSession), String> {
        let session = RecordingSession::new_at(&dir.into())?;
        Ok((Self::recording_with(&session, Self::live()), session))
    }

    /// Like [`ServiceContext::recording_at`] with a timestamped directory under
    /// `.verity/cassettes`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette directory exists or cannot be created.
    pub fn recording() -> Result<(Self, RecordingSession), String> {
        let session = RecordingSession::new()?;
        Ok((Self::recording_with(&session, Self::live()), session))
    }

    /// Wraps every port of `inner` in a recording adapter feeding `session`.
    #[must_use]
    pub fn recording_with(session: &RecordingSession, inner: Self) -> Self {
        Self {
            process: Arc::new(RecordingProcessRunner::new(
                inner.process,
                Arc::clone(&session.process),
            )),
            http: Arc::new(RecordingHttpClient::new(inner.http, Arc::clone(&session.http))),
            agent: Arc::new(RecordingAgentCaller::new(inner.agent, Arc::clone(&session.agent))),
            prompt: Arc::new(RecordingPrompt::new(inner.prompt, Arc::clone(&session.prompt))),
            capabilities: Arc::new(RecordingCapabilityDetector::new(
                inner.capabilities,
                Arc::clone(&session.capabilities),
            )),
        }
    }

    /// Creates a replaying context from a single cassette holding every port's interactions.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        Ok(Self::replaying_cassette(&Cassette::load(path)?))
    }

    /// Creates a replaying context from an in-memory cassette.
    #[must_use]
    pub fn replaying_cassette(cassette: &Cassette) -> Self {
        Self::from_replayers(PortReplayers::shared(CassetteReplayer::new(cassette)))
    }

    /// Creates a replaying context from per-port cassette files.
    ///
    /// Ports without a cassette panic with a clear message when called.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette cannot be read or parsed.
    pub fn replaying_from(config: &CassetteConfig) -> Result<Self, String> {
        Ok(Self::from_replayers(config.load_all()?))
    }

    fn from_replayers(replayers: PortReplayers) -> Self {
        Self {
            process: Arc::new(replayers.process.map_or_else(
                ReplayingProcessRunner::unconfigured,
                ReplayingProcessRunner::new,
            )),
            http: Arc::new(
                replayers
                    .http
                    .map_or_else(ReplayingHttpClient::unconfigured, ReplayingHttpClient::new),
            ),
            agent: Arc::new(
                replayers
                    .agent
                    .map_or_else(ReplayingAgentCaller::unconfigured, ReplayingAgentCaller::new),
            ),
            prompt: Arc::new(
                replayers
                    .prompt
                    .map_or_else(ReplayingPrompt::unconfigured, ReplayingPrompt::new),
            ),
            capabilities: Arc::new(replayers.capabilities.map_or_else(
                ReplayingCapabilityDetector::unconfigured,
                ReplayingCapabilityDetector::new,
            )),
        }
    }

    /// Builds a registry with an executor for every strategy type, wired to this context's ports.
    #[must_use]
    pub fn registry(&self) -> StrategyRegistry {
        let tests: Arc<dyn StrategyExecutor> = Arc::new(TestExecutor::new(
            Arc::clone(&self.process),
            Arc::clone(&self.capabilities),
        ));

        let mut registry = StrategyRegistry::new();
        registry.register(StrategyKind::Test, Arc::clone(&tests));
        registry.register(StrategyKind::E2e, tests);
        registry.register(
            StrategyKind::Script,
            Arc::new(ScriptExecutor::new(Arc::clone(&self.process))),
        );
        registry.register(
            StrategyKind::Command,
            Arc::new(CommandExecutor::new(Arc::clone(&self.process))),
        );
        registry.register(StrategyKind::File, Arc::new(FileExecutor));
        registry.register(StrategyKind::Http, Arc::new(HttpExecutor::new(Arc::clone(&self.http))));
        registry.register(
            StrategyKind::Manual,
            Arc::new(ManualExecutor::new(Arc::clone(&self.prompt))),
        );
        registry.register(StrategyKind::Ai, Arc::new(AiExecutor::new(Arc::clone(&self.agent))));
        registry.register(StrategyKind::Composite, Arc::new(CompositeExecutor));
        registry
    }
}
