//! Per-port cassette selection for replay.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::format::Cassette;
use super::replayer::CassetteReplayer;

/// Cassette file for each port. Ports left `None` panic if called during replay.
#[derive(Debug, Clone, Default)]
pub struct CassetteConfig {
    /// Cassette for the process runner.
    pub process: Option<PathBuf>,
    /// Cassette for the HTTP client.
    pub http: Option<PathBuf>,
    /// Cassette for the AI agent.
    pub agent: Option<PathBuf>,
    /// Cassette for the interactive prompt.
    pub prompt: Option<PathBuf>,
    /// Cassette for capability detection.
    pub capabilities: Option<PathBuf>,
}

/// Loaded replayers, one per configured port.
#[derive(Debug, Default)]
pub struct PortReplayers {
    /// Replayer for the process runner.
    pub process: Option<Arc<Mutex<CassetteReplayer>>>,
    /// Replayer for the HTTP client.
    pub http: Option<Arc<Mutex<CassetteReplayer>>>,
    /// Replayer for the AI agent.
    pub agent: Option<Arc<Mutex<CassetteReplayer>>>,
    /// Replayer for the interactive prompt.
    pub prompt: Option<Arc<Mutex<CassetteReplayer>>>,
    /// Replayer for capability detection.
    pub capabilities: Option<Arc<Mutex<CassetteReplayer>>>,
}

impl PortReplayers {
    /// Shares one replayer (typically a single combined cassette) across every port.
    #[must_use]
    pub fn shared(replayer: CassetteReplayer) -> Self {
        let shared = Arc::new(Mutex::new(replayer));
        Self {
            process: Some(Arc::clone(&shared)),
            http: Some(Arc::clone(&shared)),
            agent: Some(Arc::clone(&shared)),
            prompt: Some(Arc::clone(&shared)),
            capabilities: Some(shared),
        }
    }
}

fn load(path: Option<&Path>) -> Result<Option<Arc<Mutex<CassetteReplayer>>>, String> {
    path.map(|p| Ok(Arc::new(Mutex::new(CassetteReplayer::new(&Cassette::load(p)?))))).transpose()
}

impl CassetteConfig {
    /// Points every port at the files a recording session writes into `dir`,
    /// skipping ports whose cassette does not exist.
    #[must_use]
    pub fn from_session_dir(dir: &Path) -> Self {
        let existing =
            |port: &str| Some(dir.join(format!("{port}.cassette.yaml"))).filter(|p| p.is_file());
        Self {
            process: existing("process"),
            http: existing("http"),
            agent: existing("agent"),
            prompt: existing("prompt"),
            capabilities: existing("capabilities"),
        }
    }

    /// Loads every configured cassette.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette cannot be read or parsed.
    pub fn load_all(&self) -> Result<PortReplayers, String> {
        Ok(PortReplayers {
            process: load(self.process.as_deref())?,
            http: load(self.http.as_deref())?,
            agent: load(self.agent.as_deref())?,
            prompt: load(self.prompt.as_deref())?,
            capabilities: load(self.capabilities.as_deref())?,
        })
    }
}
