//! Recording session owning one recorder per port.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::warn;

use super::recorder::CassetteRecorder;

/// Per-port recorders writing `<port>.cassette.yaml` files into one directory.
pub struct RecordingSession {
    /// Recorder for the process runner.
    pub process: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for the HTTP client.
    pub http: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for the AI agent.
    pub agent: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for the interactive prompt.
    pub prompt: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for capability detection.
    pub capabilities: Arc<Mutex<CassetteRecorder>>,
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Creates a session under `.verity/cassettes/<timestamp>/` relative to the cwd.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory already exists or cannot be created.
    pub fn new() -> Result<Self, String> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let dir = PathBuf::from(".verity/cassettes").join(&timestamp);
        if dir.exists() {
            return Err(format!("Cassette directory already exists: {}", dir.display()));
        }
        Self::new_at(&dir)
    }

    /// Creates a session writing into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new_at(dir: &Path) -> Result<Self, String> {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create cassette directory {}: {e}", dir.display()))?;

        let commit = commit_hash();
        let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let recorder = |port: &str| {
            let path = dir.join(format!("{port}.cassette.yaml"));
            let name = format!("{stamp}-{port}");
            Arc::new(Mutex::new(CassetteRecorder::new(path, name, commit.as_str())))
        };

        Ok(Self {
            process: recorder("process"),
            http: recorder("http"),
            agent: recorder("agent"),
            prompt: recorder("prompt"),
            capabilities: recorder("capabilities"),
            output_dir: dir.to_path_buf(),
        })
    }

    /// Directory the cassettes are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every port's cassette and returns the output directory.
    ///
    /// All recording adapters must have been dropped first.
    ///
    /// # Errors
    ///
    /// Returns an error if an adapter still holds a recorder or a file cannot be written.
    pub fn finish(self) -> Result<PathBuf, String> {
        fn finish_one(recorder: Arc<Mutex<CassetteRecorder>>, port: &str) -> Result<(), String> {
            let recorder = Arc::try_unwrap(recorder)
                .map_err(|_| format!("Recording adapter for {port} still has references"))?
                .into_inner()
                .map_err(|e| format!("Recorder lock for {port} poisoned: {e}"))?;
            recorder.finish().map_err(|e| format!("Failed to write {port} cassette: {e}"))?;
            Ok(())
        }

        finish_one(self.process, "process")?;
        finish_one(self.http, "http")?;
        finish_one(self.agent, "agent")?;
        finish_one(self.prompt, "prompt")?;
        finish_one(self.capabilities, "capabilities")?;
        Ok(self.output_dir)
    }
}

/// Current git commit of the working directory, or `unknown`.
fn commit_hash() -> String {
    let hash = std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    hash.unwrap_or_else(|| {
        warn!("could not read git commit hash; cassettes will record 'unknown'");
        "unknown".to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_writes_one_cassette_per_port() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run");
        let session = RecordingSession::new_at(&out).unwrap();
        assert_eq!(session.output_dir(), out);

        assert_eq!(session.finish().unwrap(), out);
        for port in ["process", "http", "agent", "prompt", "capabilities"] {
            assert!(out.join(format!("{port}.cassette.yaml")).is_file(), "{port}");
        }
    }

    #[test]
    fn finish_fails_while_an_adapter_holds_a_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let session = RecordingSession::new_at(dir.path()).unwrap();
        let _held = Arc::clone(&session.http);
        let err = session.finish().unwrap_err();
        assert!(err.contains("http"), "{err}");
    }
}
