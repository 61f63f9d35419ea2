//! Cassette file format.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One call made through a port, with what went in and what came back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Position in the recording, assigned by the recorder.
    pub seq: u64,
    /// Port name (`process`, `http`, `agent`, `prompt`, `capabilities`).
    pub port: String,
    /// Method invoked on the port.
    pub method: String,
    /// Serialized call arguments. Informational only; replay ignores it.
    pub input: serde_json::Value,
    /// Serialized return value.
    pub output: serde_json::Value,
}

/// A named, ordered list of interactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable name.
    pub name: String,
    /// When the recording finished.
    pub recorded_at: DateTime<Utc>,
    /// Commit of the project under verification, or `unknown`.
    pub commit: String,
    /// Interactions in recording order.
    pub interactions: Vec<Interaction>,
}

impl Cassette {
    /// Reads a YAML cassette from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid cassette.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn load_reads_written_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("http.cassette.yaml");
        let cassette = Cassette {
            name: "smoke".into(),
            recorded_at: Utc::now(),
            commit: "abc123".into(),
            interactions: vec![Interaction {
                seq: 0,
                port: "http".into(),
                method: "send".into(),
                input: json!({"method": "GET", "url": "http://localhost/health"}),
                output: json!({"Ok": {"status": 200, "body": "ok"}}),
            }],
        };
        std::fs::write(&path, serde_yaml::to_string(&cassette).unwrap()).unwrap();
        assert_eq!(Cassette::load(&path).unwrap(), cassette);
    }

    #[test]
    fn load_reports_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Cassette::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(missing.contains("Failed to read"));

        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "interactions: 7").unwrap();
        assert!(Cassette::load(&path).unwrap_err().contains("Failed to parse"));
    }
}
