//! Recording adapter for the `ProcessRunner` port.

use std::sync::{Arc, Mutex};

use super::record_interaction;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{ProcessInvocation, ProcessOutput, ProcessRunner};

/// Records subprocess runs while delegating to an inner runner.
pub struct RecordingProcessRunner {
    inner: Arc<dyn ProcessRunner>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingProcessRunner {
    /// Creates a recording runner wrapping `inner`.
    pub fn new(inner: Arc<dyn ProcessRunner>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl ProcessRunner for RecordingProcessRunner {
    fn run(&self, invocation: &ProcessInvocation) -> Result<ProcessOutput, String> {
        let result = self.inner.run(invocation);
        record_interaction(&self.recorder, "process", "run", invocation, &result);
        result
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::adapters::live::LiveProcessRunner;

    #[test]
    fn records_run_interaction() {
        let dir = tempfile::tempdir().unwrap();
        let cassette_path = dir.path().join("process.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&cassette_path, "test", "abc")));

        {
            let runner =
                RecordingProcessRunner::new(Arc::new(LiveProcessRunner), Arc::clone(&recorder));
            let invocation = ProcessInvocation {
                command: "echo hello".into(),
                cwd: dir.path().to_path_buf(),
                env: BTreeMap::new(),
                timeout_ms: 10_000,
            };
            assert!(runner.run(&invocation).is_ok());
        }

        let recorder = Arc::try_unwrap(recorder).unwrap().into_inner().unwrap();
        recorder.finish().unwrap();

        let content = std::fs::read_to_string(&cassette_path).unwrap();
        assert!(content.contains("port: process"));
        assert!(content.contains("echo hello"));
        assert!(content.contains("exit_code: 0"));
    }
}
