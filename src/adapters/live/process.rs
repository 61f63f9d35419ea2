//! Live process runner using `sh -c` with a hard timeout.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::warn;
use wait_timeout::ChildExt;

use crate::ports::{ProcessInvocation, ProcessOutput, ProcessRunner};

/// How long to wait for the reader threads once the child has exited.
const OUTPUT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-stream capture limit (10MB).
const MAX_OUTPUT_SIZE: usize = 10 * 1024 * 1024;

/// Runs commands through the system shell.
///
/// stdout and stderr are drained on background threads while waiting, so a
/// chatty child cannot block on a full pipe.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveProcessRunner;

impl ProcessRunner for LiveProcessRunner {
    fn run(&self, invocation: &ProcessInvocation) -> Result<ProcessOutput, String> {
        let mut child = spawn(invocation)?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = child
            .wait_timeout(Duration::from_millis(invocation.timeout_ms))
            .map_err(|e| format!("Failed to wait for '{}': {e}", invocation.command))?;

        let timed_out = status.is_none();
        if timed_out {
            warn!(
                command = %invocation.command,
                timeout_ms = invocation.timeout_ms,
                "killing timed out process"
            );
            kill(&mut child);
        }

        let collect = |rx: mpsc::Receiver<String>| {
            rx.recv_timeout(OUTPUT_COLLECTION_TIMEOUT)
                .unwrap_or_else(|_| "[output collection timed out]".to_string())
        };
        Ok(ProcessOutput {
            exit_code: status.and_then(|s| s.code()),
            stdout: collect(stdout),
            stderr: collect(stderr),
            timed_out,
        })
    }
}

fn spawn(invocation: &ProcessInvocation) -> Result<Child, String> {
    let mut cmd = if cfg!(target_family = "unix") {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&invocation.command);
        c
    } else {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&invocation.command);
        c
    };
    cmd.current_dir(&invocation.cwd)
        .envs(&invocation.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd.spawn().map_err(|e| format!("Failed to spawn '{}': {e}", invocation.command))
}

/// Reads a pipe to completion on a background thread.
fn drain<R: Read + Send + 'static>(stream: Option<R>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    match stream {
        Some(stream) => {
            thread::spawn(move || {
                let _ = tx.send(read_limited(stream));
            });
        }
        None => {
            let _ = tx.send(String::new());
        }
    }
    rx
}

/// Reads up to `MAX_OUTPUT_SIZE` bytes, discarding (but draining) the rest.
fn read_limited<R: Read>(mut stream: R) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut truncated = false;
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                let room = MAX_OUTPUT_SIZE.saturating_sub(buf.len());
                buf.extend_from_slice(&chunk[..n.min(room)]);
                truncated |= n > room;
            }
            Err(_) if buf.is_empty() => return "[error reading output]".to_string(),
            Err(_) => break,
        }
    }
    if truncated {
        buf.extend_from_slice(b"\n[output truncated at 10MB]");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn kill(child: &mut Child) {
    // The child may already have exited between the wait and the kill.
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Cursor;

    use super::*;

    fn invocation(command: &str, timeout_ms: u64) -> ProcessInvocation {
        ProcessInvocation {
            command: command.into(),
            cwd: std::env::temp_dir(),
            env: BTreeMap::from([("VERITY_PROBE".to_string(), "42".to_string())]),
            timeout_ms,
        }
    }

    #[test]
    fn captures_output_and_env() {
        let script = invocation("echo $VERITY_PROBE; echo oops >&2; exit 3", 10_000);
        let output = LiveProcessRunner.run(&script).unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout.trim(), "42");
        assert_eq!(output.stderr.trim(), "oops");
        assert!(!output.timed_out);
    }

    #[test]
    fn kills_on_timeout() {
        let output = LiveProcessRunner.run(&invocation("sleep 5", 100)).unwrap();
        assert!(output.timed_out);
        assert_eq!(output.exit_code, None);
    }

    #[test]
    fn missing_cwd_fails_to_spawn() {
        let mut bad = invocation("true", 1000);
        bad.cwd = "/definitely/not/here".into();
        assert!(LiveProcessRunner.run(&bad).is_err());
    }

    #[test]
    fn read_limited_handles_small_input() {
        assert_eq!(read_limited(Cursor::new(b"hello".to_vec())), "hello");
    }
}
