//! Command dispatch and handlers.

pub mod check;
pub mod types;

use std::env;
use std::future::Future;
use std::path::PathBuf;

use tracing::info;

use crate::cassette::session::RecordingSession;
use crate::cli::Command;
use crate::context::ServiceContext;

/// Dispatch a parsed command to its handler.
///
/// When `VERITY_RECORD` is set to a directory path, all port interactions are
/// recorded to per-port cassette files in that directory.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let (ctx, session) = match env::var("VERITY_RECORD") {
        Ok(path) if !path.trim().is_empty() => {
            let (ctx, session) = ServiceContext::recording_at(PathBuf::from(path))?;
            (ctx, Some(session))
        }
        _ => (ServiceContext::live(), None),
    };

    let result = dispatch_with_context(command, &ctx);

    // Finish recording even when the command failed.
    if let Some(session) = session {
        // Release the adapters' recorder references first.
        drop(ctx);
        finish_recording(session)?;
    }

    result
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch_with_context(command: &Command, ctx: &ServiceContext) -> Result<(), String> {
    let mut stdout = std::io::stdout().lock();
    match command {
        Command::Check { feature, root, json } => {
            check::run(ctx, feature, root.as_deref(), *json, &mut stdout)
        }
        Command::Types => types::run(ctx, &mut stdout),
    }
}

/// Drives `future` to completion on a single-threaded runtime.
///
/// Executors run strategies one at a time, so nothing needs a worker pool.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;
    Ok(runtime.block_on(future))
}

/// Finish a recording session and report the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    info!(dir = %output_dir.display(), "recording saved");
    eprintln!("Recording saved to: {}", output_dir.display());
    Ok(())
}
