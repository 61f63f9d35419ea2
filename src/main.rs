//! Binary entrypoint for the `verity` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // A missing .env is the common case.
    let _ = dotenvy::dotenv();
    verity::logging::init();

    // Recording is handled in commands::dispatch via VERITY_RECORD=<dir>.
    match verity::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
