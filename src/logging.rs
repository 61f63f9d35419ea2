//! Diagnostic tracing for the `verity` binary.
//!
//! Filter comes from `RUST_LOG` (default `warn`); output goes to stderr so
//! stdout carries only reports and JSON results.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global tracing subscriber.
///
/// ```bash
/// RUST_LOG=verity=debug verity check features/login.md
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second call (e.g. from tests driving `main`-like code) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
