//! `verity types` command.

use std::io::Write;

use crate::context::ServiceContext;

/// Prints every registered strategy type, one per line.
///
/// # Errors
///
/// Returns an error string if the output cannot be written.
pub fn run(ctx: &ServiceContext, out: &mut impl Write) -> Result<(), String> {
    for kind in ctx.registry().types() {
        writeln!(out, "{kind}").map_err(|e| format!("write error: {e}"))?;
    }
    Ok(())
}
