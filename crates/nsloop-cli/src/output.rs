//! Protocol output on stdout.
//!
//! Stdout belongs to the plugin protocol: exactly one JSON object or
//! nothing. Logs go to stderr.

use std::io::Write;

use nsloop_cni::error::PluginError;
use nsloop_cni::types::{ErrorResult, Reply};

/// Writes a successful reply.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn write_reply(reply: &Reply) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    if matches!(reply, Reply::Empty) {
        return Ok(());
    }
    reply.write_to(&mut out)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Writes the error object for a failed command.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn write_error(cni_version: &str, err: &PluginError) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    ErrorResult::from_error(cni_version, err).write_to(&mut out)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
