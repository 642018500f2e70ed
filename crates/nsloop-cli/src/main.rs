//! # loopback: container-network plugin
//!
//! Brings the loopback device of a container's network namespace up on ADD
//! and down on DEL.

mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use nsloop_cni::error::PluginError;
use nsloop_common::constants::{DEFAULT_CNI_VERSION, LOG_ENV, LOG_FORMAT_ENV};
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let rendered = e.to_string();
            let message = rendered.lines().next().unwrap_or_default();
            let err = PluginError::InvalidEnvironment {
                message: message.trim_start_matches("error: ").to_string(),
            };
            tracing::error!(error = %e, "invalid plugin invocation");
            output::write_error(DEFAULT_CNI_VERSION, &err)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    commands::execute(cli)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env(LOG_ENV))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
}
