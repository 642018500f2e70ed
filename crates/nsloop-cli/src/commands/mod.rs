//! Plugin invocation parsing and dispatch.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use nsloop_cni::command::Command;
use nsloop_cni::dispatch;
use nsloop_cni::env::PluginEnv;
use nsloop_cni::types::NetConf;
use nsloop_common::constants::BIN_NAME;

use crate::output;

/// Loopback container-network plugin.
///
/// Reads its invocation from `CNI_*` environment variables and the network
/// configuration from stdin. Every variable can also be given as a flag.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Plugin command: ADD, DEL, CHECK or VERSION.
    #[arg(long, env = "CNI_COMMAND")]
    pub command: Command,

    /// Container identifier.
    #[arg(long, env = "CNI_CONTAINERID")]
    pub container_id: Option<String>,

    /// Path of the container's network namespace.
    #[arg(long, env = "CNI_NETNS")]
    pub netns: Option<PathBuf>,

    /// Interface name requested by the runtime (ignored).
    #[arg(long, env = "CNI_IFNAME")]
    pub ifname: Option<String>,

    /// Extra `KEY=VALUE;...` arguments.
    #[arg(long = "cni-args", env = "CNI_ARGS")]
    pub args: Option<String>,

    /// Plugin search path.
    #[arg(long = "cni-path", env = "CNI_PATH")]
    pub path: Option<String>,
}

impl Cli {
    /// Converts the parsed arguments into the plugin environment.
    pub fn into_env(self) -> PluginEnv {
        PluginEnv {
            command: self.command,
            container_id: self.container_id,
            netns: self.netns,
            ifname: self.ifname,
            args: self.args,
            path: self.path,
        }
    }
}

/// Runs the plugin command and writes its result or error to stdout.
///
/// Command failures are reported through the error object and a failing
/// exit code; only failures to talk to the caller are returned as errors.
///
/// # Errors
///
/// Returns an error if stdin cannot be read or stdout cannot be written.
pub fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let env = cli.into_env();

    let mut stdin = Vec::new();
    let _read = std::io::stdin()
        .lock()
        .read_to_end(&mut stdin)
        .context("failed to read network configuration from stdin")?;

    match dispatch::run(&env, &stdin) {
        Ok(reply) => {
            output::write_reply(&reply)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::error!(command = %env.command, code = err.code(), error = %err, "plugin command failed");
            let version = NetConf::parse_lenient(&stdin);
            output::write_error(version.version(), &err)?;
            Ok(ExitCode::FAILURE)
        }
    }
}
