//! Command dispatch for the loopback plugin.

use nsloop_common::error::NsloopError;
use nsloop_core::loopback::LoopbackConfigurer;
use nsloop_core::netns::{NamespaceHandle, execute, with_netns_path};

use crate::command::Command;
use crate::env::PluginEnv;
use crate::error::{PluginError, Result};
use crate::types::{AddResult, NetConf, Reply, VersionResult};

/// Runs one plugin invocation.
///
/// `stdin` is the raw network configuration. It is only inspected for the
/// protocol version.
///
/// # Errors
///
/// Returns a [`PluginError`] describing why the command failed. DEL never
/// fails because the namespace is already gone.
pub fn run(env: &PluginEnv, stdin: &[u8]) -> Result<Reply> {
    let conf = NetConf::parse_lenient(stdin);
    tracing::info!(
        command = %env.command,
        container_id = env.container_id.as_deref().unwrap_or(""),
        netns = ?env.netns,
        ifname = env.ifname.as_deref().unwrap_or(""),
        args = env.args.as_deref().unwrap_or(""),
        cni_version = conf.version(),
        "loopback plugin invoked"
    );

    if env.command != Command::Version && !conf.version_supported() {
        return Err(PluginError::IncompatibleVersion {
            version: conf.version().to_string(),
        });
    }

    let result = match env.command {
        Command::Add => add(env, &conf),
        Command::Del => del(env),
        Command::Check => check(env),
        Command::Version => Ok(Reply::Version(VersionResult::supported(conf.version()))),
    };
    if let Err(err) = &result
        && err.is_restore_failure()
    {
        tracing::error!(
            command = %env.command,
            error = %err,
            "plugin thread left in the container's network namespace"
        );
    }
    result
}

fn add(env: &PluginEnv, conf: &NetConf) -> Result<Reply> {
    let netns = env.require_netns()?;
    with_netns_path(netns, |_| LoopbackConfigurer::new().set_up())?;
    Ok(Reply::Add(AddResult::loopback(conf.version(), netns)))
}

fn del(env: &PluginEnv) -> Result<Reply> {
    let Some(netns) = env.netns.as_deref().filter(|p| !p.as_os_str().is_empty()) else {
        tracing::info!("no network namespace given, nothing to tear down");
        return Ok(Reply::Empty);
    };

    let mut target = match NamespaceHandle::open_by_path(netns) {
        Ok(target) => target,
        Err(NsloopError::NotFound { .. }) => {
            tracing::info!(netns = %netns.display(), "network namespace already gone");
            return Ok(Reply::Empty);
        }
        Err(e) => return Err(e.into()),
    };

    let outcome = execute(&target, |_| LoopbackConfigurer::new().set_down());
    let closed = target.close();
    outcome?;
    closed?;
    Ok(Reply::Empty)
}

fn check(env: &PluginEnv) -> Result<Reply> {
    let netns = env.require_netns()?;
    let lo = LoopbackConfigurer::new();
    let state = with_netns_path(netns, |_| lo.state())?;
    if !state.is_up() {
        return Err(PluginError::CheckFailed {
            device: lo.device().to_string(),
            state,
        });
    }
    Ok(Reply::Empty)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn version_needs_no_namespace() {
        let reply = run(&PluginEnv::new(Command::Version), b"").unwrap();
        let Reply::Version(version) = reply else {
            unreachable!("VERSION must answer with a version result");
        };
        assert!(version.supported_versions.contains(&"1.0.0".to_string()));
    }

    #[test]
    fn version_echoes_requested_version() {
        let reply = run(
            &PluginEnv::new(Command::Version),
            br#"{"cniVersion":"0.3.1"}"#,
        )
        .unwrap();
        assert!(matches!(reply, Reply::Version(v) if v.cni_version == "0.3.1"));
    }

    #[test]
    fn add_without_netns_is_invalid_environment() {
        let err = run(&PluginEnv::new(Command::Add), b"").unwrap_err();
        assert_eq!(err.code(), 4);
    }

    #[test]
    fn add_with_missing_namespace_is_container_unknown() {
        let env = PluginEnv::new(Command::Add).with_netns("/nonexistent/netns/nsloop-gone");
        let err = run(&env, b"this doesn't matter").unwrap_err();
        assert_eq!(err.code(), 3);
    }

    #[test]
    fn del_with_missing_namespace_succeeds() {
        let env = PluginEnv::new(Command::Del)
            .with_container_id("some-container-id")
            .with_netns("/nonexistent/netns/nsloop-gone");
        assert_eq!(run(&env, b"").unwrap(), Reply::Empty);
    }

    #[test]
    fn del_without_netns_succeeds() {
        assert_eq!(run(&PluginEnv::new(Command::Del), b"").unwrap(), Reply::Empty);
    }

    #[test]
    fn del_on_non_namespace_file_succeeds() {
        // An existing path that is not a namespace resolves to NotFound.
        let dir = std::env::temp_dir();
        let env = PluginEnv::new(Command::Del).with_netns(dir);
        assert_eq!(run(&env, b"").unwrap(), Reply::Empty);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let env = PluginEnv::new(Command::Add).with_netns("/var/run/netns/x");
        let err = run(&env, br#"{"cniVersion":"9.9.9"}"#).unwrap_err();
        assert_eq!(err.code(), 1);
    }
}
