//! Plugin invocation environment.

use std::path::{Path, PathBuf};

use crate::command::Command;
use crate::error::{PluginError, Result};

/// Values the runtime passes through `CNI_*` environment variables.
///
/// Only the command and the namespace path are interpreted. The rest are
/// carried for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEnv {
    /// `CNI_COMMAND`.
    pub command: Command,
    /// `CNI_CONTAINERID`.
    pub container_id: Option<String>,
    /// `CNI_NETNS`.
    pub netns: Option<PathBuf>,
    /// `CNI_IFNAME`; ignored by the loopback plugin.
    pub ifname: Option<String>,
    /// `CNI_ARGS`.
    pub args: Option<String>,
    /// `CNI_PATH`.
    pub path: Option<String>,
}

impl PluginEnv {
    /// An environment carrying only a command.
    #[must_use]
    pub const fn new(command: Command) -> Self {
        Self {
            command,
            container_id: None,
            netns: None,
            ifname: None,
            args: None,
            path: None,
        }
    }

    /// Sets the namespace path.
    #[must_use]
    pub fn with_netns(mut self, netns: impl Into<PathBuf>) -> Self {
        self.netns = Some(netns.into());
        self
    }

    /// Sets the container identifier.
    #[must_use]
    pub fn with_container_id(mut self, id: impl Into<String>) -> Self {
        self.container_id = Some(id.into());
        self
    }

    /// Returns the namespace path, which ADD and CHECK require.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidEnvironment`] if `CNI_NETNS` is unset
    /// or empty.
    pub fn require_netns(&self) -> Result<&Path> {
        match self.netns.as_deref() {
            Some(path) if !path.as_os_str().is_empty() => Ok(path),
            _ => Err(PluginError::InvalidEnvironment {
                message: format!("CNI_NETNS is required for {}", self.command),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_netns_rejects_missing_path() {
        let env = PluginEnv::new(Command::Add);
        assert!(matches!(
            env.require_netns(),
            Err(PluginError::InvalidEnvironment { .. })
        ));
    }

    #[test]
    fn require_netns_rejects_empty_path() {
        let env = PluginEnv::new(Command::Add).with_netns("");
        assert!(env.require_netns().is_err());
    }

    #[test]
    fn require_netns_returns_path() {
        let env = PluginEnv::new(Command::Check).with_netns("/var/run/netns/c1");
        assert_eq!(
            env.require_netns().ok(),
            Some(Path::new("/var/run/netns/c1"))
        );
    }
}
