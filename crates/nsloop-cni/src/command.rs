//! Plugin commands.

use std::fmt;
use std::str::FromStr;

use crate::error::PluginError;

/// A command passed in `CNI_COMMAND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Bring the loopback device up in the container namespace.
    Add,
    /// Take the loopback device down; succeeds if the namespace is gone.
    Del,
    /// Verify the loopback device is up.
    Check,
    /// Report supported protocol versions.
    Version,
}

impl Command {
    /// Returns `true` if the command operates on a network namespace.
    #[must_use]
    pub const fn needs_netns(self) -> bool {
        !matches!(self, Self::Version)
    }
}

impl FromStr for Command {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADD" => Ok(Self::Add),
            "DEL" => Ok(Self::Del),
            "CHECK" => Ok(Self::Check),
            "VERSION" => Ok(Self::Version),
            other => Err(PluginError::InvalidEnvironment {
                message: format!("unknown CNI_COMMAND: {other:?}"),
            }),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "ADD"),
            Self::Del => write!(f, "DEL"),
            Self::Check => write!(f, "CHECK"),
            Self::Version => write!(f, "VERSION"),
        }
    }
}
