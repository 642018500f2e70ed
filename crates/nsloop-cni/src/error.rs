//! Plugin-level errors and their protocol error codes.

use nsloop_common::error::NsloopError;
use nsloop_common::types::LinkState;
use thiserror::Error;

/// Errors surfaced to the plugin caller.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The network configuration asks for a protocol version we do not speak.
    #[error("incompatible CNI version {version}")]
    IncompatibleVersion {
        /// Version requested by the configuration.
        version: String,
    },

    /// A required environment variable is missing or malformed.
    #[error("invalid plugin environment: {message}")]
    InvalidEnvironment {
        /// Description of the problem.
        message: String,
    },

    /// CHECK found the device in the wrong state.
    #[error("device {device} is {state}, expected up")]
    CheckFailed {
        /// Device that was checked.
        device: String,
        /// State that was found.
        state: LinkState,
    },

    /// A namespace or device operation failed.
    #[error(transparent)]
    Core(#[from] NsloopError),
}

impl PluginError {
    /// Protocol error code for this failure.
    ///
    /// Codes below 100 are the well-known protocol codes; 100 is used for
    /// plugin-specific failures.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::IncompatibleVersion { .. } => 1,
            Self::InvalidEnvironment { .. } | Self::Core(NsloopError::Config { .. }) => 4,
            Self::Core(NsloopError::NotFound { .. }) => 3,
            Self::Core(NsloopError::Io { .. }) => 5,
            Self::CheckFailed { .. } | Self::Core(_) => 100,
        }
    }

    /// Returns `true` if a namespace switch could not be undone.
    #[must_use]
    pub const fn is_restore_failure(&self) -> bool {
        match self {
            Self::Core(err) => err.is_restore_failure(),
            _ => false,
        }
    }

    /// Extra detail for the error object: the source chain, if any.
    #[must_use]
    pub fn details(&self) -> Option<String> {
        let mut source = std::error::Error::source(self);
        let mut parts = Vec::new();
        while let Some(err) = source {
            parts.push(err.to_string());
            source = err.source();
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(": "))
        }
    }
}

/// Convenience alias for plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;

#[cfg(test)]
mod tests {
    use super::*;
    use nsloop_common::error::SwitchStage;

    #[test]
    fn missing_namespace_maps_to_container_unknown() {
        let err = PluginError::from(NsloopError::NotFound {
            kind: "network namespace",
            id: "/var/run/netns/x".into(),
        });
        assert_eq!(err.code(), 3);
    }

    #[test]
    fn switch_failure_is_plugin_specific() {
        let err = PluginError::from(NsloopError::SwitchFailed {
            stage: SwitchStage::Enter,
            source: std::io::Error::from_raw_os_error(1),
        });
        assert_eq!(err.code(), 100);
        assert!(err.details().is_some());
        assert!(!err.is_restore_failure());
    }

    #[test]
    fn restore_failure_is_recognised_through_core() {
        let err = PluginError::from(NsloopError::SwitchFailed {
            stage: SwitchStage::Restore,
            source: std::io::Error::from_raw_os_error(1),
        });
        assert!(err.is_restore_failure());
        assert_eq!(err.code(), 100);
    }

    #[test]
    fn environment_errors_use_code_four() {
        let err = PluginError::InvalidEnvironment {
            message: "CNI_NETNS is required".into(),
        };
        assert_eq!(err.code(), 4);
        assert_eq!(err.details(), None);
    }
}
