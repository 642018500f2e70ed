//! Unified error types for the nsloop workspace.
//!
//! Errors produced by work running *inside* a namespace are not part of this
//! enum: the switcher is generic over the callback's error type and hands it
//! back untouched.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which half of a namespace switch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchStage {
    /// Attaching the thread to the target namespace.
    Enter,
    /// Reattaching the thread to the namespace it started in.
    Restore,
}

impl fmt::Display for SwitchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => write!(f, "enter"),
            Self::Restore => write!(f, "restore"),
        }
    }
}

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum NsloopError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value or plugin input is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A permission or capability error.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Description of the denied operation.
        message: String,
    },

    /// `setns(2)` failed while entering or restoring a namespace.
    #[error("failed to {stage} network namespace: {source}")]
    SwitchFailed {
        /// Which half of the switch failed.
        stage: SwitchStage,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The network device does not exist in the active namespace.
    #[error("device {device} not found in current network namespace")]
    DeviceNotFound {
        /// Name of the missing device.
        device: String,
    },

    /// A namespace handle was used after being closed.
    #[error("namespace handle for {path} is closed")]
    HandleClosed {
        /// Path the handle was opened from.
        path: PathBuf,
    },

    /// A namespace switch was attempted while another one is in flight on
    /// the same thread.
    #[error("namespace switch already in progress on this thread")]
    Reentrant,

    /// A previous switch on this thread could not restore its namespace.
    #[error("thread network namespace is in an unknown state after a failed restore")]
    ThreadTainted,

    /// The dedicated worker thread running a switch panicked.
    #[error("namespace worker thread panicked")]
    WorkerPanicked,
}

impl NsloopError {
    /// Returns `true` if this error means the thread could not get back to
    /// its original namespace.
    #[must_use]
    pub const fn is_restore_failure(&self) -> bool {
        matches!(
            self,
            Self::SwitchFailed {
                stage: SwitchStage::Restore,
                ..
            }
        )
    }

    /// Returns `true` for [`NsloopError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, NsloopError>;
