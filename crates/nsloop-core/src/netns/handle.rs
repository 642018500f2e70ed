//! Owned references to network namespace objects.

use std::fs::File;
use std::io::ErrorKind;
use std::os::fd::AsRawFd;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sched::CloneFlags;
use nix::sys::statfs::{NSFS_MAGIC, fstatfs};
use nsloop_common::constants::{THREAD_SELF_NETNS, pid_netns_path};
use nsloop_common::error::{NsloopError, Result};
use nsloop_common::types::NamespaceId;

mod ioctl {
    const NSIO: u8 = 0xb7;

    nix::ioctl_none!(
        /// `NS_GET_NSTYPE`: returns the `CLONE_NEW*` type of an nsfs descriptor.
        #[allow(unsafe_code)]
        ns_get_nstype,
        NSIO,
        0x3
    );
}

/// An open network namespace.
///
/// The handle owns its descriptor until [`NamespaceHandle::close`] is called.
/// Switching operations only borrow it. Dropping an unclosed handle still
/// releases the descriptor, but callers are expected to close explicitly.
#[derive(Debug)]
pub struct NamespaceHandle {
    file: Option<File>,
    id: NamespaceId,
    path: PathBuf,
}

impl NamespaceHandle {
    /// Opens the namespace object at `path`.
    ///
    /// Accepts bind-mounted namespace files (as created by `ip netns add`)
    /// and `/proc/<pid>/ns/net` style links.
    ///
    /// # Errors
    ///
    /// Returns [`NsloopError::NotFound`] if the path does not exist or is
    /// not a namespace object, [`NsloopError::PermissionDenied`] if access
    /// is refused, and [`NsloopError::Io`] for any other failure.
    pub fn open_by_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| open_error(path, e))?;

        let is_netns = is_network_namespace(&file).map_err(|e| NsloopError::Io {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        if !is_netns {
            return Err(NsloopError::NotFound {
                kind: "network namespace",
                id: path.display().to_string(),
            });
        }

        let inode = file
            .metadata()
            .map_err(|e| NsloopError::Io {
                path: path.to_path_buf(),
                source: e,
            })?
            .ino();
        let id = NamespaceId::new(inode);
        tracing::debug!(path = %path.display(), %id, "opened network namespace");

        Ok(Self {
            file: Some(file),
            id,
            path: path.to_path_buf(),
        })
    }

    /// Opens the network namespace the calling thread is in right now.
    ///
    /// # Errors
    ///
    /// Returns an error if `/proc/thread-self/ns/net` cannot be opened.
    pub fn open_current() -> Result<Self> {
        Self::open_by_path(THREAD_SELF_NETNS)
    }

    /// Opens the network namespace of process `pid`.
    ///
    /// # Errors
    ///
    /// Returns [`NsloopError::NotFound`] if the process does not exist.
    pub fn open_for_pid(pid: u32) -> Result<Self> {
        Self::open_by_path(pid_netns_path(pid))
    }

    /// Returns a second, independently owned handle on the same namespace.
    ///
    /// # Errors
    ///
    /// Returns [`NsloopError::HandleClosed`] if this handle is closed, or
    /// [`NsloopError::Io`] if the descriptor cannot be duplicated.
    pub fn try_clone(&self) -> Result<Self> {
        let file = self.file()?.try_clone().map_err(|e| NsloopError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(Self {
            file: Some(file),
            id: self.id,
            path: self.path.clone(),
        })
    }

    /// Releases the underlying descriptor.
    ///
    /// Calling this more than once is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`NsloopError::Io`] if `close(2)` reports a failure. The
    /// descriptor is released either way.
    pub fn close(&mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        nix::unistd::close(file).map_err(|e| NsloopError::Io {
            path: self.path.clone(),
            source: e.into(),
        })?;
        tracing::debug!(path = %self.path.display(), id = %self.id, "closed network namespace");
        Ok(())
    }

    /// Returns the namespace identity (its nsfs inode).
    ///
    /// The identity is captured at open time and stays available after close.
    pub const fn identity(&self) -> NamespaceId {
        self.id
    }

    /// Returns the path this handle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` once [`NamespaceHandle::close`] has been called.
    pub const fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Returns the raw descriptor, if still open.
    pub fn as_raw_fd(&self) -> Option<i32> {
        self.file.as_ref().map(AsRawFd::as_raw_fd)
    }

    pub(crate) fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or_else(|| NsloopError::HandleClosed {
            path: self.path.clone(),
        })
    }
}

impl Drop for NamespaceHandle {
    fn drop(&mut self) {
        if self.file.is_some() {
            tracing::debug!(path = %self.path.display(), id = %self.id, "namespace handle dropped without close");
        }
    }
}

/// Returns the identity of the calling thread's current network namespace.
///
/// # Errors
///
/// Returns [`NsloopError::Io`] if `/proc/thread-self/ns/net` cannot be read.
pub fn current_identity() -> Result<NamespaceId> {
    let meta = std::fs::metadata(THREAD_SELF_NETNS).map_err(|e| NsloopError::Io {
        path: THREAD_SELF_NETNS.into(),
        source: e,
    })?;
    Ok(NamespaceId::new(meta.ino()))
}

/// Returns `true` if `file` is an nsfs object of type `CLONE_NEWNET`.
#[allow(unsafe_code)]
fn is_network_namespace(file: &File) -> nix::Result<bool> {
    if fstatfs(file)?.filesystem_type() != NSFS_MAGIC {
        return Ok(false);
    }
    // SAFETY: the descriptor is open for the lifetime of `file`, and
    // NS_GET_NSTYPE takes no argument.
    match unsafe { ioctl::ns_get_nstype(file.as_raw_fd()) } {
        Ok(nstype) => Ok(nstype == CloneFlags::CLONE_NEWNET.bits()),
        // NS_GET_NSTYPE arrived in 4.11; older kernels only get the nsfs check.
        Err(Errno::ENOTTY) => Ok(true),
        Err(e) => Err(e),
    }
}

fn open_error(path: &Path, err: std::io::Error) -> NsloopError {
    match err.kind() {
        ErrorKind::NotFound => NsloopError::NotFound {
            kind: "network namespace",
            id: path.display().to_string(),
        },
        ErrorKind::PermissionDenied => NsloopError::PermissionDenied {
            message: format!("open {}: {err}", path.display()),
        },
        _ => NsloopError::Io {
            path: path.to_path_buf(),
            source: err,
        },
    }
}
