//! Scratch network namespaces for privileged tests.
//!
//! A namespace is created by `unshare(CLONE_NEWNET)` on a throwaway thread
//! and kept alive by bind-mounting that thread's nsfs file onto a temp file,
//! the same way `ip netns add` pins namespaces under `/var/run/netns`.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used, clippy::print_stderr)]

use std::path::{Path, PathBuf};

use nix::mount::{MntFlags, MsFlags, mount, umount2};
use nix::sched::{CloneFlags, unshare};

/// A bind-mounted network namespace, removed on drop.
pub struct TestNetns {
    path: PathBuf,
    mounted: bool,
    _dir: tempfile::TempDir,
}

impl TestNetns {
    /// Creates a namespace, or returns `None` if the process lacks the
    /// privileges to do so.
    pub fn create() -> Option<Self> {
        if !nix::unistd::geteuid().is_root() {
            eprintln!("skipping: network namespace tests require root");
            return None;
        }

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("netns");
        let _file = std::fs::File::create(&path).expect("mount point");

        let target = path.clone();
        let created = std::thread::spawn(move || -> nix::Result<()> {
            unshare(CloneFlags::CLONE_NEWNET)?;
            mount(
                Some("/proc/thread-self/ns/net"),
                &target,
                None::<&str>,
                MsFlags::MS_BIND,
                None::<&str>,
            )
        })
        .join()
        .expect("namespace creation thread");

        if let Err(e) = created {
            eprintln!("skipping: cannot create network namespace: {e}");
            return None;
        }

        Some(Self {
            path,
            mounted: true,
            _dir: dir,
        })
    }

    /// Path of the bind-mounted namespace file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unmounts and deletes the namespace file, as `ip netns del` would.
    pub fn remove(&mut self) {
        if self.mounted {
            umount2(&self.path, MntFlags::MNT_DETACH).expect("unmount netns");
            std::fs::remove_file(&self.path).expect("remove netns file");
            self.mounted = false;
        }
    }
}

impl Drop for TestNetns {
    fn drop(&mut self) {
        if self.mounted {
            let _ = umount2(&self.path, MntFlags::MNT_DETACH);
            self.mounted = false;
        }
    }
}
