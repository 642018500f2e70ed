//! # nsloop-core
//!
//! Linux network namespace primitives for container-network plugins.
//!
//! This crate provides safe abstractions over:
//! - **Namespace handles**: owned references to nsfs objects, identified by inode.
//! - **Namespace switching**: run a closure inside another network namespace
//!   with the calling thread pinned and restored on every return path.
//! - **Loopback control**: raise or clear `IFF_UP` on `lo` in the active namespace.
//!
//! Network namespace membership belongs to an OS thread, not to the process.
//! Everything here operates on the calling thread only; other threads may
//! switch independently and in parallel.
//!
//! All unsafe system calls are encapsulated in safe wrappers with
//! proper error handling and `// SAFETY:` documentation.

pub mod loopback;
pub mod netns;
