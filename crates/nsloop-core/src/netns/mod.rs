//! Network namespace handles and the thread-pinned switcher.
//!
//! A [`NamespaceHandle`] owns an open descriptor on a namespace object.
//! [`switcher::execute`] borrows one, moves the calling thread into it for
//! the duration of a closure, and always moves it back.

pub mod handle;
pub mod switcher;

pub use handle::{NamespaceHandle, current_identity};
pub use switcher::{execute, execute_async, execute_on_dedicated_thread, with_netns_path};
