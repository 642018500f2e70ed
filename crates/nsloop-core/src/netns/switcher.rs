//! Run code inside another network namespace.
//!
//! `setns(2)` with `CLONE_NEWNET` only moves the calling OS thread. Every
//! entry point here therefore keeps the whole enter/run/restore sequence on
//! one thread:
//!
//! - [`execute`] switches the calling thread itself. The guard holding the
//!   original namespace is `!Send`, so it cannot be carried across an
//!   `.await` onto another worker thread.
//! - [`execute_on_dedicated_thread`] runs the sequence on a scoped worker
//!   thread and leaves the caller's namespace untouched.
//! - [`execute_async`] does the same for async callers and delivers the
//!   result through a oneshot channel.
//!
//! A thread may only be inside one switch at a time. If restoring the
//! original namespace fails, the thread is marked tainted and refuses all
//! further switches.

use std::cell::Cell;
use std::marker::PhantomData;
use std::path::Path;

use nix::sched::{CloneFlags, setns};
use nsloop_common::error::{NsloopError, Result, SwitchStage};

use super::handle::NamespaceHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThreadState {
    Idle,
    Switched,
    Tainted,
}

thread_local! {
    static THREAD_STATE: Cell<ThreadState> = const { Cell::new(ThreadState::Idle) };
}

/// Holds the original namespace while the thread is switched.
///
/// Restores on [`SwitchGuard::restore`], or in `Drop` when unwinding out of
/// a panicking callback.
struct SwitchGuard {
    original: Option<NamespaceHandle>,
    // Raw pointer marker: the guard must be dropped on the thread that
    // created it.
    _pinned: PhantomData<*const ()>,
}

impl SwitchGuard {
    fn enter(target: &NamespaceHandle) -> Result<Self> {
        match THREAD_STATE.get() {
            ThreadState::Idle => {}
            ThreadState::Switched => return Err(NsloopError::Reentrant),
            ThreadState::Tainted => return Err(NsloopError::ThreadTainted),
        }

        let target_file = target.file()?;
        let mut original = NamespaceHandle::open_current()?;

        if let Err(errno) = setns(target_file, CloneFlags::CLONE_NEWNET) {
            let err = NsloopError::SwitchFailed {
                stage: SwitchStage::Enter,
                source: errno.into(),
            };
            tracing::debug!(target = %target.identity(), error = %err, "enter failed");
            if let Err(close_err) = original.close() {
                tracing::warn!(error = %close_err, "failed to close original namespace handle");
            }
            return Err(err);
        }

        THREAD_STATE.set(ThreadState::Switched);
        tracing::debug!(
            from = %original.identity(),
            to = %target.identity(),
            path = %target.path().display(),
            "entered network namespace"
        );

        Ok(Self {
            original: Some(original),
            _pinned: PhantomData,
        })
    }

    fn original(&self) -> Result<&NamespaceHandle> {
        self.original.as_ref().ok_or(NsloopError::ThreadTainted)
    }

    fn restore(mut self) -> Result<()> {
        match self.original.take() {
            Some(original) => restore_into(original),
            None => Ok(()),
        }
    }
}

impl Drop for SwitchGuard {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            tracing::warn!("restoring network namespace while unwinding");
            // restore_into has already logged and tainted the thread on failure.
            let _ = restore_into(original);
        }
    }
}

fn restore_into(mut original: NamespaceHandle) -> Result<()> {
    let restored = original.file().and_then(|file| {
        setns(file, CloneFlags::CLONE_NEWNET).map_err(|errno| NsloopError::SwitchFailed {
            stage: SwitchStage::Restore,
            source: errno.into(),
        })
    });

    match &restored {
        Ok(()) => {
            THREAD_STATE.set(ThreadState::Idle);
            tracing::debug!(to = %original.identity(), "restored network namespace");
        }
        Err(err) => {
            THREAD_STATE.set(ThreadState::Tainted);
            tracing::error!(
                original = %original.identity(),
                error = %err,
                "failed to restore network namespace; thread is now tainted"
            );
        }
    }

    after_restore(restored, original.close())
}

/// Only `setns` decides whether the restore failed. Failing to close the
/// original handle afterwards leaves the thread where it should be.
fn after_restore(restored: Result<()>, closed: Result<()>) -> Result<()> {
    if let Err(close_err) = closed {
        tracing::warn!(error = %close_err, "failed to close original namespace handle");
    }
    restored
}

fn settle<T, E>(outcome: std::result::Result<T, E>, restored: Result<()>) -> std::result::Result<T, E>
where
    E: From<NsloopError>,
{
    match restored {
        Ok(()) => outcome,
        Err(restore_err) => {
            if outcome.is_err() {
                tracing::error!("callback error discarded in favour of restore failure");
            }
            Err(restore_err.into())
        }
    }
}

/// Runs `callback` with the calling thread attached to `target`.
///
/// The callback receives the namespace the thread was in before the switch.
/// The thread is moved back into that namespace before this function
/// returns, whether the callback succeeds, fails, or panics.
///
/// The callback's error is returned unchanged. A failure to restore is
/// returned instead of any callback error, since the thread is then in an
/// unknown namespace.
///
/// # Errors
///
/// - [`NsloopError::HandleClosed`] if `target` is closed.
/// - [`NsloopError::Reentrant`] if this thread is already inside a switch.
/// - [`NsloopError::ThreadTainted`] if an earlier restore on this thread failed.
/// - [`NsloopError::SwitchFailed`] if `setns(2)` fails entering or restoring.
/// - Whatever error `callback` returns.
pub fn execute<F, T, E>(target: &NamespaceHandle, callback: F) -> std::result::Result<T, E>
where
    F: FnOnce(&NamespaceHandle) -> std::result::Result<T, E>,
    E: From<NsloopError>,
{
    let guard = SwitchGuard::enter(target)?;
    let outcome = callback(guard.original()?);
    settle(outcome, guard.restore())
}

/// Runs [`execute`] on a freshly spawned OS thread and waits for it.
///
/// The worker inherits the caller's namespace, so `original` is the
/// caller's namespace. The caller's own thread is never switched. A panic
/// in the callback is resumed on the caller.
///
/// # Errors
///
/// Same as [`execute`], plus [`NsloopError::Io`] if the thread cannot be
/// spawned.
pub fn execute_on_dedicated_thread<F, T, E>(
    target: &NamespaceHandle,
    callback: F,
) -> std::result::Result<T, E>
where
    F: FnOnce(&NamespaceHandle) -> std::result::Result<T, E> + Send,
    T: Send,
    E: From<NsloopError> + Send,
{
    std::thread::scope(|scope| -> std::result::Result<T, E> {
        let worker = std::thread::Builder::new()
            .name("nsloop-netns".into())
            .spawn_scoped(scope, move || execute(target, callback))
            .map_err(|e| NsloopError::Io {
                path: target.path().to_path_buf(),
                source: e,
            })?;

        match worker.join() {
            Ok(outcome) => outcome,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    })
}

/// Runs [`execute`] on a dedicated OS thread without blocking the async
/// runtime.
///
/// `target` is duplicated for the worker, which closes its copy before
/// reporting back. The caller keeps ownership of `target`.
///
/// # Errors
///
/// Same as [`execute`], plus [`NsloopError::WorkerPanicked`] if the worker
/// dies before reporting a result.
pub async fn execute_async<F, T, E>(
    target: &NamespaceHandle,
    callback: F,
) -> std::result::Result<T, E>
where
    F: FnOnce(&NamespaceHandle) -> std::result::Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<NsloopError> + Send + 'static,
{
    let mut worker_target = target.try_clone()?;
    let (tx, rx) = tokio::sync::oneshot::channel();

    let _detached = std::thread::Builder::new()
        .name("nsloop-netns".into())
        .spawn(move || {
            let outcome = execute(&worker_target, callback);
            let outcome = finish(outcome, worker_target.close());
            // The receiver is gone only if the caller's future was dropped.
            let _ = tx.send(outcome);
        })
        .map_err(|e| NsloopError::Io {
            path: target.path().to_path_buf(),
            source: e,
        })?;

    match rx.await {
        Ok(outcome) => outcome,
        Err(_) => Err(NsloopError::WorkerPanicked.into()),
    }
}

/// Opens `path`, runs [`execute`] against it, and closes it.
///
/// # Errors
///
/// Same as [`NamespaceHandle::open_by_path`] and [`execute`].
pub fn with_netns_path<P, F, T, E>(path: P, callback: F) -> std::result::Result<T, E>
where
    P: AsRef<Path>,
    F: FnOnce(&NamespaceHandle) -> std::result::Result<T, E>,
    E: From<NsloopError>,
{
    let mut target = NamespaceHandle::open_by_path(path)?;
    let outcome = execute(&target, callback);
    finish(outcome, target.close())
}

fn finish<T, E>(outcome: std::result::Result<T, E>, closed: Result<()>) -> std::result::Result<T, E>
where
    E: From<NsloopError>,
{
    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err.into()),
        (Err(err), _) => Err(err),
    }
}
