use std::sync::Arc;

use thiserror::Error;

/// A unit of deferred work.
pub type Task = Box<dyn 'static + Send + FnOnce()>;

/// Returned by [`Worker::post`] when the worker doesn't accept tasks anymore.
///
/// The rejected task is dropped without running.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("the worker has been stopped")]
pub struct Stopped;

/// An execution context that slot invocations can be dispatched to.
///
/// # Logic
///
/// Tasks posted to the same instance **must** run in the order they were posted,
/// and **must not** run concurrently with each other.
///
/// A task that can't be run **must** be dropped, so that completion channels it owns are closed.
pub trait Worker: Send + Sync {
	/// Submits `task` for deferred execution.
	///
	/// # Errors
	///
	/// Iff the worker has been stopped. `task` is dropped in that case.
	fn post(&self, task: Task) -> Result<(), Stopped>;
}

impl<W: ?Sized + Worker> Worker for Arc<W> {
	fn post(&self, task: Task) -> Result<(), Stopped> {
		(**self).post(task)
	}
}

impl<W: ?Sized + Worker> Worker for &W {
	fn post(&self, task: Task) -> Result<(), Stopped> {
		(**self).post(task)
	}
}
