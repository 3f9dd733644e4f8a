use crate::{Stopped, Task, Worker};

/// A [`Worker`] that runs each task immediately on the posting thread.
///
/// Panics in tasks propagate to the caller of [`Worker::post`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Inline;

impl Worker for Inline {
	fn post(&self, task: Task) -> Result<(), Stopped> {
		task();
		Ok(())
	}
}
