use std::sync::OnceLock;

use tracing::error;

use crate::{Stopped, Task, ThreadWorker, Worker};

static GLOBAL: OnceLock<Option<ThreadWorker>> = OnceLock::new();

/// A process-wide [`ThreadWorker`], started on first use.
///
/// The worker thread is named `xylem-global` and lives for the rest of the process.
/// It can't be stopped.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalWorker;

impl GlobalWorker {
	fn get() -> Option<&'static ThreadWorker> {
		GLOBAL
			.get_or_init(|| match ThreadWorker::builder().name("xylem-global").spawn() {
				Ok(worker) => Some(worker),
				Err(error) => {
					error!(%error, "failed to start the global worker");
					None
				}
			})
			.as_ref()
	}
}

impl Worker for GlobalWorker {
	/// # Errors
	///
	/// Iff the global worker thread couldn't be started.
	fn post(&self, task: Task) -> Result<(), Stopped> {
		Self::get().ok_or(Stopped)?.post(task)
	}
}
