use std::{
	any::Any,
	collections::VecDeque,
	fmt::{self, Debug, Formatter},
	io,
	panic::{catch_unwind, AssertUnwindSafe},
	sync::Arc,
	thread::{self, JoinHandle, ThreadId},
};

use parking_lot::{Condvar, Mutex};
use scopeguard::guard;
use tracing::{debug, error, warn};

use crate::{Stopped, Task, Worker};

/// A [`Worker`] that owns a dedicated thread and runs posted tasks there, one at a time.
///
/// A panicking task is logged and doesn't take the thread down.
///
/// Dropping a [`ThreadWorker`] [stops](`ThreadWorker::stop`) it.
pub struct ThreadWorker {
	shared: Arc<Shared>,
	thread_id: ThreadId,
	handle: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
	queue: Mutex<Queue>,
	wake: Condvar,
}

struct Queue {
	tasks: VecDeque<Task>,
	stopped: bool,
}

/// Configures a [`ThreadWorker`] before its thread starts.
#[derive(Debug, Default, Clone)]
#[must_use = "The worker thread is only started by `.spawn()`."]
pub struct WorkerBuilder {
	name: Option<String>,
	stack_size: Option<usize>,
}

impl WorkerBuilder {
	/// Creates a builder with the platform's thread defaults.
	pub fn new() -> Self {
		Self::default()
	}

	/// Names the worker thread. Shows up in panic messages and log records.
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Sets the worker thread's stack size in bytes.
	pub fn stack_size(mut self, stack_size: usize) -> Self {
		self.stack_size = Some(stack_size);
		self
	}

	/// Starts the worker thread.
	///
	/// # Errors
	///
	/// Iff the operating system refuses to create the thread.
	pub fn spawn(self) -> io::Result<ThreadWorker> {
		let shared = Arc::new(Shared {
			queue: Mutex::new(Queue {
				tasks: VecDeque::new(),
				stopped: false,
			}),
			wake: Condvar::new(),
		});

		let mut builder = thread::Builder::new();
		if let Some(name) = self.name {
			builder = builder.name(name);
		}
		if let Some(stack_size) = self.stack_size {
			builder = builder.stack_size(stack_size);
		}

		let handle = builder.spawn({
			let shared = Arc::clone(&shared);
			move || serve(shared)
		})?;
		let thread_id = handle.thread().id();
		debug!(?thread_id, name = ?handle.thread().name(), "worker started");

		Ok(ThreadWorker {
			shared,
			thread_id,
			handle: Mutex::new(Some(handle)),
		})
	}
}

impl ThreadWorker {
	/// Starts a worker with default settings.
	///
	/// # Errors
	///
	/// Iff the operating system refuses to create the thread.
	pub fn spawn() -> io::Result<Self> {
		WorkerBuilder::new().spawn()
	}

	/// Creates a [`WorkerBuilder`] to configure the worker thread.
	pub fn builder() -> WorkerBuilder {
		WorkerBuilder::new()
	}

	/// The [`ThreadId`] of the worker thread.
	#[must_use]
	pub fn thread_id(&self) -> ThreadId {
		self.thread_id
	}

	/// Whether [`.stop()`](`ThreadWorker::stop`) was called or the worker thread has exited.
	#[must_use]
	pub fn is_stopped(&self) -> bool {
		self.shared.queue.lock().stopped
	}

	/// Refuses further tasks, lets the already-queued ones run and then joins the worker thread.
	///
	/// When called on the worker thread itself (from within a task), this only refuses
	/// further tasks. The thread then exits once the queue is drained.
	///
	/// **Idempotent.**
	pub fn stop(&self) {
		{
			let mut queue = self.shared.queue.lock();
			if !queue.stopped {
				queue.stopped = true;
				debug!(thread_id = ?self.thread_id, pending = queue.tasks.len(), "worker stopping");
			}
		}
		self.shared.wake.notify_all();

		if thread::current().id() == self.thread_id {
			return;
		}
		let handle = self.handle.lock().take();
		if let Some(handle) = handle {
			if handle.join().is_err() {
				error!(thread_id = ?self.thread_id, "worker thread terminated abnormally");
			}
		}
	}
}

impl Worker for ThreadWorker {
	fn post(&self, task: Task) -> Result<(), Stopped> {
		let mut queue = self.shared.queue.lock();
		if queue.stopped {
			drop(queue);
			warn!(thread_id = ?self.thread_id, "task posted to a stopped worker was dropped");
			return Err(Stopped);
		}
		queue.tasks.push_back(task);
		drop(queue);
		self.shared.wake.notify_one();
		Ok(())
	}
}

impl Drop for ThreadWorker {
	fn drop(&mut self) {
		self.stop();
	}
}

impl Debug for ThreadWorker {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let queue = self.shared.queue.lock();
		f.debug_struct("ThreadWorker")
			.field("thread_id", &self.thread_id)
			.field("pending", &queue.tasks.len())
			.field("stopped", &queue.stopped)
			.finish_non_exhaustive()
	}
}

fn serve(shared: Arc<Shared>) {
	// Also refuses new tasks if this thread somehow unwinds.
	let shared = guard(shared, |shared| shared.queue.lock().stopped = true);

	loop {
		let task = {
			let mut queue = shared.queue.lock();
			loop {
				if let Some(task) = queue.tasks.pop_front() {
					break task;
				}
				if queue.stopped {
					debug!("worker drained, exiting");
					return;
				}
				shared.wake.wait(&mut queue);
			}
		};

		if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
			error!(panic = panic_message(&*payload), "task panicked on worker thread");
		}
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		message
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message
	} else {
		"<non-string panic payload>"
	}
}
