use core::{
	future::Future,
	pin::Pin,
	task::{Context, Poll},
};

use futures_channel::oneshot;
use pin_project::pin_project;
use xylem::Worker;

use crate::Error;

/// The eventual result of an asynchronous slot invocation.
///
/// Resolves to [`Error::Canceled`] if the invocation is dropped without completing,
/// which happens when its worker refuses the task or the slot panics.
#[pin_project]
#[must_use = "Dropping a `SlotFuture` discards the result, but doesn't cancel the invocation."]
#[derive(Debug)]
pub struct SlotFuture<T> {
	#[pin]
	receiver: oneshot::Receiver<T>,
}

impl<T> SlotFuture<T> {
	pub(crate) fn canceled() -> Self {
		let (_, receiver) = oneshot::channel();
		Self { receiver }
	}

	/// Blocks the current thread until the invocation completes.
	///
	/// # Errors
	///
	/// [`Error::Canceled`] iff the invocation was dropped before completing.
	///
	/// # Threading
	///
	/// Deadlocks when called on the worker that is supposed to run the invocation.
	pub fn wait(self) -> Result<T, Error> {
		futures_lite::future::block_on(self)
	}
}

impl<T> Future for SlotFuture<T> {
	type Output = Result<T, Error>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		self.project()
			.receiver
			.poll(cx)
			.map(|result| result.map_err(|oneshot::Canceled| Error::Canceled))
	}
}

/// Posts `f` to `worker`, returning a future of its result.
pub(crate) fn dispatch<T: 'static + Send>(
	worker: &dyn Worker,
	f: impl 'static + Send + FnOnce() -> T,
) -> SlotFuture<T> {
	let (sender, receiver) = oneshot::channel();
	// A refused task is dropped along with `sender`, which cancels the future.
	worker
		.post(Box::new(move || {
			sender.send(f()).ok();
		}))
		.ok();
	SlotFuture { receiver }
}
