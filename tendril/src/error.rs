use thiserror::Error;

/// Errors raised by [`Signal`](`crate::Signal`) and [`Slot`](`crate::Slot`) operations.
///
/// These all indicate a programming error at the call site.
/// Expired connections, signals or slots are never reported as errors: operations on them are no-ops.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
	/// The slot is already connected to this signal.
	#[error("slot already connected")]
	AlreadyConnected,

	/// The slot can't be connected to this signal, or isn't connected to it.
	#[error("{0}")]
	BadSlot(&'static str),

	/// A type-erased slot was run with arguments it doesn't accept.
	#[error("slot can't be run with these arguments")]
	BadRun,

	/// A type-erased slot was called with arguments or a return type it doesn't have.
	#[error("slot can't be called with this signature")]
	BadCall,

	/// An asynchronous invocation was requested, but the slot has no worker.
	#[error("slot has no worker")]
	NoWorker,

	/// An asynchronous invocation was dropped before it completed.
	///
	/// This happens when its worker is stopped or the slot panics.
	#[error("asynchronous slot invocation was canceled")]
	Canceled,
}

impl Error {
	pub(crate) const INCOMPATIBLE_SLOT: Self = Self::BadSlot("incompatible slot");
	pub(crate) const NO_SUCH_SLOT: Self = Self::BadSlot("no such slot connected");

	/// Returns a short stable label (snake_case) for use in logs.
	#[must_use]
	pub fn as_label(&self) -> &'static str {
		match self {
			Error::AlreadyConnected => "already_connected",
			Error::BadSlot(_) => "bad_slot",
			Error::BadRun => "bad_run",
			Error::BadCall => "bad_call",
			Error::NoWorker => "no_worker",
			Error::Canceled => "canceled",
		}
	}
}
