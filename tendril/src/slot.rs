use std::{
	any::Any,
	fmt::{self, Debug, Formatter},
	mem,
	sync::{Arc, Weak},
};

use parking_lot::{Mutex, RwLock};
use tracing::trace;
use xylem::Worker;

use crate::{
	args::{Args, SlotFn},
	future::{dispatch, SlotFuture},
	slot_connection::SlotConnectionBase,
	Error, SlotId,
};

/// The type-erased part of a slot, shared by all [`Slot`]s regardless of their signature.
///
/// [`Signal::connect`](`crate::Signal::connect`) accepts any [`SlotBase`],
/// and `dyn SlotBase` can be run and called with arguments checked at runtime.
///
/// The methods below are plumbing for signals. Implementations other than [`Slot`] and [`Arc`] of one are rarely useful.
pub trait SlotBase: Send + Sync {
	/// Number of arguments the slot accepts.
	fn arity(&self) -> usize;

	/// This slot's identity.
	fn id(&self) -> SlotId;

	/// The worker asynchronous invocations are posted to, if any.
	fn worker(&self) -> Option<Arc<dyn Worker>>;

	/// Replaces the worker used for asynchronous invocations.
	///
	/// Already queued invocations are unaffected.
	fn set_worker(&self, worker: Option<Arc<dyn Worker>>);

	/// The connections this slot participates in.
	fn connections(&self) -> &SlotConnections;

	/// A non-owning `Weak<dyn SlotRun<A>>` with `A` matching [`arity`](`SlotBase::arity`), boxed as [`Any`].
	fn erased_runner(&self) -> Box<dyn Any + Send>;

	/// The concrete slot, for downcasting.
	fn as_any(&self) -> &dyn Any;

	/// A weak reference to this slot.
	fn downgrade(&self) -> Weak<dyn SlotBase>;
}

/// A slot that can be run with exactly `A`.
///
/// Signals hold these rather than the slots themselves,
/// usually behind an adapter that doesn't keep the slot alive.
pub trait SlotRun<A: Args>: Send + Sync {
	/// Runs the slot, discarding its result.
	fn run(&self, args: A);

	/// See [`SlotBase::worker`].
	fn worker(&self) -> Option<Arc<dyn Worker>>;

	/// See [`SlotBase::id`].
	fn id(&self) -> SlotId;
}

/// A callable endpoint that can be connected to [`Signal`](`crate::Signal`)s with compatible argument lists.
///
/// Dropping the last [`Arc`] of a [`Slot`] disconnects it everywhere.
///
/// ```
/// use tendril::Slot;
///
/// let double = Slot::new(|x: f32| x * 2.0);
/// assert_eq!(double.call((2.0,)), 4.0);
/// assert_eq!(double.arity(), 1);
/// ```
pub struct Slot<A: Args, R: 'static = ()> {
	this: Weak<Self>,
	id: SlotId,
	function: Box<dyn SlotFn<A, R>>,
	worker: RwLock<Option<Arc<dyn Worker>>>,
	connections: SlotConnections,
}

impl<A: Args, R: 'static> Debug for Slot<A, R> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Slot")
			.field("id", &self.id)
			.field("arity", &A::ARITY)
			.field("has_worker", &self.worker.read().is_some())
			.field("connections", &self.connections.len())
			.finish_non_exhaustive()
	}
}

impl<A: Args, R: 'static> Slot<A, R> {
	/// Creates a new [`Slot`] without worker.
	pub fn new(function: impl SlotFn<A, R>) -> Arc<Self> {
		Self::with(function, None)
	}

	/// Creates a new [`Slot`] that runs asynchronous invocations on `worker`.
	pub fn with_worker(function: impl SlotFn<A, R>, worker: Arc<dyn Worker>) -> Arc<Self> {
		Self::with(function, Some(worker))
	}

	fn with(function: impl SlotFn<A, R>, worker: Option<Arc<dyn Worker>>) -> Arc<Self> {
		Arc::new_cyclic(|this| Self {
			this: this.clone(),
			id: SlotId::next(),
			function: Box::new(function),
			worker: RwLock::new(worker),
			connections: SlotConnections::default(),
		})
	}

	/// This slot's identity.
	#[must_use]
	pub fn id(&self) -> SlotId {
		self.id
	}

	/// Number of arguments this slot accepts.
	#[must_use]
	pub fn arity(&self) -> usize {
		A::ARITY
	}

	/// The worker asynchronous invocations are posted to, if any.
	#[must_use]
	pub fn worker(&self) -> Option<Arc<dyn Worker>> {
		self.worker.read().clone()
	}

	/// Replaces the worker. Only later asynchronous invocations are affected.
	pub fn set_worker(&self, worker: Option<Arc<dyn Worker>>) {
		*self.worker.write() = worker;
	}

	/// Number of signals this slot is currently connected to.
	#[must_use]
	pub fn number_of_connections(&self) -> usize {
		self.connections.len()
	}

	/// Calls the function on the current thread.
	///
	/// # Panics
	///
	/// Iff the function panics.
	pub fn call(&self, args: A) -> R {
		(self.function).invoke(args)
	}

	/// Calls the function on the current thread and discards its result.
	///
	/// # Panics
	///
	/// Iff the function panics.
	pub fn run(&self, args: A) {
		drop(self.call(args));
	}

	/// Posts a call to this slot's worker.
	///
	/// # Errors
	///
	/// [`Error::NoWorker`] iff this slot has no worker.
	pub fn async_call(&self, args: A) -> Result<SlotFuture<R>, Error>
	where
		R: Send,
	{
		let worker = self.worker().ok_or(Error::NoWorker)?;
		Ok(self.async_call_on(&*worker, args))
	}

	/// Posts a run to this slot's worker.
	///
	/// # Errors
	///
	/// [`Error::NoWorker`] iff this slot has no worker.
	pub fn async_run(&self, args: A) -> Result<SlotFuture<()>, Error> {
		let worker = self.worker().ok_or(Error::NoWorker)?;
		Ok(self.async_run_on(&*worker, args))
	}

	/// Posts a call to `worker`, regardless of this slot's own worker.
	///
	/// The queued invocation keeps the slot alive.
	pub fn async_call_on(&self, worker: &dyn Worker, args: A) -> SlotFuture<R>
	where
		R: Send,
	{
		match self.this.upgrade() {
			Some(this) => dispatch(worker, move || this.call(args)),
			None => SlotFuture::canceled(),
		}
	}

	/// Posts a run to `worker`, regardless of this slot's own worker.
	///
	/// The queued invocation keeps the slot alive.
	pub fn async_run_on(&self, worker: &dyn Worker, args: A) -> SlotFuture<()> {
		match self.this.upgrade() {
			Some(this) => dispatch(worker, move || this.run(args)),
			None => SlotFuture::canceled(),
		}
	}
}

impl<A: Args, R: 'static> Drop for Slot<A, R> {
	fn drop(&mut self) {
		trace!(slot = %self.id, "dropping slot");
		self.connections.disconnect_all();
	}
}

impl<A: Args, R: 'static> SlotRun<A> for Slot<A, R> {
	fn run(&self, args: A) {
		Slot::run(self, args);
	}

	fn worker(&self) -> Option<Arc<dyn Worker>> {
		Slot::worker(self)
	}

	fn id(&self) -> SlotId {
		self.id
	}
}

impl<A: Args, R: 'static> SlotBase for Slot<A, R> {
	fn arity(&self) -> usize {
		A::ARITY
	}

	fn id(&self) -> SlotId {
		self.id
	}

	fn worker(&self) -> Option<Arc<dyn Worker>> {
		Slot::worker(self)
	}

	fn set_worker(&self, worker: Option<Arc<dyn Worker>>) {
		Slot::set_worker(self, worker);
	}

	fn connections(&self) -> &SlotConnections {
		&self.connections
	}

	fn erased_runner(&self) -> Box<dyn Any + Send> {
		let runner: Weak<dyn SlotRun<A>> = self.this.clone();
		Box::new(runner)
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn downgrade(&self) -> Weak<dyn SlotBase> {
		self.this.clone()
	}
}

impl<S: ?Sized + SlotBase> SlotBase for Arc<S> {
	fn arity(&self) -> usize {
		(**self).arity()
	}

	fn id(&self) -> SlotId {
		(**self).id()
	}

	fn worker(&self) -> Option<Arc<dyn Worker>> {
		(**self).worker()
	}

	fn set_worker(&self, worker: Option<Arc<dyn Worker>>) {
		(**self).set_worker(worker);
	}

	fn connections(&self) -> &SlotConnections {
		(**self).connections()
	}

	fn erased_runner(&self) -> Box<dyn Any + Send> {
		(**self).erased_runner()
	}

	fn as_any(&self) -> &dyn Any {
		(**self).as_any()
	}

	fn downgrade(&self) -> Weak<dyn SlotBase> {
		(**self).downgrade()
	}
}

/// Invocation with argument and return types checked at runtime.
///
/// ```
/// use std::sync::Arc;
/// use tendril::{Error, Slot, SlotBase};
///
/// let sum: Arc<dyn SlotBase> = Slot::new(|a: i32, b: i32| a + b);
/// assert_eq!(sum.call::<i32, _>((3, 4)), Ok(7));
/// assert_eq!(sum.call::<(), _>((3, 4)), Err(Error::BadCall));
/// assert_eq!(sum.run((3_u8, 4_u8)), Err(Error::BadRun));
/// assert_eq!(sum.async_run((5, 6)).err(), Some(Error::NoWorker));
/// ```
impl dyn SlotBase {
	fn runner<A: Args>(&self) -> Option<Arc<dyn SlotRun<A>>> {
		self.erased_runner()
			.downcast::<Weak<dyn SlotRun<A>>>()
			.ok()?
			.upgrade()
	}

	fn exact<A: Args, R: 'static>(&self) -> Result<&Slot<A, R>, Error> {
		self.as_any()
			.downcast_ref::<Slot<A, R>>()
			.ok_or(Error::BadCall)
	}

	/// Runs the slot on the current thread.
	///
	/// # Errors
	///
	/// [`Error::BadRun`] iff `A` isn't exactly this slot's argument list.
	pub fn run<A: Args>(&self, args: A) -> Result<(), Error> {
		self.runner::<A>().ok_or(Error::BadRun)?.run(args);
		Ok(())
	}

	/// Calls the slot on the current thread.
	///
	/// # Errors
	///
	/// [`Error::BadCall`] iff `A` and `R` aren't exactly this slot's signature.
	pub fn call<R: 'static, A: Args>(&self, args: A) -> Result<R, Error> {
		Ok(self.exact::<A, R>()?.call(args))
	}

	/// Posts a run to this slot's worker.
	///
	/// # Errors
	///
	/// [`Error::BadRun`] on argument mismatch, otherwise [`Error::NoWorker`] iff the slot has no worker.
	pub fn async_run<A: Args>(&self, args: A) -> Result<SlotFuture<()>, Error> {
		let runner = self.runner::<A>().ok_or(Error::BadRun)?;
		let worker = runner.worker().ok_or(Error::NoWorker)?;
		Ok(dispatch(&*worker, move || runner.run(args)))
	}

	/// Posts a call to this slot's worker.
	///
	/// # Errors
	///
	/// [`Error::BadCall`] on signature mismatch, otherwise [`Error::NoWorker`] iff the slot has no worker.
	pub fn async_call<R: 'static + Send, A: Args>(&self, args: A) -> Result<SlotFuture<R>, Error> {
		self.exact::<A, R>()?.async_call(args)
	}
}

/// The set of connections a slot participates in.
///
/// This owns the connections: they are disconnected when the slot is dropped.
#[derive(Default)]
pub struct SlotConnections {
	links: Mutex<Vec<Arc<dyn SlotConnectionBase>>>,
}

impl Debug for SlotConnections {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("SlotConnections")
			.field("len", &self.len())
			.finish()
	}
}

impl SlotConnections {
	/// Number of live connections.
	#[must_use]
	pub fn len(&self) -> usize {
		self.links.lock().len()
	}

	/// Whether there are no live connections.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.links.lock().is_empty()
	}

	pub(crate) fn insert(&self, link: Arc<dyn SlotConnectionBase>) {
		self.links.lock().push(link);
	}

	/// Removes the connection at `address`, returning it so that it can be dropped outside the lock.
	pub(crate) fn remove(&self, address: *const ()) -> Option<Arc<dyn SlotConnectionBase>> {
		let mut links = self.links.lock();
		let index = links
			.iter()
			.position(|link| Arc::as_ptr(link).cast::<()>() == address)?;
		Some(links.swap_remove(index))
	}

	/// Disconnects every connection in this set.
	///
	/// **Idempotent.**
	pub fn disconnect_all(&self) {
		let links = mem::take(&mut *self.links.lock());
		for link in links {
			link.disconnect();
		}
	}
}
