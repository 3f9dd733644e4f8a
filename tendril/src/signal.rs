use std::{
	collections::BTreeMap,
	fmt::{self, Debug, Formatter},
	sync::{Arc, Weak},
};

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tracing::{debug, trace};
use xylem::Worker;

use crate::{
	adapt::{adapt, Deferring},
	args::Args,
	slot::{SlotBase, SlotRun},
	slot_connection::{Released, SlotConnection, SlotEntry},
	Connection, Error, SignalId, SlotId,
};

pub(crate) struct Connections<A: Args> {
	pub(crate) by_slot: BTreeMap<SlotId, Weak<SlotConnection<A>>>,
	/// In connection order.
	pub(crate) slots: Vec<Arc<SlotEntry<A>>>,
}

impl<A: Args> Default for Connections<A> {
	fn default() -> Self {
		Self {
			by_slot: BTreeMap::new(),
			slots: Vec::new(),
		}
	}
}

/// A typed event source that fans its argument list out to connected slots.
///
/// Slots are run in the order they were connected.
/// A slot may take fewer arguments than the signal emits, as long as its parameter types are a prefix of the signal's.
/// Trailing arguments are then dropped for it.
///
/// Connections don't keep slots alive, and slots don't keep signals alive.
/// Dropping either side disconnects.
///
/// # Reentrancy
///
/// Slots run while the signal's connection list is read-locked.
/// A slot may emit on and query any signal, including this one, but must not connect to, disconnect from or drop this signal,
/// and must not drop the last handle of another slot connected to it.
/// Doing so deadlocks.
pub struct Signal<A: Args> {
	this: Weak<Self>,
	id: SignalId,
	pub(crate) connections: RwLock<Connections<A>>,
}

impl<A: Args> Debug for Signal<A> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Signal")
			.field("id", &self.id)
			.field("arity", &A::ARITY)
			.field("connections", &self.number_of_connections())
			.finish()
	}
}

impl<A: Args> Signal<A> {
	/// Creates a new [`Signal`] without connections.
	#[must_use]
	pub fn new() -> Arc<Self> {
		Arc::new_cyclic(|this| Self {
			this: this.clone(),
			id: SignalId::next(),
			connections: RwLock::default(),
		})
	}

	/// This signal's identity.
	#[must_use]
	pub fn id(&self) -> SignalId {
		self.id
	}

	pub(crate) fn downgrade(&self) -> Weak<Self> {
		self.this.clone()
	}

	/// Connects `slot`, which is then run on each emission until disconnected.
	///
	/// # Errors
	///
	/// - [`Error::AlreadyConnected`] iff `slot` is already connected to this signal.
	/// - [`Error::BadSlot`] iff `slot` takes more arguments than this signal emits,
	///   or its parameter types aren't a prefix of this signal's.
	pub fn connect<S: ?Sized + SlotBase>(&self, slot: &S) -> Result<Connection, Error> {
		let connections = self.connections.upgradable_read();
		let slot_id = slot.id();
		if connections.by_slot.contains_key(&slot_id) {
			return Err(Error::AlreadyConnected);
		}
		let Some(runner) = adapt::<A, S>(slot) else {
			debug!(signal = %self.id, slot = %slot_id, arity = slot.arity(), "incompatible slot");
			return Err(Error::INCOMPATIBLE_SLOT);
		};

		let mut connections = RwLockUpgradableReadGuard::upgrade(connections);
		let link = SlotConnection::new(self, slot, runner);
		SlotConnection::connect_no_lock(&link, slot, &mut connections);
		trace!(signal = %self.id, slot = %slot_id, "connected");
		let link: Weak<SlotConnection<A>> = Arc::downgrade(&link);
		Ok(Connection::new(link))
	}

	/// Disconnects `slot`.
	///
	/// # Errors
	///
	/// [`Error::BadSlot`] iff `slot` isn't connected to this signal.
	pub fn disconnect<S: ?Sized + SlotBase>(&self, slot: &S) -> Result<(), Error> {
		let connections = self.connections.upgradable_read();
		let link = connections
			.by_slot
			.get(&slot.id())
			.ok_or(Error::NO_SUCH_SLOT)?
			.upgrade();

		// A link that can't be upgraded is being dropped and removes itself.
		if let Some(link) = link {
			let released = {
				let mut connections = RwLockUpgradableReadGuard::upgrade(connections);
				link.disconnect_weak_lock(Some(&mut *connections))
			};
			drop(released);
		}
		Ok(())
	}

	/// Disconnects all slots.
	///
	/// **Idempotent.**
	pub fn disconnect_all(&self) {
		let released = Self::disconnect_all_no_lock(&mut *self.connections.write());
		drop(released);
	}

	fn disconnect_all_no_lock(connections: &mut Connections<A>) -> Vec<Released> {
		let links: Vec<_> = connections
			.by_slot
			.values()
			.filter_map(Weak::upgrade)
			.collect();
		let mut released = Vec::with_capacity(links.len());
		for link in links {
			released.push(link.disconnect_weak_lock(Some(&mut *connections)));
		}
		released
	}

	/// The connection to `slot`, or an expired [`Connection`] if there is none.
	#[must_use]
	pub fn connection<S: ?Sized + SlotBase>(&self, slot: &S) -> Connection {
		self.try_connection(slot).unwrap_or_default()
	}

	/// The connection to `slot`.
	///
	/// # Errors
	///
	/// [`Error::BadSlot`] iff `slot` isn't connected to this signal.
	pub fn try_connection<S: ?Sized + SlotBase>(&self, slot: &S) -> Result<Connection, Error> {
		self.connections
			.read_recursive()
			.by_slot
			.get(&slot.id())
			.map(|link| Connection::new(link.clone()))
			.ok_or(Error::NO_SUCH_SLOT)
	}

	/// Number of connected slots.
	#[must_use]
	pub fn number_of_connections(&self) -> usize {
		self.connections.read_recursive().slots.len()
	}

	/// Runs each unblocked slot on the current thread, in connection order.
	///
	/// Each slot receives its own clone of `args`, truncated to its arity.
	///
	/// # Panics
	///
	/// Iff a slot panics. Later slots are then skipped for this emission.
	pub fn emit(&self, args: A) {
		let _deferring = Deferring::enter();
		let connections = self.connections.read_recursive();
		for entry in connections.slots.iter().filter(|entry| entry.gate.is_open()) {
			trace!(signal = %self.id, slot = %entry.runner.id(), "emit");
			entry.runner.run(args.clone());
		}
	}

	/// Hands each unblocked slot's invocation to that slot's worker, in connection order.
	///
	/// A slot without worker is run on the global worker if the `global_worker` feature is enabled,
	/// and on the current thread otherwise.
	pub fn async_emit(&self, args: A) {
		let _deferring = Deferring::enter();
		let connections = self.connections.read_recursive();
		for entry in connections.slots.iter().filter(|entry| entry.gate.is_open()) {
			trace!(signal = %self.id, slot = %entry.runner.id(), "async emit");
			let runner = Arc::clone(&entry.runner);
			match runner.worker() {
				Some(worker) => post(&*worker, runner, args.clone()),
				None => fallback(runner, args.clone()),
			}
		}
	}
}

fn post<A: Args>(worker: &dyn Worker, runner: Arc<dyn SlotRun<A>>, args: A) {
	let slot = runner.id();
	if worker
		.post(Box::new(move || runner.run(args)))
		.is_err()
	{
		debug!(%slot, "worker refused invocation");
	}
}

#[cfg(feature = "global_worker")]
fn fallback<A: Args>(runner: Arc<dyn SlotRun<A>>, args: A) {
	post(&xylem::GlobalWorker, runner, args);
}

#[cfg(not(feature = "global_worker"))]
fn fallback<A: Args>(runner: Arc<dyn SlotRun<A>>, args: A) {
	runner.run(args);
}

impl<A: Args> Drop for Signal<A> {
	fn drop(&mut self) {
		trace!(signal = %self.id, "dropping signal");
		let released = Self::disconnect_all_no_lock(self.connections.get_mut());
		drop(released);
	}
}
