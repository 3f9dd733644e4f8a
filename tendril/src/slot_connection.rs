use std::{
	fmt::{self, Debug, Formatter},
	ptr,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc, Weak,
	},
};

use parking_lot::Mutex;
use tracing::trace;

use crate::{
	args::Args,
	signal::Connections,
	slot::{SlotBase, SlotRun},
	Signal, SignalId, SlotId,
};

/// Delivery switch of one connection. Open iff nothing blocks it.
#[derive(Debug, Default)]
pub(crate) struct Gate {
	blocks: AtomicUsize,
}

impl Gate {
	pub(crate) fn is_open(&self) -> bool {
		self.blocks.load(Ordering::Acquire) == 0
	}
}

/// Holds a connection's delivery closed while it exists.
///
/// Any number of tokens may exist for one connection at a time.
/// Delivery resumes once all of them are dropped, even if the connection itself is gone by then.
#[derive(Debug)]
pub struct BlockToken {
	gate: Arc<Gate>,
}

impl BlockToken {
	fn new(gate: Arc<Gate>) -> Self {
		gate.blocks.fetch_add(1, Ordering::AcqRel);
		Self { gate }
	}
}

impl Drop for BlockToken {
	fn drop(&mut self) {
		self.gate.blocks.fetch_sub(1, Ordering::AcqRel);
	}
}

/// What a signal runs for one connection.
pub(crate) struct SlotEntry<A: Args> {
	pub(crate) gate: Arc<Gate>,
	pub(crate) runner: Arc<dyn SlotRun<A>>,
}

/// The signature-independent side of a [`SlotConnection`], as held by slots and [`Connection`](`crate::Connection`)s.
pub trait SlotConnectionBase: Send + Sync {
	/// Removes the link from both its signal and its slot.
	///
	/// **Idempotent.**
	fn disconnect(&self);

	/// Closes delivery until the returned token is dropped.
	fn blocker(&self) -> Arc<BlockToken>;

	/// Whether [`disconnect`](`SlotConnectionBase::disconnect`) hasn't happened yet.
	fn is_connected(&self) -> bool;
}

struct Link<A: Args> {
	signal: Weak<Signal<A>>,
	signal_id: SignalId,
	slot: Weak<dyn SlotBase>,
	slot_id: SlotId,
}

/// The link between one [`Signal`] and one slot.
///
/// Owned by the slot. The signal and any [`Connection`](`crate::Connection`)s only refer to it weakly.
pub struct SlotConnection<A: Args> {
	entry: Arc<SlotEntry<A>>,
	link: Mutex<Option<Link<A>>>,
}

impl<A: Args> Debug for SlotConnection<A> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let link = self.link.lock();
		f.debug_struct("SlotConnection")
			.field("signal", &link.as_ref().map(|link| link.signal_id))
			.field("slot", &link.as_ref().map(|link| link.slot_id))
			.field("open", &self.entry.gate.is_open())
			.finish()
	}
}

/// A slot whose last handle may have been released while disconnecting.
///
/// Must be dropped only once no signal lock is held, since dropping a slot disconnects it from all its other signals.
#[must_use]
pub(crate) struct Released {
	_slot: Option<Arc<dyn SlotBase>>,
}

impl<A: Args> SlotConnection<A> {
	pub(crate) fn new<S: ?Sized + SlotBase>(
		signal: &Signal<A>,
		slot: &S,
		runner: Arc<dyn SlotRun<A>>,
	) -> Arc<Self> {
		Arc::new(Self {
			entry: Arc::new(SlotEntry {
				gate: Arc::default(),
				runner,
			}),
			link: Mutex::new(Some(Link {
				signal: signal.downgrade(),
				signal_id: signal.id(),
				slot: slot.downgrade(),
				slot_id: slot.id(),
			})),
		})
	}

	/// Registers `this` with `slot` and with the signal whose `connections` are passed in.
	///
	/// # Logic
	///
	/// The caller must hold the signal's write lock and have checked that `slot` isn't connected yet.
	pub(crate) fn connect_no_lock<S: ?Sized + SlotBase>(
		this: &Arc<Self>,
		slot: &S,
		connections: &mut Connections<A>,
	) {
		slot.connections().insert(Arc::clone(this) as Arc<dyn SlotConnectionBase>);
		connections.by_slot.insert(slot.id(), Arc::downgrade(this));
		connections.slots.push(Arc::clone(&this.entry));
	}

	/// Disconnects from a signal whose write lock is held by the caller, if it's still alive.
	///
	/// **Idempotent.**
	pub(crate) fn disconnect_weak_lock(&self, connections: Option<&mut Connections<A>>) -> Released {
		let Some(link) = self.link.lock().take() else {
			return Released { _slot: None };
		};
		if let Some(connections) = connections {
			self.disconnect_signal_no_lock(connections, link.slot_id);
		}
		let slot = link.slot.upgrade();
		if let Some(slot) = &slot {
			self.disconnect_slot_no_lock(&**slot);
		}
		trace!(signal = %link.signal_id, slot = %link.slot_id, "disconnected");
		Released { _slot: slot }
	}

	fn disconnect_signal_no_lock(&self, connections: &mut Connections<A>, slot_id: SlotId) {
		if connections
			.by_slot
			.get(&slot_id)
			.is_some_and(|link| ptr::eq(link.as_ptr(), self))
		{
			connections.by_slot.remove(&slot_id);
		}
		connections
			.slots
			.retain(|entry| !Arc::ptr_eq(entry, &self.entry));
	}

	fn disconnect_slot_no_lock(&self, slot: &dyn SlotBase) {
		// The caller holds another strong reference, so this doesn't drop `self`.
		drop(
			slot.connections()
				.remove(ptr::from_ref(self).cast::<()>()),
		);
	}
}

impl<A: Args> SlotConnectionBase for SlotConnection<A> {
	fn disconnect(&self) {
		let signal = match &*self.link.lock() {
			Some(link) => link.signal.upgrade(),
			None => return,
		};
		let released = match &signal {
			Some(signal) => self.disconnect_weak_lock(Some(&mut *signal.connections.write())),
			None => self.disconnect_weak_lock(None),
		};
		drop(released);
	}

	fn blocker(&self) -> Arc<BlockToken> {
		Arc::new(BlockToken::new(Arc::clone(&self.entry.gate)))
	}

	fn is_connected(&self) -> bool {
		self.link.lock().is_some()
	}
}

impl<A: Args> Drop for SlotConnection<A> {
	fn drop(&mut self) {
		self.disconnect();
	}
}
