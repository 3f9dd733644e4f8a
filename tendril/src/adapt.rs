//! Fitting slots onto longer argument lists.

use std::{
	any::Any,
	cell::RefCell,
	mem,
	sync::{Arc, Weak},
};

use xylem::Worker;

use crate::{
	args::Args,
	slot::{SlotBase, SlotRun},
	SlotId,
};

thread_local! {
	static DEFERRED: RefCell<(usize, Vec<Box<dyn Any>>)> = const { RefCell::new((0, Vec::new())) };
}

/// Marks the current thread as holding a signal lock.
///
/// Slot handles released while any such guard exists on this thread are dropped only once the outermost one goes away.
/// Dropping a slot disconnects it, which would otherwise try to write-lock the signal being read.
pub(crate) struct Deferring(());

impl Deferring {
	pub(crate) fn enter() -> Self {
		DEFERRED.with_borrow_mut(|(depth, _)| *depth += 1);
		Self(())
	}
}

impl Drop for Deferring {
	fn drop(&mut self) {
		let released = DEFERRED.with_borrow_mut(|(depth, released)| {
			*depth -= 1;
			if *depth == 0 {
				mem::take(released)
			} else {
				Vec::new()
			}
		});
		drop(released);
	}
}

fn release(slot: Box<dyn Any>) {
	// Outside a `Deferring` scope, `slot` is handed back and dropped right here.
	let slot = DEFERRED.with_borrow_mut(|(depth, released)| {
		if *depth == 0 {
			Some(slot)
		} else {
			released.push(slot);
			None
		}
	});
	drop(slot);
}

/// Runs a slot without keeping it alive.
struct Detached<A: Args> {
	slot: Weak<dyn SlotRun<A>>,
	id: SlotId,
}

impl<A: Args> SlotRun<A> for Detached<A> {
	fn run(&self, args: A) {
		if let Some(slot) = self.slot.upgrade() {
			let slot = scopeguard::guard(slot, |slot| release(Box::new(slot)));
			slot.run(args);
		}
	}

	fn worker(&self) -> Option<Arc<dyn Worker>> {
		let slot = self.slot.upgrade()?;
		let worker = slot.worker();
		release(Box::new(slot));
		worker
	}

	fn id(&self) -> SlotId {
		self.id
	}
}

/// Discards the last argument before forwarding.
struct DropLast<A: Args> {
	inner: Arc<dyn SlotRun<A::Prefix>>,
}

impl<A: Args> SlotRun<A> for DropLast<A> {
	fn run(&self, args: A) {
		self.inner.run(args.drop_last());
	}

	fn worker(&self) -> Option<Arc<dyn Worker>> {
		self.inner.worker()
	}

	fn id(&self) -> SlotId {
		self.inner.id()
	}
}

/// Wraps `slot` so that it can be run with `A`, dropping trailing arguments it doesn't accept.
///
/// The result doesn't keep `slot` alive.
/// [`None`] iff `slot` takes more arguments than `A` has, or its parameter types aren't a prefix of `A`.
pub(crate) fn adapt<A: Args, S: ?Sized + SlotBase>(slot: &S) -> Option<Arc<dyn SlotRun<A>>> {
	let arity = slot.arity();
	if arity == A::ARITY {
		let runner = *slot.erased_runner().downcast::<Weak<dyn SlotRun<A>>>().ok()?;
		Some(Arc::new(Detached {
			slot: runner,
			id: slot.id(),
		}))
	} else if arity < A::ARITY {
		let inner = adapt::<A::Prefix, S>(slot)?;
		Some(Arc::new(DropLast::<A> { inner }))
	} else {
		None
	}
}
