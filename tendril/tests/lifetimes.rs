use std::{sync::Arc, thread};

use tendril::{Connection, Signal, Slot, SlotBase, ThreadWorker, Worker};

use _validator::Validator;

#[test]
fn dropping_slot_disconnects() {
	let v = Arc::new(Validator::new());
	let a = Signal::<(i32,)>::new();
	let b = Signal::<(i32, i32)>::new();
	let slot = Slot::new({
		let v = Arc::clone(&v);
		move |x: i32| v.push(x)
	});

	let to_a = a.connect(&slot).unwrap();
	let to_b = b.connect(&slot).unwrap();

	drop(slot);
	assert!(to_a.expired());
	assert!(to_b.expired());
	assert_eq!(a.number_of_connections(), 0);
	assert_eq!(b.number_of_connections(), 0);

	a.emit((1,));
	b.emit((2, 3));
	v.expect([]);
}

#[test]
fn dropping_signal_disconnects() {
	let signal = Signal::<()>::new();
	let slot = Slot::new(|| ());

	let connection = signal.connect(&slot).unwrap();
	assert_eq!(slot.number_of_connections(), 1);

	drop(signal);
	assert!(connection.expired());
	assert_eq!(slot.number_of_connections(), 0);
}

#[test]
fn connections_do_not_own() {
	let signal = Signal::<(u8,)>::new();
	let slot = Slot::new(|_: u8| ());
	let connection = signal.connect(&slot).unwrap();

	assert_eq!(Arc::strong_count(&signal), 1);
	assert_eq!(Arc::strong_count(&slot), 1);
	drop(connection);
	assert_eq!(signal.number_of_connections(), 1);
}

#[test]
fn slot_dropped_by_its_own_emission() {
	let v = Arc::new(Validator::new());
	let signal = Signal::<()>::new();
	let other = Signal::<()>::new();

	let holder = Arc::new(parking_lot::Mutex::new(None));
	let slot = Slot::new({
		let v = Arc::clone(&v);
		let holder = Arc::clone(&holder);
		move || {
			v.push("ran");
			holder.lock().take();
		}
	});
	signal.connect(&slot).unwrap();
	other.connect(&slot).unwrap();
	*holder.lock() = Some(Arc::clone(&slot) as Arc<dyn SlotBase>);
	drop(slot);

	// The emission releases the last handle while the slot is running.
	signal.emit(());
	v.expect(["ran"]);
	assert_eq!(signal.number_of_connections(), 0);
	assert_eq!(other.number_of_connections(), 0);
}

#[test]
fn slot_dropped_elsewhere_while_running() {
	let v = Arc::new(Validator::new());
	let signal = Signal::<()>::new();
	let (entered, wait_entered) = std::sync::mpsc::channel();
	let (release, wait_release) = std::sync::mpsc::channel::<()>();
	let wait_release = parking_lot::Mutex::new(wait_release);

	let slot = Slot::new({
		let v = Arc::clone(&v);
		let entered = parking_lot::Mutex::new(entered);
		move || {
			entered.lock().send(()).unwrap();
			wait_release.lock().recv().unwrap();
			v.push("finished");
		}
	});
	signal.connect(&slot).unwrap();

	thread::scope(|scope| {
		let emitter = scope.spawn(|| signal.emit(()));
		wait_entered.recv().unwrap();
		drop(slot);
		release.send(()).unwrap();
		emitter.join().unwrap();
	});

	v.expect(["finished"]);
	assert_eq!(signal.number_of_connections(), 0);
}

#[test]
fn slot_downgrade_is_weak() {
	let slot: Arc<dyn SlotBase> = Slot::new(|_: u8| ());
	let weak = slot.downgrade();
	drop(slot);
	assert!(weak.upgrade().is_none());
}

#[test]
fn concurrent_teardown() {
	let worker: Arc<dyn Worker> = Arc::new(ThreadWorker::spawn().unwrap());

	for _ in 0..200 {
		let signal = Signal::<(u32,)>::new();
		let mut slots: Vec<_> = (0..8)
			.map(|i| {
				let slot = Slot::new(|_: u32| ());
				if i % 2 == 0 {
					slot.set_worker(Some(Arc::clone(&worker)));
				}
				slot
			})
			.collect();
		let connections: Vec<_> = slots
			.iter()
			.map(|slot| signal.connect(slot).unwrap())
			.collect();
		let dropped: Vec<_> = slots.drain(..4).collect();

		thread::scope(|scope| {
			scope.spawn(|| {
				for i in 0..20 {
					signal.emit((i,));
					signal.async_emit((i,));
				}
			});
			scope.spawn(move || drop(dropped));
			scope.spawn(|| {
				for connection in &connections[4..] {
					connection.disconnect();
				}
			});
			scope.spawn(|| signal.disconnect_all());
		});

		assert_eq!(signal.number_of_connections(), 0);
		assert!(connections.iter().all(Connection::expired));
		assert!(slots.iter().all(|slot| slot.connections().is_empty()));
	}
}
