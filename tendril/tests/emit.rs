use std::{
	sync::{
		atomic::{AtomicBool, Ordering},
		mpsc, Arc,
	},
	thread,
	time::Duration,
};

use parking_lot::Mutex;

use tendril::{Signal, Slot};

use _validator::Validator;

#[test]
fn emit_in_connection_order() {
	let v = Arc::new(Validator::new());
	let signal = Signal::<(i32,)>::new();

	let slots: Vec<_> = (0..4)
		.map(|i| {
			let v = Arc::clone(&v);
			Slot::new(move |x: i32| v.push(x * 10 + i))
		})
		.collect();
	for slot in &slots {
		signal.connect(slot).unwrap();
	}

	signal.emit((1,));
	v.expect([10, 11, 12, 13]);
	signal.emit((2,));
	v.expect([20, 21, 22, 23]);
}

#[test]
fn argument_loss() {
	let signal = Signal::<(f32, f64, String)>::new();
	let called = Arc::new([(); 3].map(|()| AtomicBool::new(false)));

	let none = Slot::new({
		let called = Arc::clone(&called);
		move || called[0].store(true, Ordering::SeqCst)
	});
	let one = Slot::new({
		let called = Arc::clone(&called);
		move |x: f32| {
			assert_eq!(x, 21.0);
			called[1].store(true, Ordering::SeqCst);
		}
	});
	let three = Slot::new({
		let called = Arc::clone(&called);
		move |x: f32, y: f64, text: String| {
			assert_eq!((x, y, text.as_str()), (21.0, 42.0, "emit"));
			called[2].store(true, Ordering::SeqCst);
		}
	});

	signal.connect(&none).unwrap();
	signal.connect(&one).unwrap();
	signal.connect(&three).unwrap();

	signal.emit((21.0, 42.0, "emit".to_owned()));
	assert!(called.iter().all(|called| called.load(Ordering::SeqCst)));

	signal.disconnect_all();
	assert_eq!(signal.number_of_connections(), 0);
}

#[test]
fn results_are_discarded() {
	let v = Arc::new(Validator::new());
	let signal = Signal::<(u32, u32)>::new();
	let sum = Slot::new({
		let v = Arc::clone(&v);
		move |a: u32, b: u32| {
			v.push(a + b);
			a + b
		}
	});

	signal.connect(&sum).unwrap();
	signal.emit((1, 2));
	v.expect([3]);
}

#[test]
fn block() {
	let v = Arc::new(Validator::new());
	let signal = Signal::<(&'static str,)>::new();
	let a = Slot::new({
		let v = Arc::clone(&v);
		move |x: &'static str| v.push(("a", x))
	});
	let b = Slot::new({
		let v = Arc::clone(&v);
		move |x: &'static str| v.push(("b", x))
	});

	let connection = signal.connect(&a).unwrap();
	signal.connect(&b).unwrap();

	{
		let _blocker = connection.block();
		signal.emit(("blocked",));
		v.expect([("b", "blocked")]);
	}

	signal.emit(("released",));
	v.expect([("a", "released"), ("b", "released")]);

	let mut blocker = connection.block();
	assert!(blocker.is_blocking());
	signal.emit(("blocked",));
	v.expect([("b", "blocked")]);

	blocker.reset();
	assert!(!blocker.is_blocking());
	blocker.reset();
	signal.emit(("reset",));
	v.expect([("a", "reset"), ("b", "reset")]);
}

#[test]
fn blockers_compose() {
	let v = Arc::new(Validator::new());
	let signal = Signal::<(i32,)>::new();
	let slot = Slot::new({
		let v = Arc::clone(&v);
		move |x: i32| v.push(x)
	});
	let connection = signal.connect(&slot).unwrap();

	let first = connection.block();
	let second = connection.block();
	let shared = second.clone();

	drop(first);
	signal.emit((1,));
	drop(second);
	signal.emit((2,));
	drop(shared);
	signal.emit((3,));
	v.expect([3]);
}

#[test]
fn blocker_outlives_connection() {
	let v = Arc::new(Validator::new());
	let signal = Signal::<(i32,)>::new();
	let slot = Slot::new({
		let v = Arc::clone(&v);
		move |x: i32| v.push(x)
	});

	let connection = signal.connect(&slot).unwrap();
	let blocker = connection.block();
	connection.disconnect();
	drop(blocker);

	signal.emit((1,));
	v.expect([]);

	let expired = connection.block();
	assert!(!expired.is_blocking());
}

#[test]
fn reentrant_emit() {
	let v = Arc::new(Validator::new());
	let signal = Signal::<(u8,)>::new();

	let echo = Slot::new({
		let v = Arc::clone(&v);
		let signal = Arc::downgrade(&signal);
		move |depth: u8| {
			v.push(depth);
			if depth < 3 {
				if let Some(signal) = signal.upgrade() {
					signal.emit((depth + 1,));
				}
			}
		}
	});
	signal.connect(&echo).unwrap();

	signal.emit((0,));
	v.expect([0, 1, 2, 3]);
}

#[test]
fn query_while_writer_waits() {
	let signal = Signal::<()>::new();
	let (entered, wait_entered) = mpsc::channel();
	let (counted, wait_counted) = mpsc::channel();

	let slot = Slot::new({
		let signal = Arc::downgrade(&signal);
		let entered = Mutex::new(entered);
		let counted = Mutex::new(counted);
		move || {
			entered.lock().send(()).unwrap();
			// Gives `connect` below time to queue up for the write lock.
			thread::sleep(Duration::from_millis(200));
			if let Some(signal) = signal.upgrade() {
				let count = signal.number_of_connections();
				let missing = signal.connection(&*Slot::new(|| ()));
				counted.lock().send((count, missing.expired())).unwrap();
			}
		}
	});
	signal.connect(&slot).unwrap();

	let emitter = thread::spawn({
		let signal = Arc::clone(&signal);
		move || signal.emit(())
	});
	wait_entered.recv().unwrap();
	let connector = thread::spawn({
		let signal = Arc::clone(&signal);
		move || {
			let other = Slot::new(|| ());
			signal.connect(&other).map(drop)
		}
	});

	assert_eq!(wait_counted.recv_timeout(Duration::from_secs(5)), Ok((1, true)));
	emitter.join().unwrap();
	connector.join().unwrap().unwrap();
}

#[test]
fn emit_without_connections() {
	Signal::<(String,)>::new().emit(("nobody".to_owned(),));
}

#[test]
fn emit_from_many_threads() {
	let v = Arc::new(Validator::new());
	let signal = Signal::<(usize,)>::new();
	let slot = Slot::new({
		let v = Arc::clone(&v);
		move |x: usize| v.push(x)
	});
	signal.connect(&slot).unwrap();

	thread::scope(|scope| {
		for i in 0..8 {
			let signal = &signal;
			scope.spawn(move || signal.emit((i,)));
		}
	});
	v.expect_unordered(0..8);
}

#[test]
#[should_panic = "slot panicked"]
fn panics_propagate() {
	let signal = Signal::<()>::new();
	let slot = Slot::new(|| panic!("slot panicked"));
	signal.connect(&slot).unwrap();
	signal.emit(());
}
