use std::{
	fmt::{self, Debug, Formatter},
	sync::{Arc, Weak},
};

use crate::slot_connection::{BlockToken, SlotConnectionBase};

/// A non-owning handle to one signal-slot connection.
///
/// Cheap to clone. Never keeps the connection, its signal or its slot alive.
/// A default [`Connection`] is expired from the start.
#[derive(Clone, Default)]
pub struct Connection {
	link: Option<Weak<dyn SlotConnectionBase>>,
}

impl Connection {
	pub(crate) fn new(link: Weak<dyn SlotConnectionBase>) -> Self {
		Self { link: Some(link) }
	}

	fn upgrade(&self) -> Option<Arc<dyn SlotConnectionBase>> {
		self.link.as_ref()?.upgrade()
	}

	/// Disconnects the signal from the slot.
	///
	/// **Idempotent.** A no-op on expired connections.
	pub fn disconnect(&self) {
		if let Some(link) = self.upgrade() {
			link.disconnect();
		}
	}

	/// Whether the connection is gone, through [`disconnect`](`Connection::disconnect`)
	/// or because its signal or slot was dropped.
	#[must_use]
	pub fn expired(&self) -> bool {
		self.upgrade().map_or(true, |link| !link.is_connected())
	}

	/// Suspends delivery over this connection until the returned [`Blocker`] is released.
	pub fn block(&self) -> Blocker {
		Blocker::new(self)
	}
}

impl PartialEq for Connection {
	fn eq(&self, other: &Self) -> bool {
		match (&self.link, &other.link) {
			(Some(this), Some(other)) => this.as_ptr().cast::<()>() == other.as_ptr().cast::<()>(),
			(None, None) => true,
			_ => false,
		}
	}
}

impl Eq for Connection {}

impl Debug for Connection {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Connection")
			.field("expired", &self.expired())
			.finish_non_exhaustive()
	}
}

/// Suspends delivery over one connection while it exists.
///
/// Blockers compose: delivery resumes only after every [`Blocker`] of a connection is released.
/// A [`Blocker`] created for an expired connection blocks nothing.
///
/// ```
/// use tendril::{Signal, Slot};
///
/// let signal = Signal::<(u8,)>::new();
/// let slot = Slot::new(|x: u8| assert_eq!(x, 2));
/// let connection = signal.connect(&slot).unwrap();
///
/// let mut blocker = connection.block();
/// signal.emit((1,));
/// blocker.reset();
/// signal.emit((2,));
/// ```
#[must_use = "Delivery resumes as soon as the `Blocker` is dropped."]
#[derive(Debug, Clone, Default)]
pub struct Blocker {
	token: Option<Arc<BlockToken>>,
}

impl Blocker {
	/// Blocks `connection`.
	pub fn new(connection: &Connection) -> Self {
		Self {
			token: connection.upgrade().map(|link| link.blocker()),
		}
	}

	/// Releases this blocker early.
	///
	/// **Idempotent.**
	pub fn reset(&mut self) {
		self.token = None;
	}

	/// Whether this blocker still holds its connection closed.
	#[must_use]
	pub fn is_blocking(&self) -> bool {
		self.token.is_some()
	}
}
