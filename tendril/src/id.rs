use core::{
	fmt::{self, Display, Formatter},
	num::NonZeroU64,
	sync::atomic::{AtomicU64, Ordering},
};

macro_rules! id {
	($(#[$attr:meta])* $name:ident) => {
		$(#[$attr])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
		pub struct $name(NonZeroU64);

		impl $name {
			pub(crate) fn next() -> Self {
				static COUNTER: AtomicU64 = AtomicU64::new(0);
				Self(
					(COUNTER.fetch_add(1, Ordering::Relaxed) + 1)
						.try_into()
						.expect("infallible within reasonable time"),
				)
			}

			/// The raw id value. Unique per instance within this process.
			#[must_use]
			pub fn get(self) -> NonZeroU64 {
				self.0
			}
		}

		impl Display for $name {
			fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
				Display::fmt(&self.0, f)
			}
		}
	};
}

id! {
	/// Identifies a [`Signal`](`crate::Signal`) in log records.
	SignalId
}

id! {
	/// Identifies a slot. Slots are connected by identity, so two slots wrapping the same function are still distinct.
	SlotId
}
