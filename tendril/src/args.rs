//! Argument lists as tuples.
//!
//! Signals and slots are parameterised over a tuple of their argument types rather than over a function signature:
//! a `Signal<(f32, f64, String)>` emits three arguments, a `Slot<(f32,), f32>` takes one and returns an [`f32`].

/// An argument list, implemented for tuples of up to eight elements.
///
/// Every element has to be `'static + Send + Clone`, since one emission is cloned for each connected slot
/// and may be moved onto a worker thread.
pub trait Args: 'static + Send + Clone {
	/// Number of arguments.
	const ARITY: usize;

	/// This list without its last element. `()` is its own prefix.
	type Prefix: Args;

	/// Drops the last argument.
	fn drop_last(self) -> Self::Prefix;
}

impl Args for () {
	const ARITY: usize = 0;
	type Prefix = ();

	fn drop_last(self) -> Self::Prefix {}
}

macro_rules! impl_args {
	($arity:literal => ($($prefix:ident),*) $last:ident) => {
		impl<$($prefix: 'static + Send + Clone,)* $last: 'static + Send + Clone> Args for ($($prefix,)* $last,) {
			const ARITY: usize = $arity;
			type Prefix = ($($prefix,)*);

			#[allow(non_snake_case)]
			fn drop_last(self) -> Self::Prefix {
				let ($($prefix,)* _,) = self;
				($($prefix,)*)
			}
		}
	};
}

impl_args!(1 => () A0);
impl_args!(2 => (A0) A1);
impl_args!(3 => (A0, A1) A2);
impl_args!(4 => (A0, A1, A2) A3);
impl_args!(5 => (A0, A1, A2, A3) A4);
impl_args!(6 => (A0, A1, A2, A3, A4) A5);
impl_args!(7 => (A0, A1, A2, A3, A4, A5) A6);
impl_args!(8 => (A0, A1, A2, A3, A4, A5, A6) A7);

/// A function that can back a [`Slot`](`crate::Slot`) taking `A` and returning `R`.
///
/// Implemented for all `'static + Send + Sync` closures and functions of up to eight parameters,
/// so `Slot::new(|x: f32| x * 2.0)` infers `A = (f32,)` and `R = f32`.
pub trait SlotFn<A: Args, R>: 'static + Send + Sync {
	/// Calls the function with the unpacked argument list.
	fn invoke(&self, args: A) -> R;
}

macro_rules! impl_slot_fn {
	($($arg:ident),*) => {
		impl<F, R, $($arg: 'static + Send + Clone),*> SlotFn<($($arg,)*), R> for F
		where
			F: 'static + Send + Sync + Fn($($arg),*) -> R,
		{
			#[allow(non_snake_case)]
			fn invoke(&self, ($($arg,)*): ($($arg,)*)) -> R {
				self($($arg),*)
			}
		}
	};
}

impl_slot_fn!();
impl_slot_fn!(A0);
impl_slot_fn!(A0, A1);
impl_slot_fn!(A0, A1, A2);
impl_slot_fn!(A0, A1, A2, A3);
impl_slot_fn!(A0, A1, A2, A3, A4);
impl_slot_fn!(A0, A1, A2, A3, A4, A5);
impl_slot_fn!(A0, A1, A2, A3, A4, A5, A6);
impl_slot_fn!(A0, A1, A2, A3, A4, A5, A6, A7);

#[cfg(test)]
mod tests {
	use super::Args;

	#[test]
	fn arity() {
		assert_eq!(<()>::ARITY, 0);
		assert_eq!(<(u8,)>::ARITY, 1);
		assert_eq!(<(u8, u16, u32)>::ARITY, 3);
		assert_eq!(<(u8, u8, u8, u8, u8, u8, u8, u8)>::ARITY, 8);
	}

	#[test]
	fn drop_last() {
		let args = (1.5_f32, 2.5_f64, "three".to_owned());
		let (a, b) = args.drop_last();
		assert_eq!((a, b), (1.5, 2.5));

		let () = (1_u8,).drop_last();
		let () = ().drop_last();
	}
}
