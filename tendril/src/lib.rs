#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![doc = include_str!("../README.md")]
//!
//! # Threading Notes
//!
//! All types here are [`Send`] and [`Sync`]. Any thread may connect, disconnect and emit concurrently.
//!
//! Asynchronous invocations run on the slot's [`Worker`].
//! Invocations posted to the same worker run in posting order, so [`Signal::async_emit`] preserves order per slot
//! as long as that slot's worker doesn't change.
//!
//! # Panics
//!
//! A panic in a slot body propagates out of [`Signal::emit`] and [`Slot::call`].
//! On a [`ThreadWorker`], it's logged instead and the invocation's [`SlotFuture`] resolves to [`Error::Canceled`].

mod adapt;
mod args;
mod connection;
mod error;
mod future;
mod id;
mod signal;
mod slot;
mod slot_connection;

pub use args::{Args, SlotFn};
pub use connection::{Blocker, Connection};
pub use error::Error;
pub use future::SlotFuture;
pub use id::{SignalId, SlotId};
pub use signal::Signal;
pub use slot::{Slot, SlotBase, SlotConnections, SlotRun};
pub use slot_connection::{BlockToken, SlotConnection, SlotConnectionBase};

pub use xylem::{Inline, Stopped, Task, ThreadWorker, Worker, WorkerBuilder};

#[cfg(feature = "global_worker")]
pub use xylem::GlobalWorker;

#[doc = include_str!("../README.md")]
mod readme {}
