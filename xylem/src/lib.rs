#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![doc = include_str!("../README.md")]
//!
//! # Threading Notes
//!
//! Tasks posted to the same [`Worker`] instance run in the order they were posted.
//! There is no ordering between different workers.

mod inline;
mod thread_worker;
mod worker;

pub use inline::Inline;
pub use thread_worker::{ThreadWorker, WorkerBuilder};
pub use worker::{Stopped, Task, Worker};

#[cfg(feature = "global_worker")]
mod global;
#[cfg(feature = "global_worker")]
pub use global::GlobalWorker;

#[doc = include_str!("../README.md")]
mod readme {}
