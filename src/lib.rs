//! A futures/promises runtime for thread-based work.
//!
//! Work submitted to a [`Pool`] returns a [`Task`] right away. The task
//! represents the eventual outcome, which is a value, a captured fault, or a
//! cancellation. Tasks can be waited on, awaited, chained with continuations,
//! and combined. A [`CompletionSource`] completes a task by hand, which lets
//! callback-based APIs hand out tasks.
//!
//! ```
//! use pledge::task;
//!
//! let price = task::spawn(|| 3.0_f64);
//! let tax = price.continue_with(|price| price.result().unwrap() * 0.1);
//!
//! assert!((tax.result().unwrap() - 0.3).abs() < 1e-9);
//! ```
//!
//! Faults are values. A panic or an `Err` returned by work never unwinds into
//! the worker that ran it. It surfaces when the task is observed, and a fault
//! that is never observed is reported through [`diagnostics`].
//!
//! The library emits [`tracing`] events and never installs a subscriber.

mod runtime;
mod utils;

pub mod diagnostics;
pub mod error;
pub mod sync;
pub mod time;

pub use runtime::block_on;
pub use runtime::builder::PoolBuilder;
pub use runtime::core::{Handle, Pool};
pub use runtime::task;
pub use runtime::task::{
    CompletionSource, Dispatch, ExecutionMode, SpawnOptions, Status, Task, TaskId,
};
pub use sync::CancellationToken;

pub use error::{AggregateError, CompletionError, Fault, JoinError, TaskError};
