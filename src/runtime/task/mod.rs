//! Tasks: submission, observation and composition.
//!
//! The free functions in this module submit work to the pool of the current
//! worker thread, or to the process-wide default pool when called from any
//! other thread.

pub(crate) mod continuation;
pub(crate) mod core;
pub(crate) mod handle;
pub(crate) mod id;
pub(crate) mod options;
pub(crate) mod source;
pub(crate) mod state;
pub(crate) mod when;
pub(crate) mod work;

pub use continuation::Dispatch;
pub use handle::Task;
pub use id::TaskId;
pub use options::{ExecutionMode, SpawnOptions};
pub use source::CompletionSource;
pub use state::Status;
pub use when::{when_all, when_any};

use crate::error::Fault;
use crate::runtime::core::Handle;
use crate::sync::CancellationToken;

/// Runs `f` on the current pool and returns its task.
///
/// A panic inside `f` faults the task with a
/// [`PanicFault`](crate::error::PanicFault).
///
/// ```
/// let task = pledge::task::spawn(|| 6 * 7);
///
/// assert_eq!(task.result().unwrap(), 42);
/// ```
pub fn spawn<T, F>(f: F) -> Task<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    Handle::current_or_default().spawn(f)
}

/// Runs fallible `f` on the current pool. An `Err` faults the task.
pub fn try_spawn<T, E, F>(f: F) -> Task<T>
where
    T: Send + 'static,
    E: Into<Fault>,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    Handle::current_or_default().try_spawn(f)
}

/// Runs `f` on the current pool with explicit [`SpawnOptions`].
pub fn spawn_with<T, E, F>(options: SpawnOptions, f: F) -> Task<T>
where
    T: Send + 'static,
    E: Into<Fault>,
    F: FnOnce(&CancellationToken) -> Result<T, E> + Send + 'static,
{
    Handle::current_or_default().spawn_with(options, f)
}

/// Runs `f` on a dedicated thread, for blocking work that would tie up a
/// worker.
pub fn spawn_dedicated<T, F>(f: F) -> Task<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    Handle::current_or_default().spawn_dedicated(f)
}
