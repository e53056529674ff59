use super::core::{Core, Outcome};
use super::handle::Task;
use super::state::Status;
use crate::error::{AggregateError, CompletionError, Fault};

use std::fmt;
use std::sync::Arc;

/// The producer side of a manually completed [`Task`].
///
/// A `CompletionSource` owns the right to move its task into a terminal
/// state. Exactly one of the setters succeeds over the lifetime of the task;
/// the `try_*` variants report a lost race as `false`, the others as
/// [`CompletionError::AlreadyCompleted`].
///
/// Clones share the same task. When the last clone is dropped without the
/// task being completed, the task is canceled so that nobody waits forever.
///
/// ```
/// use pledge::CompletionSource;
///
/// let source = CompletionSource::new();
/// let task = source.task();
///
/// assert!(source.try_set_result(42));
/// assert!(!source.try_set_result(7));
/// assert_eq!(task.result().unwrap(), 42);
/// ```
pub struct CompletionSource<T: Send + 'static> {
    inner: Arc<SourceInner<T>>,
}

struct SourceInner<T: Send + 'static> {
    core: Arc<Core<T>>,
}

impl<T: Send + 'static> CompletionSource<T> {
    /// Creates a source whose task is `Scheduled` until one of the setters
    /// runs.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SourceInner {
                core: Arc::new(Core::new(Status::Scheduled)),
            }),
        }
    }

    /// The task controlled by this source.
    pub fn task(&self) -> Task<T> {
        Task::from_core(self.inner.core.clone())
    }

    /// Completes the task with `value`.
    ///
    /// # Errors
    ///
    /// [`CompletionError::AlreadyCompleted`] if the task is already terminal.
    pub fn set_result(&self, value: T) -> Result<(), CompletionError> {
        self.finish(Outcome::Completed(value))
    }

    /// Completes the task with `value`, returning `false` if it was already terminal.
    pub fn try_set_result(&self, value: T) -> bool {
        self.inner.core.complete(Outcome::Completed(value))
    }

    /// Faults the task with a single fault.
    ///
    /// # Errors
    ///
    /// [`CompletionError::AlreadyCompleted`] if the task is already terminal.
    pub fn set_fault(&self, fault: impl Into<Fault>) -> Result<(), CompletionError> {
        self.finish(Outcome::Faulted(AggregateError::new(vec![fault.into()])))
    }

    /// Faults the task with a single fault, returning `false` if it was
    /// already terminal.
    ///
    /// ```
    /// use pledge::CompletionSource;
    /// use std::io;
    ///
    /// let source = CompletionSource::<u32>::new();
    /// let task = source.task();
    ///
    /// assert!(source.try_set_fault(io::Error::other("disk full")));
    /// assert!(!source.try_set_canceled());
    /// assert!(task.is_faulted());
    /// # drop(task.exception());
    /// ```
    pub fn try_set_fault(&self, fault: impl Into<Fault>) -> bool {
        self.inner
            .core
            .complete(Outcome::Faulted(AggregateError::new(vec![fault.into()])))
    }

    /// Faults the task with every fault in `faults`, in order.
    ///
    /// # Errors
    ///
    /// - [`CompletionError::NoFaults`] if `faults` is empty; the task is left untouched,
    /// - [`CompletionError::AlreadyCompleted`] if the task is already terminal.
    pub fn set_faults<I>(&self, faults: I) -> Result<(), CompletionError>
    where
        I: IntoIterator<Item = Fault>,
    {
        let faults: Vec<Fault> = faults.into_iter().collect();

        if faults.is_empty() {
            return Err(CompletionError::NoFaults(self.inner.core.id()));
        }

        self.finish(Outcome::Faulted(AggregateError::new(faults)))
    }

    /// Like [`set_faults`](Self::set_faults), returning `false` instead of an error.
    pub fn try_set_faults<I>(&self, faults: I) -> bool
    where
        I: IntoIterator<Item = Fault>,
    {
        let faults: Vec<Fault> = faults.into_iter().collect();

        if faults.is_empty() {
            return false;
        }

        self.inner
            .core
            .complete(Outcome::Faulted(AggregateError::new(faults)))
    }

    /// Cancels the task.
    ///
    /// # Errors
    ///
    /// [`CompletionError::AlreadyCompleted`] if the task is already terminal.
    pub fn set_canceled(&self) -> Result<(), CompletionError> {
        self.finish(Outcome::Canceled)
    }

    /// Cancels the task, returning `false` if it was already terminal.
    pub fn try_set_canceled(&self) -> bool {
        self.inner.core.complete(Outcome::Canceled)
    }

    fn finish(&self, outcome: Outcome<T>) -> Result<(), CompletionError> {
        if self.inner.core.complete(outcome) {
            Ok(())
        } else {
            Err(CompletionError::AlreadyCompleted(self.inner.core.id()))
        }
    }
}

impl<T: Send + 'static> Default for CompletionSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Clone for CompletionSource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + 'static> fmt::Debug for CompletionSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSource")
            .field("task", &self.inner.core.id())
            .field("status", &self.inner.core.status())
            .finish()
    }
}

impl<T: Send + 'static> Drop for SourceInner<T> {
    fn drop(&mut self) {
        if self.core.complete(Outcome::Canceled) {
            tracing::debug!(
                task.id = %self.core.id(),
                "completion source dropped before completing its task"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_source_task_is_scheduled() {
        let source = CompletionSource::<u8>::new();

        assert_eq!(source.task().status(), Status::Scheduled);
        assert!(!source.task().is_completed());
    }

    #[test]
    fn empty_fault_list_leaves_task_pending() {
        let source = CompletionSource::<u8>::new();
        let task = source.task();

        assert_eq!(
            source.set_faults(Vec::new()),
            Err(CompletionError::NoFaults(task.id()))
        );
        assert!(!source.try_set_faults(Vec::new()));
        assert!(!task.is_completed());
    }

    #[test]
    fn dropping_last_clone_cancels() {
        let source = CompletionSource::<u8>::new();
        let clone = source.clone();
        let task = source.task();

        drop(source);
        assert!(!task.is_completed());

        drop(clone);
        assert!(task.is_canceled());
    }
}
