use super::continuation::{Continuation, Dispatch};
use super::core::{Core, Outcome, capture};
use super::id::TaskId;
use super::state::Status;
use crate::error::{AggregateError, Fault, JoinError, TaskError};

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// A handle to a deferred computation.
///
/// A `Task` is returned by every submission API ([`spawn`](super::spawn),
/// [`Pool::spawn`](crate::Pool::spawn), ...), by
/// [`CompletionSource::task`](crate::CompletionSource::task), and by the
/// continuation combinators. It is "hot": the computation is already
/// scheduled and no separate start call exists.
///
/// Handles are cheap to clone; all clones observe the same computation.
/// Dropping every handle does **not** cancel the computation.
///
/// # Observing the outcome
///
/// - [`wait`](Self::wait), [`result`](Self::result) block and return
///   [`TaskError`], with faults wrapped in an [`AggregateError`],
/// - [`join`](Self::join) and `.await` return [`JoinError`] with the first
///   fault unwrapped,
/// - [`exception`](Self::exception) never blocks.
///
/// If a faulted task is dropped without any of these having seen the fault,
/// the process-wide [`diagnostics`](crate::diagnostics) hooks are notified.
pub struct Task<T> {
    pub(crate) core: Arc<Core<T>>,
}

impl<T> Task<T> {
    pub(crate) fn from_core(core: Arc<Core<T>>) -> Self {
        Self { core }
    }

    /// Creates a pending task in `status`, to be completed by crate internals.
    pub(crate) fn pending(status: Status) -> Self {
        Self::from_core(Arc::new(Core::new(status)))
    }

    /// Returns a task that already ran to completion with `value`.
    pub fn from_result(value: T) -> Self {
        Self::from_core(Arc::new(Core::completed(Outcome::Completed(value))))
    }

    /// Returns a task that already faulted with `fault`.
    pub fn from_fault(fault: impl Into<Fault>) -> Self {
        let error = AggregateError::new(vec![fault.into()]);

        Self::from_core(Arc::new(Core::completed(Outcome::Faulted(error))))
    }

    /// Returns a task that is already canceled.
    pub fn canceled() -> Self {
        Self::from_core(Arc::new(Core::completed(Outcome::Canceled)))
    }

    /// The task's process-unique identifier.
    pub fn id(&self) -> TaskId {
        self.core.id()
    }

    /// The current lifecycle status.
    pub fn status(&self) -> Status {
        self.core.status()
    }

    /// Returns `true` once the task reached any terminal state.
    pub fn is_completed(&self) -> bool {
        self.status().is_terminal()
    }

    /// Returns `true` if the task ran to completion.
    pub fn is_completed_successfully(&self) -> bool {
        self.status() == Status::RanToCompletion
    }

    /// Returns `true` if the task faulted.
    pub fn is_faulted(&self) -> bool {
        self.status() == Status::Faulted
    }

    /// Returns `true` if the task was canceled.
    pub fn is_canceled(&self) -> bool {
        self.status() == Status::Canceled
    }

    /// Blocks the calling thread until the task is terminal.
    ///
    /// # Errors
    ///
    /// - [`TaskError::Faulted`] if the task faulted; the fault becomes observed,
    /// - [`TaskError::Canceled`] if the task was canceled.
    pub fn wait(&self) -> Result<(), TaskError> {
        self.core.wait_until(None);
        self.observed(Outcome::to_unit)
    }

    /// Blocks until the task is terminal or `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout. A timed-out wait does not observe the
    /// task: if it faults later, the fault stays unobserved.
    ///
    /// # Errors
    ///
    /// Same as [`wait`](Self::wait) when the task completes in time.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool, TaskError> {
        if !self.core.wait_until(Some(Instant::now() + timeout)) {
            return Ok(false);
        }

        self.observed(Outcome::to_unit).map(|()| true)
    }

    /// Returns the captured faults without blocking.
    ///
    /// Returns `None` unless the task faulted. A `Some` return marks the fault
    /// as observed.
    pub fn exception(&self) -> Option<AggregateError> {
        self.core
            .observe(|outcome| outcome.error().cloned())
            .flatten()
    }

    /// Registers `callback` to run once the task is terminal.
    ///
    /// If the task is already terminal the callback is dispatched
    /// immediately. Otherwise callbacks are dispatched in registration order
    /// when the task completes, each according to its own `dispatch`.
    ///
    /// A panicking callback is logged and otherwise ignored.
    pub fn on_completed<F>(&self, dispatch: Dispatch, callback: F)
    where
        T: Send + 'static,
        F: FnOnce(&Task<T>) + Send + 'static,
    {
        self.core
            .push_continuation(Continuation::new(dispatch, callback));
    }

    /// Creates a task that runs `transform` on the pool once this task is
    /// terminal, whatever its outcome.
    ///
    /// The transform receives this task and decides how to react to it. A
    /// panic inside the transform faults the returned task.
    pub fn continue_with<U, F>(&self, transform: F) -> Task<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(&Task<T>) -> U + Send + 'static,
    {
        self.continue_with_mode(Dispatch::Rescheduled, transform)
    }

    /// Like [`continue_with`](Self::continue_with), with an explicit dispatch mode.
    pub fn continue_with_mode<U, F>(&self, dispatch: Dispatch, transform: F) -> Task<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(&Task<T>) -> U + Send + 'static,
    {
        self.try_continue_with_mode(dispatch, move |antecedent| {
            Ok::<U, Infallible>(transform(antecedent))
        })
    }

    /// Like [`continue_with`](Self::continue_with), for fallible transforms.
    ///
    /// An `Err` faults the returned task; an
    /// [`OperationCanceled`](crate::error::OperationCanceled) error cancels it.
    pub fn try_continue_with<U, E, F>(&self, transform: F) -> Task<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        E: Into<Fault>,
        F: FnOnce(&Task<T>) -> Result<U, E> + Send + 'static,
    {
        self.try_continue_with_mode(Dispatch::Rescheduled, transform)
    }

    /// Like [`try_continue_with`](Self::try_continue_with), with an explicit
    /// dispatch mode.
    pub fn try_continue_with_mode<U, E, F>(&self, dispatch: Dispatch, transform: F) -> Task<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        E: Into<Fault>,
        F: FnOnce(&Task<T>) -> Result<U, E> + Send + 'static,
    {
        let continuation = Task::<U>::pending(Status::Scheduled);
        let core = continuation.core.clone();

        self.on_completed(dispatch, move |antecedent| {
            if !core.transition(Status::Scheduled, Status::Running) {
                return;
            }

            core.complete(capture(|| transform(antecedent)));
        });

        continuation
    }

    fn observed<R>(&self, f: impl FnOnce(&Outcome<T>) -> Result<R, TaskError>) -> Result<R, TaskError> {
        // Only reached after the task is terminal.
        self.core
            .observe(f)
            .unwrap_or(Err(TaskError::Canceled))
    }
}

impl<T: Clone> Task<T> {
    /// Blocks until the task is terminal and returns a clone of its value.
    ///
    /// # Errors
    ///
    /// Same as [`wait`](Self::wait).
    pub fn result(&self) -> Result<T, TaskError> {
        self.core.wait_until(None);
        self.observed(Outcome::to_result)
    }

    /// Like [`result`](Self::result), giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// [`TaskError::TimedOut`] if `timeout` elapses first; the task is not
    /// observed in that case.
    pub fn result_timeout(&self, timeout: Duration) -> Result<T, TaskError> {
        if !self.core.wait_until(Some(Instant::now() + timeout)) {
            return Err(TaskError::TimedOut(timeout));
        }

        self.observed(Outcome::to_result)
    }

    /// Blocks until the task is terminal and returns its value, with the
    /// first fault unwrapped.
    ///
    /// This is the blocking counterpart of `.await`, convenient inside
    /// continuation chains.
    pub fn join(&self) -> Result<T, JoinError> {
        self.core.wait_until(None);
        self.core
            .observe(Outcome::to_join)
            .unwrap_or(Err(JoinError::Canceled))
    }
}

impl<T: Clone> Future for Task<T> {
    type Output = Result<T, JoinError>;

    /// Resolves once the task is terminal.
    ///
    /// The waker is registered under the same lock that guards the outcome,
    /// so a completion racing with the poll is never missed.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.core.poll_outcome(cx.waker(), Outcome::to_join) {
            Some(output) => Poll::Ready(output),
            None => Poll::Pending,
        }
    }
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("status", &self.status())
            .finish()
    }
}
