use super::continuation::Continuation;
use super::handle::Task;
use super::id::TaskId;
use super::state::Status;
use crate::diagnostics;
use crate::error::{AggregateError, Fault, JoinError, OperationCanceled, TaskError};

use parking_lot::{Condvar, Mutex};
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::task::Waker;
use std::time::Instant;

/// Terminal outcome of a task.
pub(crate) enum Outcome<T> {
    Completed(T),
    Faulted(AggregateError),
    Canceled,
}

impl<T> Outcome<T> {
    /// Classifies a captured fault. `OperationCanceled` cancels instead of faulting.
    pub(crate) fn from_fault(fault: Fault) -> Self {
        if fault.is::<OperationCanceled>() {
            Outcome::Canceled
        } else {
            Outcome::Faulted(AggregateError::new(vec![fault]))
        }
    }

    pub(crate) fn status(&self) -> Status {
        match self {
            Outcome::Completed(_) => Status::RanToCompletion,
            Outcome::Faulted(_) => Status::Faulted,
            Outcome::Canceled => Status::Canceled,
        }
    }

    pub(crate) fn error(&self) -> Option<&AggregateError> {
        match self {
            Outcome::Faulted(error) => Some(error),
            _ => None,
        }
    }

    pub(crate) fn to_unit(&self) -> Result<(), TaskError> {
        match self {
            Outcome::Completed(_) => Ok(()),
            Outcome::Faulted(error) => Err(TaskError::Faulted(error.clone())),
            Outcome::Canceled => Err(TaskError::Canceled),
        }
    }
}

impl<T: Clone> Outcome<T> {
    pub(crate) fn to_result(&self) -> Result<T, TaskError> {
        match self {
            Outcome::Completed(value) => Ok(value.clone()),
            Outcome::Faulted(error) => Err(TaskError::Faulted(error.clone())),
            Outcome::Canceled => Err(TaskError::Canceled),
        }
    }

    pub(crate) fn to_join(&self) -> Result<T, JoinError> {
        match self {
            Outcome::Completed(value) => Ok(value.clone()),
            Outcome::Faulted(error) => Err(JoinError::Faulted(error.first().clone())),
            Outcome::Canceled => Err(JoinError::Canceled),
        }
    }
}

/// Runs `work`, turning its error or panic into an outcome.
pub(crate) fn capture<T, E, F>(work: F) -> Outcome<T>
where
    F: FnOnce() -> Result<T, E>,
    E: Into<Fault>,
{
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(Ok(value)) => Outcome::Completed(value),
        Ok(Err(error)) => Outcome::from_fault(error.into()),
        Err(payload) => Outcome::from_fault(Fault::from_panic(payload)),
    }
}

/// Shared state of one deferred computation.
///
/// The `Core` is the state machine behind every [`Task`] handle. It stores
/// the outcome, the continuations waiting for it, and the wakers of async
/// callers.
///
/// The terminal transition is claimed under `inner`: the outcome is stored,
/// the status published and the continuation list taken in one critical
/// section. A continuation registered concurrently is therefore either in the
/// drained list or sees the outcome and dispatches itself.
pub(crate) struct Core<T> {
    id: TaskId,

    /// Raw [`Status`], see `state.rs`.
    state: AtomicU8,

    /// Set once somebody read the fault.
    observed: AtomicBool,

    inner: Mutex<Inner<T>>,

    /// Signaled once on the terminal transition.
    completed: Condvar,
}

struct Inner<T> {
    outcome: Option<Outcome<T>>,
    continuations: Vec<Continuation<T>>,
    wakers: Vec<Waker>,
}

impl<T> Core<T> {
    pub(crate) fn new(status: Status) -> Self {
        debug_assert!(!status.is_terminal());

        Self {
            id: TaskId::next(),
            state: AtomicU8::new(status.as_raw()),
            observed: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                outcome: None,
                continuations: Vec::new(),
                wakers: Vec::new(),
            }),
            completed: Condvar::new(),
        }
    }

    /// Creates a core that is already terminal.
    pub(crate) fn completed(outcome: Outcome<T>) -> Self {
        Self {
            id: TaskId::next(),
            state: AtomicU8::new(outcome.status().as_raw()),
            observed: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                outcome: Some(outcome),
                continuations: Vec::new(),
                wakers: Vec::new(),
            }),
            completed: Condvar::new(),
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn status(&self) -> Status {
        Status::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Moves between two non-terminal states. Fails if the task is no longer in `from`.
    pub(crate) fn transition(&self, from: Status, to: Status) -> bool {
        debug_assert!(!to.is_terminal());

        self.state
            .compare_exchange(
                from.as_raw(),
                to.as_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Blocks until the task is terminal or `deadline` passes.
    ///
    /// Returns `true` if the task is terminal.
    pub(crate) fn wait_until(&self, deadline: Option<Instant>) -> bool {
        let mut inner = self.inner.lock();

        while inner.outcome.is_none() {
            match deadline {
                None => self.completed.wait(&mut inner),
                Some(deadline) => {
                    if self.completed.wait_until(&mut inner, deadline).timed_out() {
                        return inner.outcome.is_some();
                    }
                }
            }
        }

        true
    }

    /// Reads the outcome if the task is terminal.
    ///
    /// Reading the outcome of a faulted task marks its fault as observed.
    pub(crate) fn observe<R>(&self, f: impl FnOnce(&Outcome<T>) -> R) -> Option<R> {
        let inner = self.inner.lock();
        let outcome = inner.outcome.as_ref()?;

        if outcome.error().is_some() {
            self.observed.store(true, Ordering::Release);
        }

        Some(f(outcome))
    }

    /// Like [`observe`](Self::observe), but registers `waker` when the task
    /// is still pending.
    pub(crate) fn poll_outcome<R>(
        &self,
        waker: &Waker,
        f: impl FnOnce(&Outcome<T>) -> R,
    ) -> Option<R> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if let Some(outcome) = inner.outcome.as_ref() {
            if outcome.error().is_some() {
                self.observed.store(true, Ordering::Release);
            }
            return Some(f(outcome));
        }

        if !inner.wakers.iter().any(|w| w.will_wake(waker)) {
            inner.wakers.push(waker.clone());
        }

        None
    }
}

impl<T: Send + 'static> Core<T> {
    /// Claims the terminal transition.
    ///
    /// Returns `false` and drops `outcome` if the task was already terminal.
    /// On success, blocked waiters are released, async waiters woken and every
    /// registered continuation dispatched in registration order.
    pub(crate) fn complete(self: &Arc<Self>, outcome: Outcome<T>) -> bool {
        let status = outcome.status();

        let (continuations, wakers) = {
            let mut inner = self.inner.lock();

            if inner.outcome.is_some() {
                return false;
            }

            inner.outcome = Some(outcome);
            self.state.store(status.as_raw(), Ordering::Release);

            (
                mem::take(&mut inner.continuations),
                mem::take(&mut inner.wakers),
            )
        };

        self.completed.notify_all();

        tracing::trace!(
            task.id = %self.id,
            %status,
            continuations = continuations.len(),
            "task completed"
        );

        for waker in wakers {
            waker.wake();
        }

        if !continuations.is_empty() {
            let task = Task::from_core(self.clone());

            for continuation in continuations {
                continuation.dispatch(&task);
            }
        }

        true
    }

    /// Registers a continuation, or dispatches it right away if the task is
    /// already terminal.
    pub(crate) fn push_continuation(self: &Arc<Self>, continuation: Continuation<T>) {
        {
            let mut inner = self.inner.lock();

            if inner.outcome.is_none() {
                inner.continuations.push(continuation);
                return;
            }
        }

        continuation.dispatch(&Task::from_core(self.clone()));
    }
}

impl<T> Drop for Core<T> {
    /// Reports a fault nobody read.
    fn drop(&mut self) {
        if self.observed.load(Ordering::Acquire) {
            return;
        }

        if let Some(Outcome::Faulted(error)) = self.inner.get_mut().outcome.take() {
            diagnostics::report(self.id, error);
        }
    }
}
