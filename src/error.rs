//! Error types.
//!
//! Work that fails is never re-raised on the thread that ran it. The failure
//! is captured as a [`Fault`] and stored in the task, and it only surfaces when
//! somebody observes the task:
//!
//! - [`Task::wait`](crate::Task::wait) and [`Task::result`](crate::Task::result)
//!   return [`TaskError`], wrapping faults in an [`AggregateError`],
//! - [`Task::join`](crate::Task::join) and `.await` return [`JoinError`], which
//!   carries the first fault unwrapped,
//! - [`CompletionSource`](crate::CompletionSource) setters return
//!   [`CompletionError`] when the task already reached a terminal state.

use crate::runtime::task::TaskId;

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A captured failure of a unit of work.
///
/// `Fault` is a cheaply cloneable, type-erased error. Any
/// `std::error::Error + Send + Sync + 'static` converts into it, so work
/// functions can use `?` freely. Panics are captured as [`PanicFault`].
///
/// `Fault` deliberately does not implement [`std::error::Error`] itself; use
/// [`as_error`](Self::as_error) to reach the underlying error.
#[derive(Clone)]
pub struct Fault {
    inner: Arc<dyn Error + Send + Sync + 'static>,
}

impl Fault {
    /// Wraps an error.
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    /// Creates a fault from a plain message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::new(MessageFault(message.to_string()))
    }

    /// Wraps an already boxed error.
    pub fn from_boxed(error: Box<dyn Error + Send + Sync + 'static>) -> Self {
        Self {
            inner: Arc::from(error),
        }
    }

    /// Converts a panic payload caught with `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "Box<dyn Any>".to_string()
        };

        Self::new(PanicFault { message })
    }

    /// Returns `true` if the wrapped error is of type `E`.
    pub fn is<E>(&self) -> bool
    where
        E: Error + 'static,
    {
        self.inner.is::<E>()
    }

    /// Returns a reference to the wrapped error if it is of type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: Error + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    /// Returns the underlying error.
    pub fn as_error(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.inner
    }
}

impl<E> From<E> for Fault
where
    E: Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Fault::new(error)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct MessageFault(String);

/// A panic raised by work or by a continuation, captured as a fault.
#[derive(Debug, Clone, thiserror::Error)]
#[error("task panicked: {message}")]
pub struct PanicFault {
    message: String,
}

impl PanicFault {
    /// The panic message, or `Box<dyn Any>` for non-string payloads.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The error returned by cooperative work that noticed a cancellation request.
///
/// Work that returns this error ends in the `Canceled` state instead of
/// `Faulted`. See [`CancellationToken::check`](crate::CancellationToken::check).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, thiserror::Error)]
#[error("the operation was canceled")]
pub struct OperationCanceled;

/// One or more faults captured by a task.
///
/// A task that completes through a single failing work item holds exactly one
/// fault. Tasks completed with [`CompletionSource::set_faults`] or produced by
/// [`when_all`](crate::task::when_all) may hold several, in order.
///
/// [`CompletionSource::set_faults`]: crate::CompletionSource::set_faults
#[derive(Debug, Clone)]
pub struct AggregateError {
    /// Never empty.
    faults: Vec<Fault>,
}

impl AggregateError {
    pub(crate) fn new(faults: Vec<Fault>) -> Self {
        debug_assert!(!faults.is_empty(), "an aggregate error needs a fault");

        Self { faults }
    }

    /// The first captured fault.
    pub fn first(&self) -> &Fault {
        &self.faults[0]
    }

    /// All captured faults, in capture order.
    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    /// Number of captured faults.
    pub fn len(&self) -> usize {
        self.faults.len()
    }

    /// Always `false`; kept for symmetry with [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    /// Consumes the aggregate and returns its faults.
    pub fn into_faults(self) -> Vec<Fault> {
        self.faults
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.faults.as_slice() {
            [] => write!(f, "one or more errors occurred"),
            [single] => write!(f, "one or more errors occurred: {single}"),
            [first, rest @ ..] => write!(
                f,
                "{} errors occurred: {first} (and {} more)",
                rest.len() + 1,
                rest.len()
            ),
        }
    }
}

impl Error for AggregateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.faults.first().map(|fault| fault.as_error() as _)
    }
}

/// Error returned by the blocking observation methods of a task.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    /// The task faulted. All captured faults are included.
    #[error("task faulted: {0}")]
    Faulted(#[source] AggregateError),

    /// The task was canceled.
    #[error("task was canceled")]
    Canceled,

    /// A bounded wait elapsed before the task reached a terminal state.
    #[error("timed out after {0:?} waiting for task")]
    TimedOut(Duration),
}

impl TaskError {
    /// Returns `true` if the task was canceled.
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }

    /// Returns the captured faults if the task faulted.
    pub fn faults(&self) -> Option<&AggregateError> {
        match self {
            TaskError::Faulted(error) => Some(error),
            _ => None,
        }
    }
}

/// Error returned by [`Task::join`](crate::Task::join) and by awaiting a task.
///
/// Unlike [`TaskError`], the fault is not wrapped: only the first captured
/// fault is returned.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JoinError {
    /// The task faulted.
    #[error("{0}")]
    Faulted(Fault),

    /// The task was canceled.
    #[error("task was canceled")]
    Canceled,
}

impl JoinError {
    /// Returns `true` if the task was canceled.
    pub fn is_canceled(&self) -> bool {
        matches!(self, JoinError::Canceled)
    }

    /// Returns the fault if the task faulted.
    pub fn into_fault(self) -> Option<Fault> {
        match self {
            JoinError::Faulted(fault) => Some(fault),
            JoinError::Canceled => None,
        }
    }
}

/// Error returned when driving a [`CompletionSource`](crate::CompletionSource).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    /// The task already reached a terminal state.
    #[error("task {0} has already completed")]
    AlreadyCompleted(TaskId),

    /// `set_faults` was called with no faults.
    #[error("at least one fault is required to fault task {0}")]
    NoFaults(TaskId),
}
