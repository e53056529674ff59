use super::handle::Task;
use crate::error::Fault;
use crate::runtime::core::Handle;

use std::panic::{self, AssertUnwindSafe};

/// Where a continuation runs once its antecedent completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dispatch {
    /// Run on the thread that completes the antecedent: the worker that ran
    /// it, the thread driving a `CompletionSource`, or the registering thread
    /// when the antecedent is already complete.
    #[default]
    Inline,

    /// Submit to the pool that was current when the continuation was
    /// registered (the registering worker's pool, or the default pool).
    Rescheduled,
}

type Callback<T> = Box<dyn FnOnce(&Task<T>) + Send + 'static>;

/// An entry in a task's continuation list.
pub(crate) struct Continuation<T> {
    callback: Callback<T>,

    /// Captured at registration. `None` for inline dispatch.
    pool: Option<Handle>,
}

impl<T: Send + 'static> Continuation<T> {
    pub(crate) fn new<F>(dispatch: Dispatch, callback: F) -> Self
    where
        F: FnOnce(&Task<T>) + Send + 'static,
    {
        let pool = match dispatch {
            Dispatch::Inline => None,
            Dispatch::Rescheduled => Some(Handle::current_or_default()),
        };

        Self {
            callback: Box::new(callback),
            pool,
        }
    }

    /// Runs or schedules the callback for a terminal antecedent.
    ///
    /// Rescheduled continuations go through the pool's injector, so those
    /// dispatched by one completion start in registration order. A
    /// rescheduled continuation whose pool has shut down runs inline.
    pub(crate) fn dispatch(self, antecedent: &Task<T>) {
        let Continuation { callback, pool } = self;

        let Some(pool) = pool else {
            invoke(callback, antecedent);
            return;
        };

        let task = antecedent.clone();

        if let Err(job) = pool.inject(Box::new(move || invoke(callback, &task))) {
            tracing::debug!(
                task.id = %antecedent.id(),
                "pool is shut down, running continuation inline"
            );
            job();
        }
    }
}

fn invoke<T>(callback: Callback<T>, antecedent: &Task<T>) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(antecedent))) {
        let fault = Fault::from_panic(payload);

        tracing::error!(
            task.id = %antecedent.id(),
            error = %fault,
            "continuation callback panicked"
        );
    }
}
