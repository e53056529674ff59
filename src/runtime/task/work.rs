use super::core::{Core, Outcome, capture};
use super::state::Status;
use crate::error::{AggregateError, Fault};
use crate::sync::CancellationToken;

use std::sync::Arc;

/// Submitted work bound to the core it completes.
///
/// A work item that is dropped without having run, because its pool
/// rejected it or its thread never started, cancels its task.
pub(crate) struct WorkItem<T, F>
where
    T: Send + 'static,
{
    core: Arc<Core<T>>,
    token: CancellationToken,
    work: Option<F>,
}

impl<T, E, F> WorkItem<T, F>
where
    T: Send + 'static,
    E: Into<Fault>,
    F: FnOnce(&CancellationToken) -> Result<T, E>,
{
    pub(crate) fn new(core: Arc<Core<T>>, token: CancellationToken, work: F) -> Self {
        Self {
            core,
            token,
            work: Some(work),
        }
    }

    pub(crate) fn run(mut self) {
        let Some(work) = self.work.take() else {
            return;
        };

        if self.token.is_canceled() {
            tracing::trace!(task.id = %self.core.id(), "canceled before start");
            self.core.complete(Outcome::Canceled);
            return;
        }

        if !self.core.transition(Status::Scheduled, Status::Running) {
            return;
        }

        let token = &self.token;
        self.core.complete(capture(|| work(token)));
    }

    /// Faults the task without running the work.
    pub(crate) fn fail(mut self, fault: Fault) {
        self.work = None;
        self.core
            .complete(Outcome::Faulted(AggregateError::new(vec![fault])));
    }
}

impl<T, F> Drop for WorkItem<T, F>
where
    T: Send + 'static,
{
    fn drop(&mut self) {
        if self.work.take().is_some() {
            self.core.complete(Outcome::Canceled);
        }
    }
}
