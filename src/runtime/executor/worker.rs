use crate::error::Fault;
use crate::runtime::context::enter_context;
use crate::runtime::core::Handle;
use crate::runtime::work_stealing::Job;

use std::panic::{self, AssertUnwindSafe};

pub(crate) struct Worker {
    id: usize,
    handle: Handle,
}

impl Worker {
    pub(crate) fn new(id: usize, handle: Handle) -> Self {
        Self { id, handle }
    }

    /// Runs jobs until the pool is shut down and no queued work remains.
    pub(crate) fn run(&self) {
        tracing::debug!(worker.id = self.id, "worker started");

        enter_context(self.handle.clone(), Some(self.id), || {
            let shared = &self.handle.shared;

            loop {
                if let Some(job) = self.next_job() {
                    self.run_job(job);
                    continue;
                }

                if shared.injector.is_shutdown() {
                    break;
                }

                shared.injector.park(shared.park_timeout);
            }
        });

        tracing::debug!(worker.id = self.id, "worker stopped");
    }

    /// Own queue first, then the injector, then the other workers.
    fn next_job(&self) -> Option<Job> {
        let shared = &self.handle.shared;

        if let Some(job) = shared.locals[self.id].pop() {
            return Some(job);
        }

        if let Some(job) = shared.injector.steal() {
            return Some(job);
        }

        let workers = shared.locals.len();

        (1..workers)
            .map(|offset| (self.id + offset) % workers)
            .find_map(|victim| shared.locals[victim].steal())
    }

    fn run_job(&self, job: Job) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            tracing::error!(
                worker.id = self.id,
                error = %Fault::from_panic(payload),
                "job panicked"
            );
        }
    }
}
