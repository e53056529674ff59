use super::Job;

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

/// The pool-wide queue fed by threads that are not workers of the pool.
pub(crate) struct Injector {
    state: Mutex<State>,
    condvar: Condvar,
}

struct State {
    jobs: VecDeque<Job>,
    shutdown: bool,
}

impl Injector {
    pub(crate) fn new() -> Self {
        Injector {
            state: Mutex::new(State {
                jobs: VecDeque::new(),
                shutdown: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Queues `job`, handing it back if the pool is shut down.
    pub(crate) fn push(&self, job: Job) -> Result<(), Job> {
        {
            let mut state = self.state.lock();

            if state.shutdown {
                return Err(job);
            }

            state.jobs.push_back(job);
        }

        self.condvar.notify_one();
        Ok(())
    }

    pub(crate) fn steal(&self) -> Option<Job> {
        self.state.lock().jobs.pop_front()
    }

    /// Wakes one parked worker, after work was pushed to a local queue.
    pub(crate) fn notify(&self) {
        self.condvar.notify_one();
    }

    pub(crate) fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.condvar.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Parks the calling worker until notified or `timeout` elapses.
    ///
    /// Returns immediately if work is queued or the pool is shutting down.
    /// The timeout bounds how long a job pushed to another worker's local
    /// queue can go unstolen.
    pub(crate) fn park(&self, timeout: Duration) {
        let mut state = self.state.lock();

        if state.shutdown || !state.jobs.is_empty() {
            return;
        }

        self.condvar.wait_for(&mut state, timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_are_stolen_in_fifo_order() {
        let injector = Injector::new();
        let (tx, rx) = std::sync::mpsc::channel();

        for n in 0..3 {
            let tx = tx.clone();
            assert!(injector.push(Box::new(move || tx.send(n).unwrap())).is_ok());
        }

        while let Some(job) = injector.steal() {
            job();
        }

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn push_after_shutdown_returns_the_job() {
        let injector = Injector::new();
        injector.shutdown();

        assert!(injector.is_shutdown());
        assert!(injector.push(Box::new(|| {})).is_err());
        assert!(injector.steal().is_none());
    }
}
