use super::Job;

use parking_lot::Mutex;
use std::collections::VecDeque;

/// A worker's own queue.
///
/// The owner pushes and pops at the back, so the most recently spawned job
/// runs first while its data is still warm. Thieves take from the front.
pub(crate) struct LocalQueue {
    inner: Mutex<VecDeque<Job>>,
}

impl LocalQueue {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn push(&self, job: Job) {
        self.inner.lock().push_back(job);
    }

    pub(crate) fn pop(&self) -> Option<Job> {
        self.inner.lock().pop_back()
    }

    pub(crate) fn steal(&self) -> Option<Job> {
        self.inner.lock().pop_front()
    }
}
