use std::io;
use std::thread;
use std::time::Duration;

use super::core::Pool;

/// Configures and builds a [`Pool`].
///
/// ```
/// use pledge::PoolBuilder;
///
/// let pool = PoolBuilder::new()
///     .worker_threads(2)
///     .thread_name("io")
///     .build();
///
/// assert_eq!(pool.spawn(|| 1 + 1).result().unwrap(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct PoolBuilder {
    worker_threads: usize,
    thread_name: String,
    park_timeout: Duration,
}

impl PoolBuilder {
    /// One worker per available core, threads named `pledge-*`.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            thread_name: "pledge".to_string(),
            park_timeout: Duration::from_millis(10),
        }
    }

    /// Sets the number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Prefix for worker and dedicated thread names.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Upper bound on how long an idle worker sleeps before looking for
    /// work to steal again.
    pub fn park_timeout(mut self, timeout: Duration) -> Self {
        self.park_timeout = timeout;
        self
    }

    /// Builds the pool.
    ///
    /// # Panics
    ///
    /// Panics if a worker thread cannot be spawned. Use
    /// [`try_build`](Self::try_build) to handle that case.
    pub fn build(self) -> Pool {
        self.try_build()
            .unwrap_or_else(|error| panic!("failed to start pool workers: {error}"))
    }

    /// Builds the pool, returning an error if a worker thread cannot be spawned.
    pub fn try_build(self) -> io::Result<Pool> {
        Pool::new(self.worker_threads, self.thread_name, self.park_timeout)
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
