use crate::error::Fault;
use crate::runtime::builder::PoolBuilder;
use crate::runtime::context::{self, enter_context};
use crate::runtime::executor::Executor;
use crate::runtime::park;
use crate::runtime::task::Task;
use crate::runtime::task::options::{ExecutionMode, SpawnOptions};
use crate::runtime::task::state::Status;
use crate::runtime::task::work::WorkItem;
use crate::runtime::work_stealing::Job;
use crate::runtime::work_stealing::injector::Injector;
use crate::runtime::work_stealing::queue::LocalQueue;
use crate::sync::CancellationToken;

use parking_lot::Mutex;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

/// State shared by a pool, its handles and its workers.
pub(crate) struct Shared {
    pub(crate) injector: Injector,
    pub(crate) locals: Vec<LocalQueue>,
    pub(crate) thread_name: String,
    pub(crate) park_timeout: Duration,
    dedicated: AtomicUsize,
}

impl Shared {
    pub(crate) fn new(workers: usize, thread_name: String, park_timeout: Duration) -> Self {
        Self {
            injector: Injector::new(),
            locals: (0..workers).map(|_| LocalQueue::new()).collect(),
            thread_name,
            park_timeout,
            dedicated: AtomicUsize::new(0),
        }
    }
}

static DEFAULT_POOL: OnceLock<Pool> = OnceLock::new();

/// A cloneable reference to a [`Pool`], used to submit work to it.
///
/// Handles stay valid after the pool is shut down; work submitted through
/// them is then canceled instead of run.
#[derive(Clone)]
pub struct Handle {
    pub(crate) shared: Arc<Shared>,
}

impl Handle {
    /// The pool of the current worker, dedicated thread, or `Pool::block_on` call.
    pub fn current() -> Option<Handle> {
        context::current()
    }

    /// Like [`current`](Self::current), falling back to the process-wide
    /// default pool, which is built on first use and never shut down.
    pub fn current_or_default() -> Handle {
        Self::current().unwrap_or_else(|| {
            DEFAULT_POOL
                .get_or_init(|| PoolBuilder::new().build())
                .handle()
                .clone()
        })
    }

    /// Runs `f` on the pool and returns its task.
    pub fn spawn<T, F>(&self, f: F) -> Task<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.spawn_with(SpawnOptions::new(), move |_| Ok::<T, Infallible>(f()))
    }

    /// Runs fallible `f` on the pool. An `Err` faults the task.
    pub fn try_spawn<T, E, F>(&self, f: F) -> Task<T>
    where
        T: Send + 'static,
        E: Into<Fault>,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        self.spawn_with(SpawnOptions::new(), move |_| f())
    }

    /// Runs `f` on a dedicated thread named after the pool.
    pub fn spawn_dedicated<T, F>(&self, f: F) -> Task<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.spawn_with(SpawnOptions::new().long_running(), move |_| {
            Ok::<T, Infallible>(f())
        })
    }

    /// Runs `f` according to `options`.
    ///
    /// `f` receives the cancellation token from `options`, or a token that is
    /// never canceled. If the token is canceled before `f` starts, `f` is not
    /// run and the task ends `Canceled`. An
    /// [`OperationCanceled`](crate::error::OperationCanceled) error returned by
    /// `f` also cancels the task.
    pub fn spawn_with<T, E, F>(&self, options: SpawnOptions, f: F) -> Task<T>
    where
        T: Send + 'static,
        E: Into<Fault>,
        F: FnOnce(&CancellationToken) -> Result<T, E> + Send + 'static,
    {
        let task = Task::pending(Status::Created);
        let token = options.token.unwrap_or_default();
        let item = WorkItem::new(task.core.clone(), token, f);

        task.core.transition(Status::Created, Status::Scheduled);

        match options.mode {
            ExecutionMode::Pooled => {
                if let Err(job) = self.schedule(Box::new(move || item.run())) {
                    tracing::warn!(
                        task.id = %task.id(),
                        pool = %self.shared.thread_name,
                        "work submitted after shutdown, canceling task"
                    );
                    drop(job);
                }
            }
            ExecutionMode::Dedicated => self.spawn_thread(item),
        }

        task
    }

    /// Returns `true` once the pool stopped accepting work.
    pub fn is_shutdown(&self) -> bool {
        self.shared.injector.is_shutdown()
    }

    /// Queues `job`, handing it back if the pool is shut down.
    ///
    /// A worker of this pool pushes to its own queue, any other thread to
    /// the injector.
    pub(crate) fn schedule(&self, job: Job) -> Result<(), Job> {
        if let Some(index) = context::worker_index(self) {
            if self.is_shutdown() {
                return Err(job);
            }

            self.shared.locals[index].push(job);
            self.shared.injector.notify();

            return Ok(());
        }

        self.shared.injector.push(job)
    }

    /// Queues `job` on the injector, whatever the calling thread.
    ///
    /// The injector is FIFO, so jobs injected from one thread start in the
    /// order they were injected.
    pub(crate) fn inject(&self, job: Job) -> Result<(), Job> {
        self.shared.injector.push(job)
    }

    pub(crate) fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    fn spawn_thread<T, E, F>(&self, item: WorkItem<T, F>)
    where
        T: Send + 'static,
        E: Into<Fault>,
        F: FnOnce(&CancellationToken) -> Result<T, E> + Send + 'static,
    {
        let n = self.shared.dedicated.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-dedicated-{n}", self.shared.thread_name);

        let slot = Arc::new(Mutex::new(Some(item)));
        let thread_slot = slot.clone();
        let handle = self.clone();

        let spawned = thread::Builder::new().name(name).spawn(move || {
            let item = thread_slot.lock().take();

            if let Some(item) = item {
                enter_context(handle, None, || item.run());
            }
        });

        if let Err(error) = spawned {
            tracing::warn!(%error, "failed to spawn dedicated thread");

            let item = slot.lock().take();

            if let Some(item) = item {
                item.fail(Fault::new(error));
            }
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("name", &self.shared.thread_name)
            .field("workers", &self.shared.locals.len())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

/// A work-stealing thread pool.
///
/// Built with [`PoolBuilder`]. Dropping the pool shuts it down: work already
/// queued still runs, work submitted afterwards through a [`Handle`] is
/// canceled, and the worker threads are joined.
pub struct Pool {
    handle: Handle,
    executor: Executor,
}

impl Pool {
    pub(crate) fn new(worker_threads: usize, thread_name: String, park_timeout: Duration) -> io::Result<Self> {
        let shared = Arc::new(Shared::new(worker_threads, thread_name, park_timeout));
        let handle = Handle { shared };
        let executor = Executor::new(&handle)?;

        tracing::debug!(
            pool = %handle.shared.thread_name,
            workers = worker_threads,
            "pool started"
        );

        Ok(Self { handle, executor })
    }

    /// The handle used to submit work from other threads.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Runs `f` on one of the pool's workers.
    ///
    /// The returned task is hot: `f` is already queued. A panic in `f` faults
    /// the task instead of unwinding into the worker.
    ///
    /// # Examples
    ///
    /// ```
    /// use pledge::PoolBuilder;
    ///
    /// let pool = PoolBuilder::new().worker_threads(2).build();
    /// let task = pool.spawn(|| 6 * 7);
    ///
    /// assert_eq!(task.result().unwrap(), 42);
    /// ```
    pub fn spawn<T, F>(&self, f: F) -> Task<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.handle.spawn(f)
    }

    /// Runs fallible `f` on the pool. An `Err` faults the task.
    ///
    /// # Examples
    ///
    /// ```
    /// use pledge::{PoolBuilder, Status};
    ///
    /// let pool = PoolBuilder::new().worker_threads(1).build();
    /// let task = pool.try_spawn(|| "x".parse::<u32>());
    ///
    /// assert!(task.wait().is_err());
    /// assert_eq!(task.status(), Status::Faulted);
    /// ```
    pub fn try_spawn<T, E, F>(&self, f: F) -> Task<T>
    where
        T: Send + 'static,
        E: Into<Fault>,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        self.handle.try_spawn(f)
    }

    /// Runs `f` with a cancellation token and execution mode from `options`.
    ///
    /// See [`Handle::spawn_with`].
    pub fn spawn_with<T, E, F>(&self, options: SpawnOptions, f: F) -> Task<T>
    where
        T: Send + 'static,
        E: Into<Fault>,
        F: FnOnce(&CancellationToken) -> Result<T, E> + Send + 'static,
    {
        self.handle.spawn_with(options, f)
    }

    /// Runs long, blocking `f` on its own thread so no worker is tied up.
    pub fn spawn_dedicated<T, F>(&self, f: F) -> Task<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.handle.spawn_dedicated(f)
    }

    /// Drives `future` to completion on the calling thread.
    ///
    /// While the future runs, this pool is the current pool, so
    /// [`task::spawn`](crate::task::spawn) and rescheduled continuations
    /// registered from it use this pool.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        enter_context(self.handle.clone(), None, || park::block_on(future))
    }

    /// Stops accepting work, lets queued work finish, and joins the workers.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool").field("handle", &self.handle).finish()
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.executor.shutdown();
        self.executor.join();

        tracing::debug!(pool = %self.handle.shared.thread_name, "pool stopped");
    }
}
