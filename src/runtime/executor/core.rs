use crate::runtime::core::Handle;
use crate::runtime::executor::worker::Worker;

use std::io;
use std::thread::{self, JoinHandle};

/// Owns the worker threads of a pool.
pub(crate) struct Executor {
    handle: Handle,
    handles: Vec<JoinHandle<()>>,
}

impl Executor {
    /// Starts one worker per local queue of `handle`.
    ///
    /// If a thread fails to start, the workers already running are stopped
    /// and joined before the error is returned.
    pub(crate) fn new(handle: &Handle) -> io::Result<Self> {
        let threads = handle.shared.locals.len();
        let mut executor = Self {
            handle: handle.clone(),
            handles: Vec::with_capacity(threads),
        };

        for id in 0..threads {
            let worker = Worker::new(id, handle.clone());
            let name = format!("{}-worker-{id}", handle.shared.thread_name);

            match thread::Builder::new().name(name).spawn(move || worker.run()) {
                Ok(thread) => executor.handles.push(thread),
                Err(error) => {
                    executor.shutdown();
                    executor.join();

                    return Err(error);
                }
            }
        }

        Ok(executor)
    }

    pub(crate) fn shutdown(&self) {
        self.handle.shared.injector.shutdown();
    }

    /// Joins every worker except the calling thread.
    pub(crate) fn join(&mut self) {
        let current = thread::current().id();

        for h in self.handles.drain(..) {
            if h.thread().id() == current {
                continue;
            }

            if h.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
    }
}
