pub(crate) mod injector;
pub(crate) mod queue;

/// A unit of work queued on the pool.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;
