use crate::runtime::core::Handle;

use std::cell::{Cell, RefCell};

thread_local! {
    static CURRENT_POOL: RefCell<Option<Handle>> = const { RefCell::new(None) };

    /// Index of the local queue owned by this thread, if it is a worker.
    static CURRENT_WORKER: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Makes `handle` the current pool while `f` runs.
pub(crate) fn enter_context<R>(handle: Handle, worker: Option<usize>, f: impl FnOnce() -> R) -> R {
    let prev_pool = CURRENT_POOL.with(|cell| cell.replace(Some(handle)));
    let prev_worker = CURRENT_WORKER.with(|cell| cell.replace(worker));

    let r = f();

    CURRENT_WORKER.with(|cell| cell.set(prev_worker));
    CURRENT_POOL.with(|cell| cell.replace(prev_pool));

    r
}

pub(crate) fn current() -> Option<Handle> {
    CURRENT_POOL.with(|cell| cell.borrow().clone())
}

/// The local queue index of the calling thread, if it is a worker of `handle`'s pool.
pub(crate) fn worker_index(handle: &Handle) -> Option<usize> {
    CURRENT_POOL.with(|cell| {
        let current = cell.borrow();

        match current.as_ref() {
            Some(current) if current.ptr_eq(handle) => CURRENT_WORKER.with(Cell::get),
            _ => None,
        }
    })
}
