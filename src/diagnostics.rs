//! Reporting of faults nobody observed.
//!
//! A faulted task whose fault was never read through
//! [`Task::wait`](crate::Task::wait), [`Task::result`](crate::Task::result),
//! [`Task::join`](crate::Task::join), `.await` or
//! [`Task::exception`](crate::Task::exception) is reported when its last
//! handle is dropped. Every report emits a `warn` event and is passed to the
//! registered hooks. The process keeps running.
//!
//! ```
//! use pledge::diagnostics;
//!
//! let hook = diagnostics::on_unobserved_fault(|report| {
//!     eprintln!("task {} faulted: {}", report.task_id(), report.error());
//! });
//!
//! diagnostics::remove_hook(hook);
//! ```

use crate::error::{AggregateError, Fault};
use crate::runtime::task::TaskId;

use parking_lot::{RwLock, const_rwlock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A fault that was dropped without being observed.
#[derive(Debug, Clone)]
pub struct UnobservedFault {
    task_id: TaskId,
    error: AggregateError,
}

impl UnobservedFault {
    /// The task that faulted.
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Every fault the task ended with.
    pub fn error(&self) -> &AggregateError {
        &self.error
    }
}

/// Identifies a registered hook, see [`remove_hook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

type Hook = Arc<dyn Fn(&UnobservedFault) + Send + Sync + 'static>;

static HOOKS: RwLock<Vec<(HookId, Hook)>> = const_rwlock(Vec::new());
static NEXT_HOOK: AtomicU64 = AtomicU64::new(0);

/// Registers `hook` to be called for every unobserved fault.
///
/// Hooks may run on any thread, including pool workers.
pub fn on_unobserved_fault<F>(hook: F) -> HookId
where
    F: Fn(&UnobservedFault) + Send + Sync + 'static,
{
    let id = HookId(NEXT_HOOK.fetch_add(1, Ordering::Relaxed));

    HOOKS.write().push((id, Arc::new(hook)));

    id
}

/// Unregisters a hook. Returns `false` if it was not registered.
pub fn remove_hook(id: HookId) -> bool {
    let mut hooks = HOOKS.write();
    let len = hooks.len();

    hooks.retain(|(hook_id, _)| *hook_id != id);

    hooks.len() != len
}

pub(crate) fn report(task_id: TaskId, error: AggregateError) {
    tracing::warn!(
        task.id = %task_id,
        %error,
        "task fault was never observed"
    );

    // Cloned out so a hook can register or remove hooks.
    let hooks: Vec<Hook> = HOOKS.read().iter().map(|(_, hook)| hook.clone()).collect();

    if hooks.is_empty() {
        return;
    }

    let report = UnobservedFault { task_id, error };

    for hook in hooks {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook(&report))) {
            tracing::error!(
                task.id = %task_id,
                error = %Fault::from_panic(payload),
                "unobserved fault hook panicked"
            );
        }
    }
}
