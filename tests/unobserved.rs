mod common;

use pledge::diagnostics::{self, HookId};
use pledge::{CompletionSource, Fault, TaskId, task};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Hooks are process-wide and tests run in parallel, so every test only
/// looks at the task ids it created.
fn record() -> (HookId, Arc<Mutex<Vec<TaskId>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let hook = diagnostics::on_unobserved_fault(move |report| {
        sink.lock().unwrap().push(report.task_id());
    });

    (hook, seen)
}

fn count(seen: &Mutex<Vec<TaskId>>, id: TaskId) -> usize {
    seen.lock().unwrap().iter().filter(|seen| **seen == id).count()
}

#[test]
fn dropped_fault_is_reported_once() {
    common::init_tracing();
    let (hook, seen) = record();

    let source = CompletionSource::<u8>::new();
    let task = source.task();
    let id = task.id();

    source.set_fault(Fault::msg("nobody looked")).unwrap();
    drop(task);
    drop(source);

    assert_eq!(count(&seen, id), 1);
    assert!(diagnostics::remove_hook(hook));
}

#[test]
fn waiting_observes_the_fault() {
    let (hook, seen) = record();

    let source = CompletionSource::<u8>::new();
    let task = source.task();
    let id = task.id();

    source.set_fault(Fault::msg("seen")).unwrap();
    assert!(task.wait().is_err());
    drop((task, source));

    assert_eq!(count(&seen, id), 0);
    diagnostics::remove_hook(hook);
}

#[test]
fn reading_the_exception_observes_the_fault() {
    let (hook, seen) = record();

    let task = pledge::Task::<u8>::from_fault(Fault::msg("read"));
    let id = task.id();

    assert!(task.exception().is_some());
    drop(task);

    assert_eq!(count(&seen, id), 0);
    diagnostics::remove_hook(hook);
}

#[test]
fn timed_out_wait_does_not_observe() {
    let (hook, seen) = record();

    let source = CompletionSource::<u8>::new();
    let task = source.task();
    let id = task.id();

    assert!(!task.wait_timeout(Duration::from_millis(10)).unwrap());

    source.set_fault(Fault::msg("too late")).unwrap();
    drop((task, source));

    assert_eq!(count(&seen, id), 1);
    diagnostics::remove_hook(hook);
}

#[test]
fn successful_and_canceled_tasks_are_never_reported() {
    let (hook, seen) = record();

    let ok = CompletionSource::new();
    let canceled = CompletionSource::<u8>::new();
    let ids = [ok.task().id(), canceled.task().id()];

    ok.set_result(1_u8).unwrap();
    canceled.set_canceled().unwrap();
    drop((ok, canceled));

    assert!(ids.iter().all(|id| count(&seen, *id) == 0));
    diagnostics::remove_hook(hook);
}

#[test]
fn pool_task_fault_is_reported_after_drop() {
    let (hook, seen) = record();

    let task = task::try_spawn(|| Err::<u8, _>(Fault::msg("background")));
    let id = task.id();

    assert!(common::eventually(Duration::from_secs(2), || task.is_completed()));
    drop(task);

    assert!(common::eventually(Duration::from_secs(2), || count(&seen, id) == 1));
    diagnostics::remove_hook(hook);
}

#[test]
fn panicking_hook_does_not_stop_other_hooks() {
    let panicking = diagnostics::on_unobserved_fault(|_| panic!("hook failed"));
    let (hook, seen) = record();

    let id = {
        let task = pledge::Task::<u8>::from_fault(Fault::msg("ignored"));
        task.id()
    };

    assert_eq!(count(&seen, id), 1);

    assert!(diagnostics::remove_hook(panicking));
    assert!(!diagnostics::remove_hook(panicking));
    diagnostics::remove_hook(hook);
}
