mod common;

use pledge::error::OperationCanceled;
use pledge::{CompletionSource, Dispatch, Fault, PoolBuilder, Status, Task, task};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn continue_with_transforms_the_result() {
    common::init_tracing();

    let price = task::spawn(|| 3.0_f64);
    let tax = price.continue_with(|price| price.result().unwrap() * 0.1);

    assert!((tax.result().unwrap() - 0.3).abs() < 1e-9);
}

#[test]
fn continuations_chain() {
    let task = task::spawn(|| 1)
        .continue_with(|t| t.result().unwrap() + 1)
        .continue_with(|t| t.result().unwrap() * 10);

    assert_eq!(task.result().unwrap(), 20);
}

#[test]
fn continuation_runs_after_a_fault() {
    let failing = task::try_spawn(|| Err::<u8, _>(Fault::msg("broken")));

    let report = failing.continue_with(|antecedent| {
        antecedent
            .exception()
            .map(|error| error.first().to_string())
            .unwrap_or_default()
    });

    assert_eq!(report.result().unwrap(), "broken");
}

#[test]
fn continuation_runs_after_cancellation() {
    let canceled = Task::<u8>::canceled();
    let status = canceled.continue_with(|antecedent| antecedent.status());

    assert_eq!(status.result().unwrap(), Status::Canceled);
}

#[test]
fn continuation_outcome_is_its_own() {
    let canceled = Task::<u8>::canceled();

    let panicking: Task<u8> = canceled.continue_with(|_| panic!("continuation failed"));
    assert!(panicking.wait().unwrap_err().faults().is_some());

    let failing = canceled.try_continue_with(|_| Err::<u8, _>(Fault::msg("nope")));
    assert!(failing.wait().unwrap_err().faults().is_some());

    let canceling = Task::from_result(1).try_continue_with(|_| Err::<u8, _>(OperationCanceled));
    assert!(canceling.wait().unwrap_err().is_canceled());
}

#[test]
fn inline_callbacks_run_in_registration_order() {
    let source = CompletionSource::new();
    let task = source.task();
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..5 {
        let order = order.clone();
        task.on_completed(Dispatch::Inline, move |_| order.lock().unwrap().push(i));
    }

    assert!(order.lock().unwrap().is_empty());

    source.set_result(()).unwrap();

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn inline_callback_runs_on_the_completing_thread() {
    let source = CompletionSource::new();
    let task = source.task();
    let seen = Arc::new(Mutex::new(None));

    let slot = seen.clone();
    task.on_completed(Dispatch::Inline, move |_| {
        *slot.lock().unwrap() = Some(thread::current().id());
    });

    let completer = thread::spawn(move || {
        source.set_result(1).unwrap();
        thread::current().id()
    });
    let completer_id = completer.join().unwrap();

    assert_eq!(*seen.lock().unwrap(), Some(completer_id));
}

#[test]
fn registering_on_a_completed_task_runs_immediately() {
    let task = Task::from_result(1);
    let seen = Arc::new(Mutex::new(None));

    let slot = seen.clone();
    task.on_completed(Dispatch::Inline, move |t| {
        *slot.lock().unwrap() = Some((thread::current().id(), t.result().unwrap()));
    });

    assert_eq!(*seen.lock().unwrap(), Some((thread::current().id(), 1)));
}

#[test]
fn rescheduled_continuation_runs_on_the_registering_pool() {
    let pool = PoolBuilder::new()
        .worker_threads(1)
        .thread_name("resched")
        .build();

    let source = CompletionSource::new();
    let antecedent = source.task();

    let continuation = pool.block_on(async move {
        antecedent.continue_with(|_| thread::current().name().unwrap_or_default().to_string())
    });

    source.set_result(()).unwrap();

    let name = continuation.result().unwrap();
    assert!(name.starts_with("resched-worker-"), "{name}");
}

#[test]
fn panicking_callback_does_not_stop_the_others() {
    let source = CompletionSource::new();
    let task = source.task();
    let ran = Arc::new(Mutex::new(false));

    task.on_completed(Dispatch::Inline, |_| panic!("callback failed"));

    let flag = ran.clone();
    task.on_completed(Dispatch::Inline, move |_| *flag.lock().unwrap() = true);

    assert!(source.try_set_result(()));
    assert!(*ran.lock().unwrap());
}

#[test]
fn rescheduled_continuation_falls_back_inline_after_shutdown() {
    let pool = PoolBuilder::new().worker_threads(1).build();

    let source = CompletionSource::new();
    let antecedent = source.task();

    let continuation = pool.block_on(async move { antecedent.continue_with(|t| t.result().unwrap() + 1) });

    pool.shutdown();
    source.set_result(1).unwrap();

    assert_eq!(continuation.result().unwrap(), 2);
}

#[test]
fn rescheduled_callbacks_start_in_registration_order() {
    common::init_tracing();

    let pool = PoolBuilder::new().worker_threads(1).build();
    let order = Arc::new(Mutex::new(Vec::new()));

    let recorded = order.clone();
    pool.spawn(move || {
        let source = CompletionSource::new();
        let task = source.task();

        for i in 0..5 {
            let order = recorded.clone();
            task.on_completed(Dispatch::Rescheduled, move |_| order.lock().unwrap().push(i));
        }

        source.set_result(()).unwrap();
    })
    .wait()
    .unwrap();

    assert!(common::eventually(Duration::from_secs(5), || {
        order.lock().unwrap().len() == 5
    }));
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn late_inline_callbacks_run_in_registration_order() {
    let task = Task::from_result(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..3 {
        let order = order.clone();
        task.on_completed(Dispatch::Inline, move |_| order.lock().unwrap().push(i));
    }

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn late_rescheduled_callbacks_from_a_worker_start_in_registration_order() {
    let pool = PoolBuilder::new().worker_threads(1).build();
    let order = Arc::new(Mutex::new(Vec::new()));

    let recorded = order.clone();
    pool.spawn(move || {
        let task = Task::from_result(1);

        for i in 0..5 {
            let order = recorded.clone();
            task.on_completed(Dispatch::Rescheduled, move |_| order.lock().unwrap().push(i));
        }
    })
    .wait()
    .unwrap();

    assert!(common::eventually(Duration::from_secs(5), || {
        order.lock().unwrap().len() == 5
    }));
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}
