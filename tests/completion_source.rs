mod common;

use pledge::{CompletionError, CompletionSource, Fault, Status, TaskError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

#[test]
fn try_set_result_succeeds_once() {
    let source = CompletionSource::new();
    let task = source.task();

    assert_eq!(task.status(), Status::Scheduled);
    assert!(source.try_set_result(1));
    assert!(!source.try_set_result(2));

    assert_eq!(task.result().unwrap(), 1);
}

#[test]
fn set_result_twice_is_an_error() {
    let source = CompletionSource::new();
    let task = source.task();

    source.set_result("first").unwrap();

    assert_eq!(
        source.set_result("second"),
        Err(CompletionError::AlreadyCompleted(task.id()))
    );
    assert_eq!(
        source.set_canceled(),
        Err(CompletionError::AlreadyCompleted(task.id()))
    );
    assert_eq!(task.result().unwrap(), "first");
}

#[test]
fn set_faults_keeps_every_fault_in_order() {
    let source = CompletionSource::<()>::new();
    let task = source.task();

    source
        .set_faults([Fault::msg("disk"), Fault::msg("network")])
        .unwrap();

    let error = task.wait().unwrap_err();
    let messages: Vec<String> = error
        .faults()
        .unwrap()
        .faults()
        .iter()
        .map(Fault::to_string)
        .collect();

    assert_eq!(messages, ["disk", "network"]);
}

#[test]
fn canceled_source_rejects_later_results() {
    let source = CompletionSource::new();
    let task = source.task();

    source.set_canceled().unwrap();

    assert!(!source.try_set_result(3));
    assert!(!source.try_set_fault(Fault::msg("late")));
    assert!(matches!(task.result(), Err(TaskError::Canceled)));
}

#[test]
fn result_blocks_until_completed_from_another_thread() {
    common::init_tracing();
    let source = CompletionSource::new();
    let task = source.task();

    let completer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        source.set_result(99).unwrap();
    });

    assert_eq!(task.result().unwrap(), 99);
    completer.join().unwrap();
}

#[test]
fn exactly_one_racing_completer_wins() {
    let source = CompletionSource::new();
    let task = source.task();
    let winners = Arc::new(AtomicUsize::new(0));

    let threads: Vec<_> = (0..8)
        .map(|i| {
            let source = source.clone();
            let winners = winners.clone();

            thread::spawn(move || {
                if source.try_set_result(i) {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for thread in threads {
        thread.join().unwrap();
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    assert!((0..8).contains(&task.result().unwrap()));
}

#[test]
fn dropping_the_source_cancels_its_task() {
    let source = CompletionSource::<u8>::new();
    let task = source.task();

    drop(source);

    assert!(task.is_canceled());
}
