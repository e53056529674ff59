mod common;

use pledge::task::{when_all, when_any};
use pledge::{CompletionSource, Fault, Task, TaskError, task};

#[test]
fn when_all_keeps_input_order() {
    common::init_tracing();

    let tasks: Vec<_> = (0..10).map(|i| task::spawn(move || i * i)).collect();

    let squares = when_all(tasks).result().unwrap();

    assert_eq!(squares, (0..10).map(|i| i * i).collect::<Vec<_>>());
}

#[test]
fn when_all_waits_for_every_input() {
    let first = CompletionSource::new();
    let second = CompletionSource::new();

    let all = when_all([first.task(), second.task()]);

    first.set_result('a').unwrap();
    assert!(!all.is_completed());

    second.set_result('b').unwrap();
    assert_eq!(all.result().unwrap(), vec!['a', 'b']);
}

#[test]
fn when_all_aggregates_every_fault() {
    let tasks = vec![
        Task::from_fault(Fault::msg("first")),
        Task::from_result(1),
        Task::from_fault(Fault::msg("second")),
    ];

    match when_all(tasks).result() {
        Err(TaskError::Faulted(error)) => {
            let messages: Vec<String> = error.faults().iter().map(Fault::to_string).collect();
            assert_eq!(messages, ["first", "second"]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn when_all_is_canceled_by_a_canceled_input() {
    let tasks = vec![Task::from_result(1), Task::canceled()];

    assert!(when_all(tasks).wait().unwrap_err().is_canceled());
}

#[test]
fn when_all_of_nothing_is_empty() {
    let all = when_all(Vec::<Task<u8>>::new());

    assert!(all.result().unwrap().is_empty());
}

#[test]
fn when_any_returns_the_first_finisher() {
    let slow = CompletionSource::<&str>::new();
    let fast = CompletionSource::<&str>::new();

    let any = when_any([slow.task(), fast.task()]);

    fast.set_result("fast").unwrap();
    let winner = any.result().unwrap();

    assert_eq!(winner.id(), fast.task().id());
    assert_eq!(winner.result().unwrap(), "fast");

    slow.set_result("slow").unwrap();
    assert_eq!(any.result().unwrap().id(), fast.task().id());
}

#[test]
fn when_any_of_nothing_faults() {
    let any = when_any(Vec::<Task<u8>>::new());

    assert!(any.wait().unwrap_err().faults().is_some());
}
