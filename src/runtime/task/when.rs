use super::continuation::Dispatch;
use super::handle::Task;
use super::source::CompletionSource;
use crate::error::Fault;

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Creates a task that completes once every task in `tasks` is terminal.
///
/// - If any input faulted, the result faults with all their faults, in input
///   order. Those faults count as observed.
/// - Otherwise, if any input was canceled, the result is canceled.
/// - Otherwise it completes with the values, in input order.
///
/// An empty input completes immediately with an empty `Vec`.
pub fn when_all<T, I>(tasks: I) -> Task<Vec<T>>
where
    T: Clone + Send + 'static,
    I: IntoIterator<Item = Task<T>>,
{
    let tasks: Vec<Task<T>> = tasks.into_iter().collect();

    if tasks.is_empty() {
        return Task::from_result(Vec::new());
    }

    let source = CompletionSource::new();
    let result = source.task();

    let remaining = Arc::new(AtomicUsize::new(tasks.len()));
    let inputs = Arc::new(tasks.clone());
    let source = Arc::new(Mutex::new(Some(source)));

    for task in &tasks {
        let remaining = remaining.clone();
        let inputs = inputs.clone();
        let source = source.clone();

        task.on_completed(Dispatch::Inline, move |_| {
            if remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
                return;
            }

            if let Some(source) = source.lock().take() {
                settle_all(&source, &inputs);
            }
        });
    }

    result
}

fn settle_all<T>(source: &CompletionSource<Vec<T>>, inputs: &[Task<T>])
where
    T: Clone + Send + 'static,
{
    let faults: Vec<Fault> = inputs
        .iter()
        .filter_map(Task::exception)
        .flat_map(|error| error.into_faults())
        .collect();

    if !faults.is_empty() {
        source.try_set_faults(faults);
        return;
    }

    if inputs.iter().any(Task::is_canceled) {
        source.try_set_canceled();
        return;
    }

    let values = inputs
        .iter()
        .map(Task::result)
        .collect::<Result<Vec<T>, _>>();

    match values {
        Ok(values) => {
            source.try_set_result(values);
        }
        Err(error) => {
            source.try_set_fault(error);
        }
    }
}

/// Creates a task that completes with the first task in `tasks` to become
/// terminal, whatever that task's outcome.
///
/// The returned task never faults because of its inputs; inspect the inner
/// task to learn how the winner ended. An empty input returns a faulted task.
pub fn when_any<T, I>(tasks: I) -> Task<Task<T>>
where
    T: Send + 'static,
    I: IntoIterator<Item = Task<T>>,
{
    let tasks: Vec<Task<T>> = tasks.into_iter().collect();

    if tasks.is_empty() {
        return Task::from_fault(Fault::msg("when_any requires at least one task"));
    }

    let source = CompletionSource::new();
    let result = source.task();

    for task in &tasks {
        let source = source.clone();

        task.on_completed(Dispatch::Inline, move |winner| {
            source.try_set_result(winner.clone());
        });
    }

    result
}
