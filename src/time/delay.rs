use super::timer::Timer;
use crate::runtime::task::{CompletionSource, Dispatch, Task};
use crate::sync::CancellationToken;

use std::time::Duration;

/// Returns a task that completes once `duration` elapses.
///
/// No thread is blocked while the delay is pending.
///
/// ```
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// pledge::time::delay(Duration::from_millis(20)).wait().unwrap();
///
/// assert!(start.elapsed() >= Duration::from_millis(20));
/// ```
pub fn delay(duration: Duration) -> Task<()> {
    let source = CompletionSource::new();
    let task = source.task();

    let timer = Timer::once(duration, move || {
        source.try_set_result(());
    });

    task.on_completed(Dispatch::Inline, move |_| timer.cancel());

    task
}

/// Like [`delay`], but ends `Canceled` if `token` is canceled first.
///
/// A token that is already canceled yields an already canceled task.
pub fn delay_with_cancel(duration: Duration, token: &CancellationToken) -> Task<()> {
    if token.is_canceled() {
        return Task::canceled();
    }

    let source = CompletionSource::new();
    let task = source.task();

    let timer = {
        let source = source.clone();

        Timer::once(duration, move || {
            source.try_set_result(());
        })
    };

    let registration = token.register(move || {
        source.try_set_canceled();
    });

    task.on_completed(Dispatch::Inline, move |_| {
        timer.cancel();
        drop(registration);
    });

    task
}
