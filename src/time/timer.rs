use crate::error::Fault;

use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{self, AtomicBool, AtomicU64};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// State shared by a [`Timer`] handle and its heap entry.
struct TimerState {
    canceled: AtomicBool,

    /// Taken exactly once, either by the driver when the timer fires or by
    /// [`Timer::cancel`].
    callback: Mutex<Option<Callback>>,
}

impl TimerState {
    fn take_callback(&self) -> Option<Callback> {
        self.callback.lock().take()
    }
}

struct TimerEntry {
    deadline: Instant,

    /// Registration order, breaks ties between equal deadlines.
    seq: u64,
    state: Arc<TimerState>,
}

impl TimerEntry {
    fn is_canceled(&self) -> bool {
        self.state.canceled.load(atomic::Ordering::Acquire)
    }
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline.eq(&other.deadline) && self.seq.eq(&other.seq)
    }
}

// Reversed so that `BinaryHeap` pops the earliest deadline first.
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Messages understood by the timer driver.
enum Command {
    /// Adds an entry to the heap.
    Schedule(TimerEntry),

    /// A timer was canceled; its entry is now dead weight in the heap.
    Cancel,
}

static DRIVER: OnceLock<Sender<Command>> = OnceLock::new();
static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

fn driver() -> &'static Sender<Command> {
    DRIVER.get_or_init(|| {
        let (tx, rx) = mpsc::channel();

        thread::Builder::new()
            .name("pledge-timer".to_string())
            .spawn(move || Driver::new().run(rx))
            .unwrap_or_else(|error| panic!("failed to spawn timer thread: {error}"));

        tx
    })
}

/// The timer thread state: a deadline min-heap and a count of canceled
/// entries still sitting in it.
struct Driver {
    heap: BinaryHeap<TimerEntry>,
    dead: usize,
}

impl Driver {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            dead: 0,
        }
    }

    /// Sleeps until the earliest deadline or the next command.
    fn run(mut self, rx: Receiver<Command>) {
        tracing::debug!("timer driver started");

        loop {
            let received = match self.heap.peek() {
                Some(TimerEntry { deadline, .. }) => {
                    rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(Command::Schedule(entry)) => self.heap.push(entry),
                Ok(Command::Cancel) => self.on_cancel(),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            self.fire_due();
        }

        tracing::debug!(pending = self.heap.len(), "timer driver stopped");
    }

    /// Drops canceled entries once they make up half of the heap.
    fn on_cancel(&mut self) {
        self.dead += 1;

        if self.dead * 2 >= self.heap.len() {
            self.heap.retain(|entry| !entry.is_canceled());
            self.dead = 0;
        }
    }

    /// Runs every callback whose deadline has passed, on this thread.
    ///
    /// Callbacks are expected to be short: completing a source, canceling a
    /// token. Anything heavier is handed to a pool by the callback itself.
    fn fire_due(&mut self) {
        let now = Instant::now();

        while self.heap.peek().is_some_and(|entry| entry.deadline <= now) {
            let Some(entry) = self.heap.pop() else {
                break;
            };

            if entry.is_canceled() {
                continue;
            }

            if let Some(callback) = entry.state.take_callback() {
                run_callback(callback);
            }
        }
    }
}

fn run_callback(callback: Callback) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
        tracing::error!(
            error = %Fault::from_panic(payload),
            "timer callback panicked"
        );
    }
}

/// A one-shot timer.
///
/// All timers share one driver thread that sleeps until the earliest
/// deadline; no thread sleeps per timer and no pool worker is occupied while
/// a timer is pending. The callback runs on the driver thread, so it should
/// only hand off work: complete a [`CompletionSource`](crate::CompletionSource),
/// cancel a token, or spawn onto a pool.
///
/// Dropping a `Timer` does not cancel it.
///
/// # Examples
///
/// ```
/// use pledge::CompletionSource;
/// use pledge::time::Timer;
/// use std::time::Duration;
///
/// let source = CompletionSource::new();
/// let task = source.task();
///
/// Timer::once(Duration::from_millis(5), move || {
///     source.try_set_result("fired");
/// });
///
/// assert_eq!(task.result().unwrap(), "fired");
/// ```
#[derive(Clone)]
pub struct Timer {
    deadline: Instant,
    state: Arc<TimerState>,
}

impl Timer {
    /// Runs `callback` once `delay` elapses.
    ///
    /// # Arguments
    ///
    /// * `delay` - Time from now until the callback runs.
    /// * `callback` - Invoked at most once, on the timer thread. A panic is
    ///   caught and logged.
    pub fn once<F>(delay: Duration, callback: F) -> Timer
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let state = Arc::new(TimerState {
            canceled: AtomicBool::new(false),
            callback: Mutex::new(Some(Box::new(callback))),
        });

        let entry = TimerEntry {
            deadline,
            seq: NEXT_SEQ.fetch_add(1, atomic::Ordering::Relaxed),
            state: state.clone(),
        };

        if driver().send(Command::Schedule(entry)).is_err() {
            tracing::error!("timer driver is gone, timer will never fire");
        }

        Timer { deadline, state }
    }

    /// Prevents the callback from running if it has not started yet.
    ///
    /// The callback, and everything it captured, is dropped right away.
    /// Canceling twice, or after the timer fired, does nothing.
    pub fn cancel(&self) {
        if self.state.canceled.swap(true, atomic::Ordering::AcqRel) {
            return;
        }

        let callback = self.state.take_callback();

        if callback.is_some() {
            drop(callback);
            let _ = driver().send(Command::Cancel);
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called on this timer
    /// or one of its clones.
    pub fn is_canceled(&self) -> bool {
        self.state.canceled.load(atomic::Ordering::Acquire)
    }

    /// The instant at which the callback becomes due.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("deadline", &self.deadline)
            .field("canceled", &self.is_canceled())
            .finish()
    }
}
