use crate::error::{Fault, OperationCanceled};
use crate::time::Timer;
use crate::utils::slab::Slab;

use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// A shareable request to stop work.
///
/// Cancellation is cooperative. Canceling a token never interrupts a
/// thread: work polls [`is_canceled`](Self::is_canceled) or
/// [`check`](Self::check), and other parties react through
/// [`register`](Self::register) callbacks.
///
/// Clones share the same state.
///
/// ```
/// use pledge::{CancellationToken, SpawnOptions, task};
///
/// let token = CancellationToken::new();
/// token.cancel();
///
/// let task = task::spawn_with(SpawnOptions::new().cancellation(&token), |_| {
///     Ok::<_, pledge::error::OperationCanceled>(1)
/// });
///
/// assert!(task.wait().unwrap_err().is_canceled());
/// ```
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    canceled: AtomicBool,
    callbacks: Mutex<Callbacks>,
}

/// Registered callbacks, tagged with a registration sequence number.
///
/// Slab keys are reused after a registration is dropped, so key order is not
/// registration order.
#[derive(Default)]
struct Callbacks {
    slab: Slab<(u64, Callback)>,
    next_seq: u64,
}

impl Callbacks {
    fn insert(&mut self, callback: Callback) -> usize {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.slab.insert((seq, callback))
    }

    fn remove(&mut self, key: usize) -> Option<Callback> {
        self.slab.try_remove(key).map(|(_, callback)| callback)
    }

    /// Removes every callback, oldest registration first.
    fn drain(&mut self) -> Vec<Callback> {
        let mut entries = self.slab.drain();
        entries.sort_unstable_by_key(|(seq, _)| *seq);

        entries.into_iter().map(|(_, callback)| callback).collect()
    }
}

impl CancellationToken {
    /// Creates a token that is not canceled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and runs every registered callback once.
    ///
    /// Callbacks run on the calling thread, in registration order. Later
    /// calls do nothing.
    pub fn cancel(&self) {
        let callbacks = {
            let mut callbacks = self.inner.callbacks.lock();

            if self.inner.canceled.swap(true, Ordering::AcqRel) {
                return;
            }

            callbacks.drain()
        };

        tracing::trace!(callbacks = callbacks.len(), "cancellation requested");

        for callback in callbacks {
            run_callback(callback);
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called on this token
    /// or any of its clones.
    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::Acquire)
    }

    /// Returns `Err(OperationCanceled)` once cancellation was requested.
    ///
    /// Returning that error from work cancels its task instead of faulting it.
    pub fn check(&self) -> Result<(), OperationCanceled> {
        if self.is_canceled() {
            Err(OperationCanceled)
        } else {
            Ok(())
        }
    }

    /// Registers `callback` to run when the token is canceled.
    ///
    /// Runs `callback` immediately if the token is already canceled. Dropping
    /// the returned [`Registration`] unregisters the callback.
    pub fn register<F>(&self, callback: F) -> Registration
    where
        F: FnOnce() + Send + 'static,
    {
        let mut callbacks = self.inner.callbacks.lock();

        if self.inner.canceled.load(Ordering::Acquire) {
            drop(callbacks);
            run_callback(Box::new(callback));

            return Registration::empty();
        }

        let key = callbacks.insert(Box::new(callback));

        Registration {
            inner: Arc::downgrade(&self.inner),
            key: Some(key),
        }
    }

    /// Cancels the token once `delay` elapses.
    pub fn cancel_after(&self, delay: Duration) -> Timer {
        let token = self.clone();

        Timer::once(delay, move || token.cancel())
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("canceled", &self.is_canceled())
            .finish()
    }
}

fn run_callback(callback: Callback) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
        tracing::error!(
            error = %Fault::from_panic(payload),
            "cancellation callback panicked"
        );
    }
}

/// Keeps a [`CancellationToken::register`] callback registered.
#[must_use = "dropping a Registration unregisters its callback"]
pub struct Registration {
    inner: Weak<TokenInner>,
    key: Option<usize>,
}

impl Registration {
    fn empty() -> Self {
        Self {
            inner: Weak::new(),
            key: None,
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration").field("key", &self.key).finish()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };

        if let Some(inner) = self.inner.upgrade() {
            let callback = inner.callbacks.lock().remove(key);
            drop(callback);
        }
    }
}
