//! Cooperative cancellation.

mod cancel;

pub use cancel::{CancellationToken, Registration};
