//! Timers and delays.

mod delay;
mod timer;

pub use delay::{delay, delay_with_cancel};
pub use timer::Timer;
