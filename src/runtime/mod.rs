mod executor;
mod park;
mod work_stealing;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod core;
pub mod task;

pub use park::block_on;
