mod core;
mod worker;

pub(crate) use self::core::Executor;
