use crate::sync::CancellationToken;

/// Where submitted work runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// On one of the pool's worker threads.
    #[default]
    Pooled,

    /// On a fresh thread of its own, for long-running or blocking work that
    /// would otherwise starve the pool.
    Dedicated,
}

/// Options for [`Handle::spawn_with`](crate::Handle::spawn_with).
#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    pub(crate) mode: ExecutionMode,
    pub(crate) token: Option<CancellationToken>,
}

impl SpawnOptions {
    /// Pooled execution with no cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chooses between a pool worker and a dedicated thread.
    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `mode(ExecutionMode::Dedicated)`.
    pub fn long_running(self) -> Self {
        self.mode(ExecutionMode::Dedicated)
    }

    /// Associates a cancellation token.
    ///
    /// If the token is canceled before the work starts, the work never runs
    /// and the task ends `Canceled`. Once running, the work receives the token
    /// and decides itself whether to stop.
    pub fn cancellation(mut self, token: &CancellationToken) -> Self {
        self.token = Some(token.clone());
        self
    }
}
