use std::fmt;

/// Task exists but has not been handed to a scheduler yet.
pub(crate) const CREATED: u8 = 0;

/// Task is waiting in a run queue, or waiting for an external completer.
pub(crate) const SCHEDULED: u8 = 1;

/// Task work is currently executing.
///
/// At most one thread may observe this state as its own at a time.
pub(crate) const RUNNING: u8 = 2;

/// Work returned a value. Terminal.
pub(crate) const RAN_TO_COMPLETION: u8 = 3;

/// Work failed and the fault was captured. Terminal.
pub(crate) const FAULTED: u8 = 4;

/// Task was canceled before or during execution. Terminal.
pub(crate) const CANCELED: u8 = 5;

/// Lifecycle status of a task.
///
/// `Created -> Scheduled -> Running` is the only forward path before one of
/// the three terminal states. Once terminal, the status never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Created but not yet scheduled.
    Created,

    /// Queued on a pool, or awaiting completion by a
    /// [`CompletionSource`](crate::CompletionSource).
    Scheduled,

    /// Currently executing.
    Running,

    /// Completed with a value.
    RanToCompletion,

    /// Completed with one or more faults.
    Faulted,

    /// Canceled.
    Canceled,
}

impl Status {
    /// Returns `true` for `RanToCompletion`, `Faulted` and `Canceled`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::RanToCompletion | Status::Faulted | Status::Canceled
        )
    }

    pub(crate) fn from_raw(raw: u8) -> Self {
        match raw {
            CREATED => Status::Created,
            SCHEDULED => Status::Scheduled,
            RUNNING => Status::Running,
            RAN_TO_COMPLETION => Status::RanToCompletion,
            FAULTED => Status::Faulted,
            CANCELED => Status::Canceled,
            _ => unreachable!("invalid task state {raw}"),
        }
    }

    pub(crate) fn as_raw(self) -> u8 {
        match self {
            Status::Created => CREATED,
            Status::Scheduled => SCHEDULED,
            Status::Running => RUNNING,
            Status::RanToCompletion => RAN_TO_COMPLETION,
            Status::Faulted => FAULTED,
            Status::Canceled => CANCELED,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Created => "created",
            Status::Scheduled => "scheduled",
            Status::Running => "running",
            Status::RanToCompletion => "ran to completion",
            Status::Faulted => "faulted",
            Status::Canceled => "canceled",
        };

        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_encoding_round_trips_every_status() {
        for raw in CREATED..=CANCELED {
            assert_eq!(Status::from_raw(raw).as_raw(), raw);
        }
    }

    #[test]
    fn only_outcomes_are_terminal() {
        assert!(!Status::Created.is_terminal());
        assert!(!Status::Scheduled.is_terminal());
        assert!(!Status::Running.is_terminal());
        assert!(Status::RanToCompletion.is_terminal());
        assert!(Status::Faulted.is_terminal());
        assert!(Status::Canceled.is_terminal());
    }
}
