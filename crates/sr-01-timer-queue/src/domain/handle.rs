//! Timer identity.

use std::fmt;
use tokio::time::Instant;

/// Sequence number assigned at scheduling time.
///
/// Strictly increasing per queue, so it doubles as the FIFO tie-breaker for
/// timers sharing a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) u64);

impl TimerId {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Returned by `schedule`; pass it back to `cancel`.
///
/// Holding a handle does not keep the timer alive and dropping it does not
/// cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    pub(crate) id: TimerId,
    pub(crate) fire_at: Instant,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Earliest instant at which the callback may run.
    pub fn fire_at(&self) -> Instant {
        self.fire_at
    }
}
