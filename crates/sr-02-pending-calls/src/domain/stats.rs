//! Pending-call counters.

/// Snapshot of the table's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingStats {
    /// Calls registered
    pub registered: u64,
    /// Calls resolved with a reply
    pub completed: u64,
    /// Calls failed with an error (error reply or shutdown)
    pub failed: u64,
    /// Calls that hit their deadline
    pub timed_out: u64,
    /// Calls cancelled or abandoned by the caller
    pub cancelled: u64,
    /// Replies for ids that were not pending
    pub stale: u64,
    /// Registrations rejected because the id was live
    pub duplicates: u64,
    /// Calls currently awaiting a reply
    pub pending: usize,
}

impl PendingStats {
    /// Calls that reached a terminal state.
    pub fn settled(&self) -> u64 {
        self.completed + self.failed + self.timed_out + self.cancelled
    }
}
