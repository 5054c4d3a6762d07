//! Dispatcher counters.

use sr_01_timer_queue::TimerStats;
use sr_02_pending_calls::PendingStats;

/// Snapshot of a dispatcher's activity since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Outbound requests accepted by the transport
    pub requests_sent: u64,
    /// Outbound one-way messages accepted by the transport
    pub notifications_sent: u64,
    /// Replies sent, error replies included
    pub replies_sent: u64,
    /// Inbound requests, one-way included
    pub requests_received: u64,
    /// Inbound replies that settled a pending call
    pub responses_matched: u64,
    /// Inbound replies discarded as stale
    pub stale_responses: u64,
    /// Inbound requests with no handler
    pub unhandled: u64,
    /// Handler runs that errored or panicked
    pub handler_failures: u64,
    /// Inbound requests awaiting their handler's reply
    pub in_flight: usize,
    /// Pending-call table counters
    pub pending: PendingStats,
    /// Timer queue counters
    pub timers: TimerStats,
}
