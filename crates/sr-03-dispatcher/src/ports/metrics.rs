//! Metrics port.
//!
//! The dispatcher reports every event through this trait; the default
//! implementation discards them. `relay-telemetry` provides a Prometheus
//! implementation.

use shared_types::RemoteErrorKind;
use std::time::Duration;

/// Sink for dispatcher events. All methods default to no-ops.
pub trait DispatchMetrics {
    fn request_sent(&self, _msg_type: &str) {}

    fn notification_sent(&self, _msg_type: &str) {}

    fn reply_sent(&self, _msg_type: &str) {}

    fn request_received(&self, _msg_type: &str) {}

    /// A reply settled a pending call.
    fn response_matched(&self) {}

    /// A reply arrived for an id that was not pending.
    fn stale_response(&self) {}

    fn unhandled(&self, _msg_type: &str) {}

    /// A handler returned, successfully or not.
    fn handler_completed(&self, _msg_type: &str, _elapsed: Duration) {}

    fn handler_failed(&self, _msg_type: &str, _kind: RemoteErrorKind) {}

    fn call_timed_out(&self) {}

    /// A timer scheduled through `Dispatcher::after` fired.
    fn timer_fired(&self) {}

    /// Number of outbound calls awaiting a reply changed.
    fn pending_calls(&self, _count: usize) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispatchMetrics;

impl DispatchMetrics for NoopDispatchMetrics {}
