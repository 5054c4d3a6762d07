//! Prometheus adapter for the dispatcher's metrics port.

use std::time::Duration;

use shared_types::RemoteErrorKind;
use sr_03_dispatcher::DispatchMetrics;

use crate::metrics::{
    CALL_TIMEOUTS, HANDLER_DURATION, HANDLER_FAILURES, MESSAGES_SENT, PENDING_CALLS,
    REQUESTS_RECEIVED, RESPONSES_MATCHED, STALE_RESPONSES, TIMERS_FIRED, UNHANDLED_REQUESTS,
};

/// Records dispatcher events into the global Prometheus registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusDispatchMetrics;

impl PrometheusDispatchMetrics {
    pub fn new() -> Self {
        Self
    }
}

impl DispatchMetrics for PrometheusDispatchMetrics {
    fn request_sent(&self, _msg_type: &str) {
        MESSAGES_SENT.with_label_values(&["request"]).inc();
    }

    fn notification_sent(&self, _msg_type: &str) {
        MESSAGES_SENT.with_label_values(&["notify"]).inc();
    }

    fn reply_sent(&self, _msg_type: &str) {
        MESSAGES_SENT.with_label_values(&["reply"]).inc();
    }

    fn request_received(&self, msg_type: &str) {
        REQUESTS_RECEIVED.with_label_values(&[msg_type]).inc();
    }

    fn response_matched(&self) {
        RESPONSES_MATCHED.inc();
    }

    fn stale_response(&self) {
        STALE_RESPONSES.inc();
    }

    fn unhandled(&self, _msg_type: &str) {
        UNHANDLED_REQUESTS.inc();
    }

    fn handler_completed(&self, msg_type: &str, elapsed: Duration) {
        HANDLER_DURATION
            .with_label_values(&[msg_type])
            .observe(elapsed.as_secs_f64());
    }

    fn handler_failed(&self, _msg_type: &str, kind: RemoteErrorKind) {
        HANDLER_FAILURES.with_label_values(&[kind.as_str()]).inc();
    }

    fn call_timed_out(&self) {
        CALL_TIMEOUTS.inc();
    }

    fn timer_fired(&self) {
        TIMERS_FIRED.inc();
    }

    fn pending_calls(&self, count: usize) {
        PENDING_CALLS.set(count as f64);
    }
}
