//! Prometheus metrics for the dispatch core.
//!
//! All metrics follow the naming convention: `sr_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    /// Requests and notifications handed to the transport
    pub static ref MESSAGES_SENT: CounterVec = CounterVec::new(
        Opts::new("sr_dispatch_messages_sent_total", "Messages sent by the dispatcher"),
        &["kind"]  // kind: request/notify/reply
    ).expect("metric creation failed");

    /// Replies matched to a live pending call
    pub static ref RESPONSES_MATCHED: Counter = Counter::new(
        "sr_pending_responses_matched_total",
        "Replies that resolved or failed a pending call"
    ).expect("metric creation failed");

    /// Replies whose correlation id was no longer pending
    pub static ref STALE_RESPONSES: Counter = Counter::new(
        "sr_pending_stale_responses_total",
        "Replies discarded because no call was pending"
    ).expect("metric creation failed");

    /// Outbound calls that hit their deadline
    pub static ref CALL_TIMEOUTS: Counter = Counter::new(
        "sr_pending_timeouts_total",
        "Outbound calls failed by timeout"
    ).expect("metric creation failed");

    /// Calls currently awaiting a reply
    pub static ref PENDING_CALLS: Gauge = Gauge::new(
        "sr_pending_calls",
        "Outbound calls currently awaiting a reply"
    ).expect("metric creation failed");

    // =========================================================================
    // INBOUND
    // =========================================================================

    /// Requests received, by message type
    pub static ref REQUESTS_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("sr_dispatch_requests_received_total", "Inbound requests"),
        &["msg_type"]
    ).expect("metric creation failed");

    /// Requests with no registered handler
    pub static ref UNHANDLED_REQUESTS: Counter = Counter::new(
        "sr_dispatch_unhandled_total",
        "Inbound requests with no handler for their namespace"
    ).expect("metric creation failed");

    /// Handler failures, by reported kind
    pub static ref HANDLER_FAILURES: CounterVec = CounterVec::new(
        Opts::new("sr_dispatch_handler_failures_total", "Handlers that errored or panicked"),
        &["kind"]  // kind: timeout/handler_failure
    ).expect("metric creation failed");

    /// Handler run time
    pub static ref HANDLER_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "sr_dispatch_handler_duration_seconds",
            "Time from handler start to its result"
        ).buckets(exponential_buckets(0.0001, 2.0, 16).expect("valid buckets")),
        &["msg_type"]
    ).expect("metric creation failed");

    // =========================================================================
    // TIMERS
    // =========================================================================

    /// Timer callbacks fired
    pub static ref TIMERS_FIRED: Counter = Counter::new(
        "sr_timer_fired_total",
        "Timer callbacks invoked"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Outbound
        Box::new(MESSAGES_SENT.clone()),
        Box::new(RESPONSES_MATCHED.clone()),
        Box::new(STALE_RESPONSES.clone()),
        Box::new(CALL_TIMEOUTS.clone()),
        Box::new(PENDING_CALLS.clone()),
        // Inbound
        Box::new(REQUESTS_RECEIVED.clone()),
        Box::new(UNHANDLED_REQUESTS.clone()),
        Box::new(HANDLER_FAILURES.clone()),
        Box::new(HANDLER_DURATION.clone()),
        // Timers
        Box::new(TIMERS_FIRED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
