//! # Telemetry Wiring
//!
//! The Prometheus adapter plugged into live dispatchers. Metrics live in a
//! process-wide registry shared by concurrently running tests, so assertions
//! compare deltas with `>=`.

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::time::Duration;

    use serde_json::json;
    use shared_bus::InMemoryNetwork;
    use sr_03_dispatcher::{handler_fn, HandlerRegistry, HandlerReply};
    use tokio::time::sleep;

    use relay_telemetry::metrics::{
        CALL_TIMEOUTS, MESSAGES_SENT, REQUESTS_RECEIVED, RESPONSES_MATCHED, TIMERS_FIRED,
        UNHANDLED_REQUESTS,
    };
    use relay_telemetry::{encode_metrics, register_metrics, PrometheusDispatchMetrics};

    use crate::integration::support::{in_local, spawn_peer_with_metrics, Delayed};

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_dispatch_events_reach_prometheus() {
        register_metrics().unwrap();

        in_local(async {
            let network = InMemoryNetwork::new();
            let metrics = Rc::new(PrometheusDispatchMetrics::new());
            let registry = HandlerRegistry::new()
                .with_handler(
                    "metrics.Echo",
                    handler_fn(|_ctx, _msg_type, payload| async move {
                        HandlerReply::ok("metrics.EchoAck", payload)
                    }),
                )
                .unwrap()
                .with_handler(
                    "metrics.Slow",
                    Delayed {
                        delay: Duration::from_millis(500),
                        reply_type: "metrics.SlowAck",
                    },
                )
                .unwrap();
            let _b = spawn_peer_with_metrics(&network, "B", registry, metrics.clone());
            let a = spawn_peer_with_metrics(&network, "A", HandlerRegistry::new(), metrics);

            let requests_before = MESSAGES_SENT.with_label_values(&["request"]).get();
            let received_before = REQUESTS_RECEIVED.with_label_values(&["metrics.Echo"]).get();
            let matched_before = RESPONSES_MATCHED.get();
            let timeouts_before = CALL_TIMEOUTS.get();
            let unhandled_before = UNHANDLED_REQUESTS.get();
            let timers_before = TIMERS_FIRED.get();

            a.dispatcher.call("B", "metrics.Echo", json!(1)).await.unwrap();
            let _ = a.dispatcher.call("B", "nowhere.Thing", json!(1)).await;
            let _ = a
                .dispatcher
                .call_with_timeout("B", "metrics.Slow", json!(1), Duration::from_millis(50))
                .await;
            a.dispatcher.after(Duration::from_millis(10), || {});
            sleep(Duration::from_millis(20)).await;

            assert!(MESSAGES_SENT.with_label_values(&["request"]).get() >= requests_before + 3.0);
            assert!(
                REQUESTS_RECEIVED.with_label_values(&["metrics.Echo"]).get() >= received_before + 1.0
            );
            assert!(RESPONSES_MATCHED.get() >= matched_before + 2.0);
            assert!(CALL_TIMEOUTS.get() >= timeouts_before + 1.0);
            assert!(UNHANDLED_REQUESTS.get() >= unhandled_before + 1.0);
            assert!(TIMERS_FIRED.get() >= timers_before + 1.0);
        })
        .await;

        let text = encode_metrics().unwrap();
        assert!(text.contains("sr_dispatch_messages_sent_total"));
        assert!(text.contains("sr_pending_timeouts_total"));
    }
}
