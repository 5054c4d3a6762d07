//! # Failure Semantics
//!
//! Timeouts, stale responses, unhandled namespaces, handler errors and
//! panics, transport refusals and shutdown, observed across peers.

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    use serde_json::json;
    use shared_bus::{InMemoryNetwork, Transport};
    use shared_types::{
        CorrelationId, DispatchError, Envelope, Message, PeerId, TransportError,
    };
    use sr_03_dispatcher::{handler_fn, DispatcherConfig, HandlerRegistry, HandlerReply};
    use tokio::time::{sleep, Instant};

    use node_runtime::handlers::LOGIN_REQ;
    use node_runtime::ScriptServiceHandler;

    use crate::integration::support::{
        in_local, spawn_peer, spawn_peer_with, Delayed, Failing, Panicking,
    };

    fn ping_registry(delay: Duration) -> HandlerRegistry {
        HandlerRegistry::new()
            .with_handler(
                "Ping",
                Delayed {
                    delay,
                    reply_type: "Pong",
                },
            )
            .unwrap()
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_ping_times_out_and_late_pong_is_ignored() {
        in_local(async {
            let network = InMemoryNetwork::new();
            let _b = spawn_peer(&network, "B", ping_registry(Duration::from_millis(500)));
            let a = spawn_peer(&network, "A", HandlerRegistry::new());

            let started = Instant::now();
            let err = a
                .dispatcher
                .call_with_timeout("B", "Ping", json!({}), Duration::from_millis(200))
                .await
                .unwrap_err();
            let elapsed = started.elapsed();

            assert!(matches!(err, DispatchError::Timeout { .. }));
            assert!(elapsed >= Duration::from_millis(200));
            assert!(elapsed <= Duration::from_millis(210));
            assert_eq!(a.dispatcher.pending().pending_count(), 0);

            sleep(Duration::from_millis(400)).await;
            let stats = a.dispatcher.stats();
            assert_eq!(stats.stale_responses, 1);
            assert_eq!(stats.responses_matched, 0);
            assert_eq!(stats.pending.timed_out, 1);
            assert_eq!(stats.pending.stale, 1);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_duplicate_reply_is_discarded() {
        in_local(async {
            let network = InMemoryNetwork::new();
            let a = spawn_peer(&network, "A", HandlerRegistry::new());
            let (b, _b_inbound) = network.attach("B");

            let reply = a
                .dispatcher
                .send_request("B", "Ping", json!({}), Duration::from_secs(1))
                .await
                .unwrap();
            let id = reply.correlation_id();

            for n in 0..2 {
                b.send(Envelope::new(
                    PeerId::from("B"),
                    PeerId::from("A"),
                    Message::reply(id, "Pong", json!(n)),
                ))
                .await
                .unwrap();
            }

            let pong = reply.await.unwrap();
            assert_eq!(pong.payload, json!(0));

            sleep(Duration::from_millis(10)).await;
            let stats = a.dispatcher.stats();
            assert_eq!(stats.responses_matched, 1);
            assert_eq!(stats.stale_responses, 1);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_unhandled_namespace_never_invokes_a_handler() {
        in_local(async {
            let network = InMemoryNetwork::new();
            let calls = Rc::new(Cell::new(0));
            let counter = calls.clone();
            let registry = HandlerRegistry::new()
                .with_handler(
                    "chat",
                    handler_fn(move |_ctx, _msg_type, _payload| {
                        counter.set(counter.get() + 1);
                        async move { HandlerReply::none() }
                    }),
                )
                .unwrap();
            let b = spawn_peer(&network, "B", registry);
            let a = spawn_peer(&network, "A", HandlerRegistry::new());

            let err = a
                .dispatcher
                .call("B", "game.Move", json!({}))
                .await
                .unwrap_err();

            match err {
                DispatchError::Unhandled { message } => assert!(message.contains("game.Move")),
                other => panic!("expected Unhandled, got {other:?}"),
            }
            assert_eq!(calls.get(), 0);
            assert_eq!(b.dispatcher.stats().unhandled, 1);
            assert_eq!(b.dispatcher.stats().replies_sent, 1);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_handler_error_and_panic_become_handler_failure() {
        in_local(async {
            let network = InMemoryNetwork::new();
            let registry = ping_registry(Duration::ZERO)
                .with_handler("db", Failing("row not found"))
                .unwrap()
                .with_handler("script", Panicking)
                .unwrap();
            let b = spawn_peer(&network, "B", registry);
            let a = spawn_peer(&network, "A", HandlerRegistry::new());

            let err = a.dispatcher.call("B", "db.Get", json!({})).await.unwrap_err();
            assert_eq!(
                err,
                DispatchError::HandlerFailure {
                    message: "row not found".into()
                }
            );

            let err = a.dispatcher.call("B", "script.Run", json!({})).await.unwrap_err();
            assert!(matches!(err, DispatchError::HandlerFailure { .. }));

            // Still routing after the panic.
            let pong = a.dispatcher.call("B", "Ping", json!({})).await.unwrap();
            assert_eq!(pong.msg_type, "Pong");
            assert_eq!(b.dispatcher.stats().handler_failures, 2);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_downstream_timeout_travels_back_as_timeout() {
        in_local(async {
            let network = InMemoryNetwork::new();
            // TestService is attached but never answers.
            let (_test, _test_inbound) = network.attach("TestService");
            let registry = HandlerRegistry::new()
                .with_handler("", ScriptServiceHandler::new("TestService"))
                .unwrap();
            let _script = spawn_peer_with(
                &network,
                "ScriptService",
                DispatcherConfig::new(registry).with_default_timeout(Duration::from_millis(100)),
            );
            let console = spawn_peer(&network, "Console", HandlerRegistry::new());

            let err = console
                .dispatcher
                .call_with_timeout("ScriptService", LOGIN_REQ, json!({"value": "x"}), Duration::from_secs(1))
                .await
                .unwrap_err();

            assert!(err.is_timeout());
            match err {
                DispatchError::Timeout { detail, .. } => {
                    assert!(detail.contains("TestService"));
                }
                other => panic!("expected Timeout, got {other:?}"),
            }
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_send_to_unknown_peer_leaves_nothing_pending() {
        in_local(async {
            let network = InMemoryNetwork::new();
            let a = spawn_peer(&network, "A", HandlerRegistry::new());

            let err = a
                .dispatcher
                .call("Nobody", "Ping", json!({}))
                .await
                .unwrap_err();

            assert_eq!(
                err,
                DispatchError::Transport(TransportError::UnknownPeer(PeerId::from("Nobody")))
            );
            assert_eq!(a.dispatcher.pending().pending_count(), 0);
            assert_eq!(a.dispatcher.stats().requests_sent, 0);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_full_inbound_queue_is_reported() {
        in_local(async {
            let network = InMemoryNetwork::with_capacity(1);
            let a = spawn_peer(&network, "A", HandlerRegistry::new());
            let (_b, _b_inbound) = network.attach("B");

            a.dispatcher.send_notify("B", "Tick", json!(1)).await.unwrap();
            let err = a
                .dispatcher
                .send_notify("B", "Tick", json!(2))
                .await
                .unwrap_err();

            assert!(matches!(
                err,
                DispatchError::Transport(TransportError::QueueFull(_))
            ));
            assert_eq!(network.undelivered(), 1);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_closing_inbound_cancels_pending_calls() {
        in_local(async {
            let network = InMemoryNetwork::new();
            let _b = spawn_peer(&network, "B", ping_registry(Duration::from_secs(2)));
            let a = spawn_peer(&network, "A", HandlerRegistry::new());

            let first = a
                .dispatcher
                .send_request("B", "Ping", json!(1), Duration::from_secs(5))
                .await
                .unwrap();
            let second = a
                .dispatcher
                .send_request("B", "Ping", json!(2), Duration::from_secs(5))
                .await
                .unwrap();
            a.dispatcher.after(Duration::from_secs(1), || panic!("timer survived shutdown"));

            network.detach(&PeerId::from("A"));

            assert_eq!(first.await.unwrap_err(), DispatchError::Cancelled);
            assert_eq!(second.await.unwrap_err(), DispatchError::Cancelled);

            let stats = a.task.await.unwrap();
            assert_eq!(stats.pending.failed, 2);
            assert_eq!(stats.timers.live, 0);

            // Nothing would fire a new deadline, so new calls are refused.
            let err = a.dispatcher.call("B", "Ping", json!(3)).await.unwrap_err();
            assert_eq!(err, DispatchError::Cancelled);

            // Late pongs find nobody attached and are dropped by the network.
            sleep(Duration::from_secs(3)).await;
            assert!(network.undelivered() >= 2);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_registered_id_resolves_from_raw_reply() {
        in_local(async {
            let network = InMemoryNetwork::new();
            let a = spawn_peer(&network, "A", HandlerRegistry::new());
            let (b, _b_inbound) = network.attach("B");

            let id = CorrelationId::new();
            let pending = a
                .dispatcher
                .pending()
                .register(id, Duration::from_secs(1))
                .unwrap();
            assert!(matches!(
                a.dispatcher.pending().register(id, Duration::from_secs(1)),
                Err(DispatchError::DuplicateCorrelation(dup)) if dup == id
            ));

            b.send(Envelope::new(
                PeerId::from("B"),
                PeerId::from("A"),
                Message::reply(id, "Pong", json!("ok")),
            ))
            .await
            .unwrap();

            assert_eq!(pending.await.unwrap().payload, json!("ok"));
        })
        .await;
    }
}
