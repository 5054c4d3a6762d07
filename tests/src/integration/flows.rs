//! # Dispatch Flows
//!
//! Request/reply across peers, handler chaining, concurrent calls and timer
//! ordering.
//!
//! ## Flows Tested
//!
//! 1. **Echo**: `Echo {n:5}` → `EchoAck {n:5}` tagged with the request's id
//! 2. **Chaining**: Console → ScriptService → TestService → back
//! 3. **Suspension**: a slow handler does not block routing of other messages
//! 4. **Timers**: `after` callbacks fire by deadline, FIFO on ties

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use serde_json::{json, Value};
    use shared_bus::{InMemoryNetwork, Transport};
    use shared_types::{CorrelationId, Envelope, Message, MessageKind, PeerId};
    use sr_03_dispatcher::{handler_fn, HandlerRegistry, HandlerReply};
    use tokio::time::{sleep, Instant};

    use node_runtime::handlers::script_service::SCRIPT_REPLY_VALUE;
    use node_runtime::handlers::{LoginPayload, LOGIN_REQ, LOGIN_RES, TEST_NAMESPACE};
    use node_runtime::{ScriptServiceHandler, TestServiceHandler};

    use crate::integration::support::{in_local, spawn_peer, Delayed};

    fn echo_registry() -> HandlerRegistry {
        HandlerRegistry::new()
            .with_handler(
                "Echo",
                handler_fn(|_ctx, _msg_type, payload| async move {
                    HandlerReply::ok("EchoAck", payload)
                }),
            )
            .unwrap()
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_echo_round_trip_keeps_correlation_id() {
        in_local(async {
            let network = InMemoryNetwork::new();
            let _b = spawn_peer(&network, "B", echo_registry());
            let (a, mut a_inbound) = network.attach("A");

            let id = CorrelationId::new();
            a.send(Envelope::new(
                PeerId::from("A"),
                PeerId::from("B"),
                Message::request("Echo", json!({"n": 5}), id),
            ))
            .await
            .unwrap();

            let reply = a_inbound.recv().await.unwrap().message;
            assert_eq!(reply.kind, MessageKind::Reply);
            assert_eq!(reply.msg_type, "EchoAck");
            assert_eq!(reply.payload, json!({"n": 5}));
            assert_eq!(reply.correlation_id, Some(id));
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_script_handler_chains_call_before_replying() {
        in_local(async {
            let network = InMemoryNetwork::new();
            let test = spawn_peer(
                &network,
                "TestService",
                HandlerRegistry::new()
                    .with_handler(TEST_NAMESPACE, TestServiceHandler)
                    .unwrap(),
            );
            let script = spawn_peer(
                &network,
                "ScriptService",
                HandlerRegistry::new()
                    .with_handler("", ScriptServiceHandler::new("TestService"))
                    .unwrap(),
            );
            let console = spawn_peer(&network, "Console", HandlerRegistry::new());

            let reply = console
                .dispatcher
                .call("ScriptService", LOGIN_REQ, LoginPayload::new("hello").to_value())
                .await
                .unwrap();

            assert_eq!(reply.msg_type, LOGIN_RES);
            assert_eq!(
                reply.decode::<LoginPayload>().unwrap(),
                LoginPayload::new(SCRIPT_REPLY_VALUE)
            );
            assert_eq!(script.dispatcher.stats().requests_sent, 1);
            assert_eq!(script.dispatcher.stats().replies_sent, 1);
            assert_eq!(test.dispatcher.stats().requests_received, 1);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_suspended_handler_does_not_block_routing() {
        in_local(async {
            let network = InMemoryNetwork::new();
            let registry = echo_registry()
                .with_handler(
                    "Slow",
                    Delayed {
                        delay: Duration::from_millis(300),
                        reply_type: "SlowAck",
                    },
                )
                .unwrap();
            let _b = spawn_peer(&network, "B", registry);
            let a = spawn_peer(&network, "A", HandlerRegistry::new());

            let started = Instant::now();
            let slow = a
                .dispatcher
                .send_request("B", "Slow", json!(1), Duration::from_secs(1))
                .await
                .unwrap();

            let fast = a.dispatcher.call("B", "Echo", json!(2)).await.unwrap();
            assert_eq!(fast.payload, json!(2));
            assert!(started.elapsed() < Duration::from_millis(300));
            assert!(a.dispatcher.pending().is_pending(&slow.correlation_id()));

            let slow = slow.await.unwrap();
            assert_eq!(slow.msg_type, "SlowAck");
            assert!(started.elapsed() >= Duration::from_millis(300));
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_concurrent_calls_resolve_out_of_order() {
        in_local(async {
            let network = InMemoryNetwork::new();
            let registry = HandlerRegistry::new()
                .with_handler(
                    "Wait",
                    handler_fn(|_ctx, _msg_type, payload: Value| async move {
                        let ms = payload.as_u64().unwrap_or(0);
                        sleep(Duration::from_millis(ms)).await;
                        HandlerReply::ok("Waited", payload)
                    }),
                )
                .unwrap();
            let _b = spawn_peer(&network, "B", registry);
            let a = spawn_peer(&network, "A", HandlerRegistry::new());

            let order = Rc::new(RefCell::new(Vec::new()));
            let long = {
                let order = order.clone();
                let d = a.dispatcher.clone();
                async move {
                    let reply = d.call("B", "Wait", json!(200)).await.unwrap();
                    order.borrow_mut().push(reply.payload);
                }
            };
            let short = {
                let order = order.clone();
                let d = a.dispatcher.clone();
                async move {
                    let reply = d.call("B", "Wait", json!(50)).await.unwrap();
                    order.borrow_mut().push(reply.payload);
                }
            };
            futures::join!(long, short);

            assert_eq!(*order.borrow(), vec![json!(50), json!(200)]);
            assert_eq!(a.dispatcher.stats().responses_matched, 2);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_timer_scenario_fires_b_before_a() {
        in_local(async {
            let network = InMemoryNetwork::new();
            let peer = spawn_peer(&network, "Scheduler", HandlerRegistry::new());
            let log = Rc::new(RefCell::new(Vec::new()));

            let sink = log.clone();
            peer.dispatcher
                .after(Duration::from_millis(100), move || sink.borrow_mut().push("A"));
            let sink = log.clone();
            peer.dispatcher
                .after(Duration::from_millis(50), move || sink.borrow_mut().push("B"));

            sleep(Duration::from_millis(75)).await;
            assert_eq!(*log.borrow(), vec!["B"]);
            sleep(Duration::from_millis(50)).await;
            assert_eq!(*log.borrow(), vec!["B", "A"]);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_equal_deadlines_fire_in_scheduling_order() {
        in_local(async {
            let network = InMemoryNetwork::new();
            let peer = spawn_peer(&network, "Scheduler", HandlerRegistry::new());
            let log = Rc::new(RefCell::new(Vec::new()));

            for i in 0..5 {
                let sink = log.clone();
                peer.dispatcher
                    .after(Duration::from_millis(10), move || sink.borrow_mut().push(i));
            }

            sleep(Duration::from_millis(20)).await;
            assert_eq!(*log.borrow(), vec![0, 1, 2, 3, 4]);
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_handler_defers_notification_with_timer() {
        in_local(async {
            let network = InMemoryNetwork::new();
            let registry = HandlerRegistry::new()
                .with_handler(
                    "Subscribe",
                    handler_fn(|ctx, _msg_type, _payload| async move {
                        let dispatcher = ctx.dispatcher().clone();
                        let subscriber = ctx.sender().clone();
                        ctx.after(Duration::from_millis(100), move || {
                            tokio::task::spawn_local(async move {
                                let _ = dispatcher
                                    .send_notify(subscriber, "Heartbeat", json!({}))
                                    .await;
                            });
                        });
                        HandlerReply::ok("Subscribed", Value::Null)
                    }),
                )
                .unwrap();
            let _b = spawn_peer(&network, "B", registry);

            let heartbeats = Rc::new(RefCell::new(0));
            let counter = heartbeats.clone();
            let a_registry = HandlerRegistry::new()
                .with_handler(
                    "Heartbeat",
                    handler_fn(move |_ctx, _msg_type, _payload| {
                        let counter = counter.clone();
                        async move {
                            *counter.borrow_mut() += 1;
                            HandlerReply::none()
                        }
                    }),
                )
                .unwrap();
            let a = spawn_peer(&network, "A", a_registry);

            let reply = a.dispatcher.call("B", "Subscribe", json!({})).await.unwrap();
            assert_eq!(reply.msg_type, "Subscribed");
            assert_eq!(*heartbeats.borrow(), 0);

            sleep(Duration::from_millis(150)).await;
            assert_eq!(*heartbeats.borrow(), 1);
        })
        .await;
    }
}
