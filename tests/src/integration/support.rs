//! # Test Fixtures
//!
//! Helpers that attach dispatchers to an [`InMemoryNetwork`] and run their
//! dispatch loops as local tasks. Every helper must be called inside a
//! `LocalSet`.

use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use shared_bus::InMemoryNetwork;
use sr_03_dispatcher::{
    DispatchMetrics, DispatchStats, Dispatcher, DispatcherConfig, HandlerContext, HandlerRegistry,
    HandlerReply, HandlerResult, MessageHandler,
};
use tokio::task::{JoinHandle, LocalSet};

/// Run `fut` to completion inside a fresh `LocalSet`.
pub async fn in_local<F: Future>(fut: F) -> F::Output {
    LocalSet::new().run_until(fut).await
}

/// A dispatcher whose loop runs on a local task.
pub struct Peer {
    pub dispatcher: Dispatcher,
    pub task: JoinHandle<DispatchStats>,
}

pub fn spawn_peer(network: &InMemoryNetwork, name: &str, registry: HandlerRegistry) -> Peer {
    spawn_peer_with(network, name, DispatcherConfig::new(registry))
}

pub fn spawn_peer_with_metrics(
    network: &InMemoryNetwork,
    name: &str,
    registry: HandlerRegistry,
    metrics: Rc<dyn DispatchMetrics>,
) -> Peer {
    spawn_peer_with(network, name, DispatcherConfig::new(registry).with_metrics(metrics))
}

pub fn spawn_peer_with(network: &InMemoryNetwork, name: &str, config: DispatcherConfig) -> Peer {
    let (transport, inbound) = network.attach(name);
    let dispatcher = Dispatcher::new(config, Rc::new(transport));
    let runner = dispatcher.clone();
    let task = tokio::task::spawn_local(async move { runner.run(inbound).await });
    Peer { dispatcher, task }
}

/// Replies `reply_type` with the request payload after `delay`.
pub struct Delayed {
    pub delay: Duration,
    pub reply_type: &'static str,
}

#[async_trait(?Send)]
impl MessageHandler for Delayed {
    async fn handle(&self, _ctx: HandlerContext, _msg_type: &str, payload: Value) -> HandlerResult {
        tokio::time::sleep(self.delay).await;
        HandlerReply::ok(self.reply_type, payload)
    }
}

/// Fails every request with `message`.
pub struct Failing(pub &'static str);

#[async_trait(?Send)]
impl MessageHandler for Failing {
    async fn handle(&self, _ctx: HandlerContext, _msg_type: &str, _payload: Value) -> HandlerResult {
        Err(anyhow::anyhow!(self.0))
    }
}

/// Panics on every request.
pub struct Panicking;

#[async_trait(?Send)]
impl MessageHandler for Panicking {
    async fn handle(&self, _ctx: HandlerContext, _msg_type: &str, _payload: Value) -> HandlerResult {
        panic!("script engine crashed")
    }
}
