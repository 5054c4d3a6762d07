//! Per-invocation handler context.

use std::time::Duration;

use serde_json::Value;
use shared_types::{CorrelationId, DispatchError, PeerId};
use sr_01_timer_queue::TimerHandle;
use sr_02_pending_calls::{PendingReply, Reply};

use crate::service::dispatcher::Dispatcher;

/// Who sent the request being handled, and a way back into the dispatcher.
#[derive(Clone, Debug)]
pub struct HandlerContext {
    dispatcher: Dispatcher,
    sender: PeerId,
    msg_type: String,
    correlation_id: Option<CorrelationId>,
}

impl HandlerContext {
    pub(crate) fn new(
        dispatcher: Dispatcher,
        sender: PeerId,
        msg_type: String,
        correlation_id: Option<CorrelationId>,
    ) -> Self {
        Self {
            dispatcher,
            sender,
            msg_type,
            correlation_id,
        }
    }

    /// The peer the request came from; replies go here.
    pub fn sender(&self) -> &PeerId {
        &self.sender
    }

    pub fn msg_type(&self) -> &str {
        &self.msg_type
    }

    /// `None` for one-way messages.
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.correlation_id
    }

    pub fn expects_reply(&self) -> bool {
        self.correlation_id.is_some()
    }

    /// The peer this handler runs on.
    pub fn local_peer(&self) -> &PeerId {
        self.dispatcher.local_peer()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Call another peer and wait for its reply (default timeout).
    pub async fn call(
        &self,
        target: impl Into<PeerId>,
        msg_type: impl Into<String>,
        payload: Value,
    ) -> Result<Reply, DispatchError> {
        self.dispatcher.call(target, msg_type, payload).await
    }

    pub async fn call_with_timeout(
        &self,
        target: impl Into<PeerId>,
        msg_type: impl Into<String>,
        payload: Value,
        timeout: Duration,
    ) -> Result<Reply, DispatchError> {
        self.dispatcher
            .call_with_timeout(target, msg_type, payload, timeout)
            .await
    }

    /// Call another peer; a timeout yields `Ok(None)`.
    pub async fn call_or_none(
        &self,
        target: impl Into<PeerId>,
        msg_type: impl Into<String>,
        payload: Value,
        timeout: Duration,
    ) -> Result<Option<Reply>, DispatchError> {
        self.dispatcher
            .call_or_none(target, msg_type, payload, timeout)
            .await
    }

    /// Send a request without waiting for it yet.
    pub async fn send_request(
        &self,
        target: impl Into<PeerId>,
        msg_type: impl Into<String>,
        payload: Value,
        timeout: Duration,
    ) -> Result<PendingReply, DispatchError> {
        self.dispatcher
            .send_request(target, msg_type, payload, timeout)
            .await
    }

    pub async fn send_notify(
        &self,
        target: impl Into<PeerId>,
        msg_type: impl Into<String>,
        payload: Value,
    ) -> Result<(), DispatchError> {
        self.dispatcher.send_notify(target, msg_type, payload).await
    }

    pub fn after<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + 'static,
    {
        self.dispatcher.after(delay, callback)
    }

    /// Answer the request now, before the handler returns.
    ///
    /// Whatever the handler returns afterwards, error or reply, is dropped.
    /// `Ok(false)` for one-way messages or when already answered.
    pub async fn reply(
        &self,
        msg_type: impl Into<String>,
        payload: Value,
    ) -> Result<bool, DispatchError> {
        let Some(correlation_id) = self.correlation_id else {
            return Ok(false);
        };
        self.dispatcher
            .send_reply(&self.sender, correlation_id, msg_type, payload)
            .await
    }
}
