//! Dispatcher.
//!
//! Routes inbound messages: replies go to the pending-call table, requests
//! go to the handler registered for their namespace. Handlers run as local
//! tasks, so the dispatcher keeps routing while a handler awaits its own
//! outbound calls.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;
use shared_bus::{InboundQueue, Transport};
use shared_types::{
    CorrelationId, DispatchError, Envelope, Message, MessageKind, PeerId, RemoteError,
    ERROR_REPLY_TYPE,
};
use sr_01_timer_queue::{TimerHandle, TimerQueue};
use sr_02_pending_calls::{CallInfo, PendingCallTable, PendingReply, Reply};
use tracing::{debug, info, warn};

use crate::domain::{DispatchStats, DispatcherConfig, HandlerRegistry, InboundOutcome};
use crate::ports::DispatchMetrics;
use crate::service::context::HandlerContext;

pub(crate) struct DispatcherInner {
    pub(crate) local: PeerId,
    pub(crate) transport: Rc<dyn Transport>,
    pub(crate) registry: HandlerRegistry,
    pub(crate) timers: TimerQueue,
    pub(crate) pending: PendingCallTable,
    /// Inbound requests that may still be answered, keyed by sender and id.
    pub(crate) in_flight: RefCell<HashSet<(PeerId, CorrelationId)>>,
    pub(crate) default_timeout: Duration,
    pub(crate) metrics: Rc<dyn DispatchMetrics>,
    pub(crate) stats: RefCell<DispatchStats>,
}

/// Message dispatcher for one peer.
///
/// Cheap to clone; clones share state. `!Send`: create it, and drive it,
/// inside a `tokio::task::LocalSet`.
#[derive(Clone)]
pub struct Dispatcher {
    pub(crate) inner: Rc<DispatcherInner>,
}

impl Dispatcher {
    /// Create a dispatcher sending through `transport`.
    pub fn new(config: DispatcherConfig, transport: Rc<dyn Transport>) -> Self {
        let timers = TimerQueue::new();
        let pending = PendingCallTable::new(timers.clone());

        let metrics = config.metrics.clone();
        pending.set_timeout_hook(move |_| metrics.call_timed_out());

        let local = transport.local_peer().clone();
        info!(
            peer = %local,
            namespaces = ?config.registry.namespaces(),
            default_timeout_ms = config.default_timeout.as_millis() as u64,
            "Dispatcher created"
        );

        Self {
            inner: Rc::new(DispatcherInner {
                local,
                transport,
                registry: config.registry,
                timers,
                pending,
                in_flight: RefCell::new(HashSet::new()),
                default_timeout: config.default_timeout,
                metrics: config.metrics,
                stats: RefCell::new(DispatchStats::default()),
            }),
        }
    }

    /// The peer this dispatcher sends as.
    pub fn local_peer(&self) -> &PeerId {
        &self.inner.local
    }

    pub fn default_timeout(&self) -> Duration {
        self.inner.default_timeout
    }

    /// Timer queue shared by `after` and the pending-call deadlines.
    pub fn timers(&self) -> &TimerQueue {
        &self.inner.timers
    }

    pub fn pending(&self) -> &PendingCallTable {
        &self.inner.pending
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    /// Route one inbound message.
    ///
    /// Replies settle their pending call and never reach a handler. Requests
    /// are handed to their namespace's handler on a new local task; this
    /// returns without waiting for it.
    ///
    /// # Panics
    ///
    /// Dispatching a request outside a `LocalSet` panics.
    pub async fn on_inbound(&self, from: PeerId, message: Message) -> InboundOutcome {
        match message.kind {
            MessageKind::Reply => self.on_reply(from, message),
            MessageKind::Request => self.on_request(from, message).await,
        }
    }

    fn on_reply(&self, from: PeerId, message: Message) -> InboundOutcome {
        let Some(correlation_id) = message.correlation_id else {
            warn!(
                from = %from,
                msg_type = %message.msg_type,
                "Reply without correlation id discarded"
            );
            return InboundOutcome::Discarded;
        };

        let matched = match message.remote_error() {
            Some(decoded) => {
                let error = match decoded {
                    Ok(remote) => DispatchError::from_remote(correlation_id, remote),
                    Err(e) => DispatchError::MalformedReply(e.to_string()),
                };
                self.inner.pending.fail(correlation_id, error)
            }
            None => self
                .inner
                .pending
                .resolve(correlation_id, Reply::new(message.msg_type.clone(), message.payload)),
        };

        if matched {
            self.inner.stats.borrow_mut().responses_matched += 1;
            self.inner.metrics.response_matched();
            self.inner
                .metrics
                .pending_calls(self.inner.pending.pending_count());
            InboundOutcome::Resolved(correlation_id)
        } else {
            self.inner.stats.borrow_mut().stale_responses += 1;
            self.inner.metrics.stale_response();
            warn!(
                from = %from,
                correlation_id = %correlation_id,
                msg_type = %message.msg_type,
                "Stale response discarded"
            );
            InboundOutcome::Stale(correlation_id)
        }
    }

    async fn on_request(&self, from: PeerId, message: Message) -> InboundOutcome {
        self.inner.stats.borrow_mut().requests_received += 1;
        self.inner.metrics.request_received(&message.msg_type);

        let resolved = self
            .inner
            .registry
            .resolve(&message.msg_type)
            .map(|(namespace, handler)| (namespace.to_string(), Rc::clone(handler)));

        let Some((namespace, handler)) = resolved else {
            self.inner.stats.borrow_mut().unhandled += 1;
            self.inner.metrics.unhandled(&message.msg_type);
            warn!(
                from = %from,
                msg_type = %message.msg_type,
                correlation_id = ?message.correlation_id,
                "No handler registered for message type"
            );

            if let Some(correlation_id) = message.correlation_id {
                let error = RemoteError::unhandled(&message.msg_type);
                let reply = Message::error_reply(correlation_id, &error);
                if self.send_message(from, reply).await.is_ok() {
                    self.inner.stats.borrow_mut().replies_sent += 1;
                    self.inner.metrics.reply_sent(ERROR_REPLY_TYPE);
                }
            }
            return InboundOutcome::Unhandled;
        };

        if let Some(correlation_id) = message.correlation_id {
            let fresh = self
                .inner
                .in_flight
                .borrow_mut()
                .insert((from.clone(), correlation_id));
            if !fresh {
                warn!(
                    from = %from,
                    correlation_id = %correlation_id,
                    msg_type = %message.msg_type,
                    "Duplicate request for an in-flight correlation id discarded"
                );
                return InboundOutcome::Discarded;
            }
        }

        debug!(
            from = %from,
            msg_type = %message.msg_type,
            namespace = %namespace,
            correlation_id = ?message.correlation_id,
            "Dispatching request"
        );

        let ctx = HandlerContext::new(
            self.clone(),
            from,
            message.msg_type.clone(),
            message.correlation_id,
        );
        let dispatcher = self.clone();
        tokio::task::spawn_local(async move {
            dispatcher
                .execute(handler, ctx, message.msg_type, message.payload)
                .await;
        });

        InboundOutcome::Dispatched
    }

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    /// Send a request and register it as pending.
    ///
    /// The returned future resolves with the reply, or fails with `Timeout`
    /// if none arrives within `timeout`. If the transport refuses the
    /// request, the entry is removed and the transport error returned.
    pub async fn send_request(
        &self,
        target: impl Into<PeerId>,
        msg_type: impl Into<String>,
        payload: Value,
        timeout: Duration,
    ) -> Result<PendingReply, DispatchError> {
        let target = target.into();
        let msg_type = msg_type.into();
        let correlation_id = CorrelationId::new();

        let reply = self.inner.pending.register_call(
            correlation_id,
            timeout,
            CallInfo::new(target.clone(), msg_type.clone()),
        )?;

        let request = Message::request(msg_type.clone(), payload, correlation_id);
        if let Err(error) = self.send_message(target.clone(), request).await {
            self.inner.pending.cancel(correlation_id);
            return Err(error);
        }

        self.inner.stats.borrow_mut().requests_sent += 1;
        self.inner.metrics.request_sent(&msg_type);
        self.inner
            .metrics
            .pending_calls(self.inner.pending.pending_count());

        debug!(
            correlation_id = %correlation_id,
            target = %target,
            msg_type = %msg_type,
            timeout_ms = timeout.as_millis() as u64,
            "Sent request"
        );

        Ok(reply)
    }

    /// Send a request and wait for its reply, using the default timeout.
    pub async fn call(
        &self,
        target: impl Into<PeerId>,
        msg_type: impl Into<String>,
        payload: Value,
    ) -> Result<Reply, DispatchError> {
        self.call_with_timeout(target, msg_type, payload, self.inner.default_timeout)
            .await
    }

    /// Send a request and wait for its reply.
    pub async fn call_with_timeout(
        &self,
        target: impl Into<PeerId>,
        msg_type: impl Into<String>,
        payload: Value,
        timeout: Duration,
    ) -> Result<Reply, DispatchError> {
        self.send_request(target, msg_type, payload, timeout)
            .await?
            .await
    }

    /// Like [`call_with_timeout`](Self::call_with_timeout), but expiry of
    /// this call's own deadline yields `Ok(None)` instead of an error.
    ///
    /// A `Timeout` reported in the peer's error reply is still returned as
    /// an error.
    pub async fn call_or_none(
        &self,
        target: impl Into<PeerId>,
        msg_type: impl Into<String>,
        payload: Value,
        timeout: Duration,
    ) -> Result<Option<Reply>, DispatchError> {
        let mut pending = self.send_request(target, msg_type, payload, timeout).await?;
        match (&mut pending).await {
            Ok(reply) => Ok(Some(reply)),
            Err(DispatchError::Timeout { .. }) if pending.expired() => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Answer the request `correlation_id` received from `target`.
    ///
    /// At most one reply is sent per request: returns `Ok(false)` without
    /// sending if the request was already answered or never received.
    pub async fn send_reply(
        &self,
        target: impl Into<PeerId>,
        correlation_id: CorrelationId,
        msg_type: impl Into<String>,
        payload: Value,
    ) -> Result<bool, DispatchError> {
        let target = target.into();
        let msg_type = msg_type.into();

        if !self.release(&target, correlation_id) {
            debug!(
                target = %target,
                correlation_id = %correlation_id,
                msg_type = %msg_type,
                "Request already answered, reply dropped"
            );
            return Ok(false);
        }

        let reply = Message::reply(correlation_id, msg_type.clone(), payload);
        self.send_message(target.clone(), reply).await?;

        self.inner.stats.borrow_mut().replies_sent += 1;
        self.inner.metrics.reply_sent(&msg_type);
        debug!(
            target = %target,
            correlation_id = %correlation_id,
            msg_type = %msg_type,
            "Sent reply"
        );
        Ok(true)
    }

    /// Answer a request with an error-tagged reply. Same at-most-once rule
    /// as [`send_reply`](Self::send_reply).
    pub(crate) async fn send_error_reply(
        &self,
        target: &PeerId,
        correlation_id: CorrelationId,
        error: &RemoteError,
    ) -> Result<bool, DispatchError> {
        if !self.release(target, correlation_id) {
            debug!(
                target = %target,
                correlation_id = %correlation_id,
                "Request already answered, error reply dropped"
            );
            return Ok(false);
        }

        self.send_message(target.clone(), Message::error_reply(correlation_id, error))
            .await?;
        self.inner.stats.borrow_mut().replies_sent += 1;
        self.inner.metrics.reply_sent(ERROR_REPLY_TYPE);
        Ok(true)
    }

    /// Send a one-way message; the receiver never replies.
    pub async fn send_notify(
        &self,
        target: impl Into<PeerId>,
        msg_type: impl Into<String>,
        payload: Value,
    ) -> Result<(), DispatchError> {
        let target = target.into();
        let msg_type = msg_type.into();

        self.send_message(target.clone(), Message::notify(msg_type.clone(), payload))
            .await?;

        self.inner.stats.borrow_mut().notifications_sent += 1;
        self.inner.metrics.notification_sent(&msg_type);
        debug!(target = %target, msg_type = %msg_type, "Sent notification");
        Ok(())
    }

    /// Forget an in-flight request. Returns false if it was not in flight.
    pub(crate) fn release(&self, target: &PeerId, correlation_id: CorrelationId) -> bool {
        self.inner
            .in_flight
            .borrow_mut()
            .remove(&(target.clone(), correlation_id))
    }

    async fn send_message(&self, to: PeerId, message: Message) -> Result<(), DispatchError> {
        let envelope = Envelope::new(self.inner.local.clone(), to, message);
        self.inner.transport.send(envelope).await.map_err(|error| {
            warn!(from = %self.inner.local, error = %error, "Transport refused message");
            DispatchError::from(error)
        })
    }

    // =========================================================================
    // TIMERS
    // =========================================================================

    /// Run `callback` on the dispatch thread, no earlier than `delay` from now.
    pub fn after<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + 'static,
    {
        let metrics = self.inner.metrics.clone();
        self.inner.timers.schedule(delay, move || {
            metrics.timer_fired();
            callback();
        })
    }

    /// Cancel a timer from [`after`](Self::after). False if it already fired
    /// or was cancelled.
    pub fn cancel_timer(&self, handle: TimerHandle) -> bool {
        self.inner.timers.cancel(handle)
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Dispatch loop.
    ///
    /// Routes envelopes in arrival order and drives the timer queue. Returns
    /// once `inbound` is closed and drained, after failing every pending call
    /// with `Cancelled`.
    pub async fn run(&self, mut inbound: InboundQueue) -> DispatchStats {
        info!(peer = %self.inner.local, "Dispatcher running");

        let timers = self.inner.timers.clone();
        let driver = timers.run();
        tokio::pin!(driver);

        loop {
            tokio::select! {
                envelope = inbound.recv() => {
                    let Some(envelope) = envelope else {
                        break;
                    };
                    if envelope.to != self.inner.local {
                        warn!(
                            peer = %self.inner.local,
                            to = %envelope.to,
                            from = %envelope.from,
                            "Misrouted envelope discarded"
                        );
                        continue;
                    }
                    let outcome = self.on_inbound(envelope.from, envelope.message).await;
                    if let Some(error) = outcome.as_error() {
                        debug!(error = %error, "Inbound message not delivered");
                    }
                }
                _ = &mut driver => {}
            }
        }

        let cancelled = self.shutdown();
        let stats = self.stats();
        info!(
            peer = %self.inner.local,
            cancelled_calls = cancelled,
            requests_received = stats.requests_received,
            requests_sent = stats.requests_sent,
            "Dispatcher stopped"
        );
        stats
    }

    /// Fail every pending call with `Cancelled` and drop every timer.
    ///
    /// Later requests fail with `Cancelled` instead of waiting on a deadline
    /// that no driver would fire. Returns the number of calls failed.
    pub fn shutdown(&self) -> usize {
        let failed = self.inner.pending.close();
        self.inner.timers.clear();
        self.inner.metrics.pending_calls(0);
        failed
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            in_flight: self.inner.in_flight.borrow().len(),
            pending: self.inner.pending.stats(),
            timers: self.inner.timers.stats(),
            ..*self.inner.stats.borrow()
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("local", &self.inner.local)
            .field("registry", &self.inner.registry)
            .field("pending", &self.inner.pending.pending_count())
            .finish_non_exhaustive()
    }
}
