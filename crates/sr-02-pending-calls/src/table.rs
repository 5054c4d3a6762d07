//! Pending-Call Table.
//!
//! Maps correlation ids to callers awaiting a reply. Every registration
//! races a timer on the shared [`TimerQueue`]; whichever of reply, error,
//! timeout or cancellation comes first removes the entry, and everything
//! after it is stale.
//!
//! Flow:
//! 1. Dispatcher generates a `CorrelationId`
//! 2. Dispatcher calls `register()` and gets a [`PendingReply`]
//! 3. Dispatcher sends the request tagged with the id
//! 4. The matching reply arrives and the dispatcher calls `resolve()`
//! 5. The caller's `PendingReply` completes, or fails on timeout

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use shared_types::{CorrelationId, DispatchError};
use sr_01_timer_queue::TimerQueue;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::call::PendingCall;
use crate::domain::{CallInfo, PendingStats, Reply};
use crate::reply::PendingReply;

type TimeoutHook = Rc<dyn Fn(CorrelationId)>;

#[derive(Default)]
struct TableState {
    calls: HashMap<CorrelationId, PendingCall>,
    stats: PendingStats,
}

pub(crate) struct TableShared {
    state: RefCell<TableState>,
    timers: TimerQueue,
    on_timeout: RefCell<Option<TimeoutHook>>,
    /// Set by `close`; no timer driver runs afterwards.
    closed: Cell<bool>,
}

/// Outstanding outbound calls of one dispatcher.
///
/// Cloning yields another handle to the same table.
#[derive(Clone)]
pub struct PendingCallTable {
    shared: Rc<TableShared>,
}

impl PendingCallTable {
    /// Create a table whose deadlines run on `timers`.
    pub fn new(timers: TimerQueue) -> Self {
        Self {
            shared: Rc::new(TableShared {
                state: RefCell::new(TableState::default()),
                timers,
                on_timeout: RefCell::new(None),
                closed: Cell::new(false),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Rc<TableShared>) -> Self {
        Self { shared }
    }

    /// Observe every timeout, after the caller has been failed.
    pub fn set_timeout_hook(&self, hook: impl Fn(CorrelationId) + 'static) {
        *self.shared.on_timeout.borrow_mut() = Some(Rc::new(hook));
    }

    /// Register a call that fails with `Timeout` unless answered within
    /// `timeout`.
    pub fn register(
        &self,
        correlation_id: CorrelationId,
        timeout: Duration,
    ) -> Result<PendingReply, DispatchError> {
        self.register_call(correlation_id, timeout, CallInfo::default())
    }

    /// Like [`register`](Self::register), recording what the call was for.
    ///
    /// A live entry with the same id is left untouched and the registration
    /// fails with `DuplicateCorrelation`. A closed table rejects every
    /// registration with `Cancelled`.
    pub fn register_call(
        &self,
        correlation_id: CorrelationId,
        timeout: Duration,
        info: CallInfo,
    ) -> Result<PendingReply, DispatchError> {
        if self.shared.closed.get() {
            debug!(
                correlation_id = %correlation_id,
                msg_type = %info.msg_type,
                "Table is closed, registration rejected"
            );
            return Err(DispatchError::Cancelled);
        }

        let mut state = self.shared.state.borrow_mut();

        if state.calls.contains_key(&correlation_id) {
            state.stats.duplicates += 1;
            warn!(
                correlation_id = %correlation_id,
                "Correlation id is already pending, registration rejected"
            );
            return Err(DispatchError::DuplicateCorrelation(correlation_id));
        }

        let (sender, receiver) = oneshot::channel();
        let weak = Rc::downgrade(&self.shared);
        let timer = self.shared.timers.schedule(timeout, move || {
            if let Some(shared) = weak.upgrade() {
                PendingCallTable::from_shared(shared).expire(correlation_id);
            }
        });

        debug!(
            correlation_id = %correlation_id,
            msg_type = %info.msg_type,
            timeout_ms = timeout.as_millis() as u64,
            "Registered pending call"
        );

        state.calls.insert(
            correlation_id,
            PendingCall {
                info,
                created_at: Instant::now(),
                timeout,
                timer,
                sender,
            },
        );
        state.stats.registered += 1;

        Ok(PendingReply::new(
            correlation_id,
            receiver,
            Rc::downgrade(&self.shared),
        ))
    }

    /// Complete a call with its reply.
    ///
    /// Returns false for an unknown or already settled id; the reply is
    /// counted as stale and dropped.
    pub fn resolve(&self, correlation_id: CorrelationId, reply: Reply) -> bool {
        let Some(call) = self.take(correlation_id, |stats| stats.completed += 1) else {
            self.record_stale(correlation_id);
            return false;
        };

        debug!(
            correlation_id = %correlation_id,
            msg_type = %call.info.msg_type,
            reply_type = %reply.msg_type,
            response_time_ms = call.created_at.elapsed().as_millis() as u64,
            "Completed pending call"
        );

        if !call.settle(Ok(reply)) {
            debug!(correlation_id = %correlation_id, "Pending call receiver dropped");
        }
        true
    }

    /// Complete a call with an error.
    pub fn fail(&self, correlation_id: CorrelationId, error: DispatchError) -> bool {
        let Some(call) = self.take(correlation_id, |stats| stats.failed += 1) else {
            self.record_stale(correlation_id);
            return false;
        };

        debug!(
            correlation_id = %correlation_id,
            msg_type = %call.info.msg_type,
            error = %error,
            "Failed pending call"
        );

        let _ = call.settle(Err(error));
        true
    }

    /// Fail a call with `Timeout`. Normally invoked by the call's timer.
    pub fn expire(&self, correlation_id: CorrelationId) -> bool {
        let Some(call) = self.take(correlation_id, |stats| stats.timed_out += 1) else {
            return false;
        };

        warn!(
            correlation_id = %correlation_id,
            target = ?call.info.target,
            msg_type = %call.info.msg_type,
            elapsed_ms = call.created_at.elapsed().as_millis() as u64,
            timeout_ms = call.timeout.as_millis() as u64,
            "Pending call timed out"
        );

        let _ = call.settle_expired(correlation_id);

        let hook = self.shared.on_timeout.borrow().clone();
        if let Some(hook) = hook {
            hook(correlation_id);
        }
        true
    }

    /// Drop a call; its awaiter fails with `Cancelled`.
    pub fn cancel(&self, correlation_id: CorrelationId) -> bool {
        let Some(call) = self.take(correlation_id, |stats| stats.cancelled += 1) else {
            return false;
        };
        debug!(
            correlation_id = %correlation_id,
            msg_type = %call.info.msg_type,
            "Cancelled pending call"
        );
        true
    }

    /// Fail every live call with `error`. Returns how many were failed.
    pub fn fail_all(&self, error: DispatchError) -> usize {
        let drained: Vec<(CorrelationId, PendingCall)> = {
            let mut state = self.shared.state.borrow_mut();
            let drained: Vec<_> = state.calls.drain().collect();
            state.stats.failed += drained.len() as u64;
            drained
        };

        let count = drained.len();
        for (_, call) in drained {
            self.shared.timers.cancel(call.timer);
            let _ = call.settle(Err(error.clone()));
        }

        if count > 0 {
            info!(failed = count, error = %error, "Failed all pending calls");
        }
        count
    }

    /// Fail every live call with `Cancelled` and reject later registrations.
    ///
    /// Used once the timer driver has stopped, since no deadline could fire
    /// for a call registered afterwards.
    pub fn close(&self) -> usize {
        self.shared.closed.set(true);
        self.fail_all(DispatchError::Cancelled)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.get()
    }

    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.shared.state.borrow().calls.contains_key(correlation_id)
    }

    pub fn pending_count(&self) -> usize {
        self.shared.state.borrow().calls.len()
    }

    /// Counters plus the current number of pending calls.
    pub fn stats(&self) -> PendingStats {
        let state = self.shared.state.borrow();
        PendingStats {
            pending: state.calls.len(),
            ..state.stats
        }
    }

    /// Remove an entry and cancel its timer, recording the outcome.
    fn take(
        &self,
        correlation_id: CorrelationId,
        record: impl FnOnce(&mut PendingStats),
    ) -> Option<PendingCall> {
        let call = {
            let mut state = self.shared.state.borrow_mut();
            let call = state.calls.remove(&correlation_id)?;
            record(&mut state.stats);
            call
        };

        self.shared.timers.cancel(call.timer);
        Some(call)
    }

    fn record_stale(&self, correlation_id: CorrelationId) {
        self.shared.state.borrow_mut().stats.stale += 1;
        debug!(
            correlation_id = %correlation_id,
            "Response for unknown or already settled correlation id"
        );
    }

    /// Called when a `PendingReply` is dropped before settling.
    pub(crate) fn abandon(&self, correlation_id: CorrelationId) {
        if let Some(call) = self.take(correlation_id, |stats| stats.cancelled += 1) {
            debug!(
                correlation_id = %correlation_id,
                msg_type = %call.info.msg_type,
                "Pending call abandoned by caller"
            );
        }
    }
}

impl fmt::Debug for PendingCallTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCallTable")
            .field("stats", &self.stats())
            .field("closed", &self.is_closed())
            .finish()
    }
}
