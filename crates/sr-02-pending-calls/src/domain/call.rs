//! A call awaiting its reply.

use serde::de::DeserializeOwned;
use serde_json::Value;
use shared_types::{CorrelationId, DispatchError, PeerId};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

use sr_01_timer_queue::TimerHandle;

/// Outcome delivered to the caller.
pub type CallResult = Result<Reply, DispatchError>;

/// Successful reply to an outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Type of the reply message, e.g. `EchoAck`.
    pub msg_type: String,
    pub payload: Value,
}

impl Reply {
    pub fn new(msg_type: impl Into<String>, payload: Value) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload,
        }
    }

    /// Deserialize the payload into a concrete type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

/// What the call was for. Only used for logs and timeout details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallInfo {
    pub target: Option<PeerId>,
    pub msg_type: String,
}

impl CallInfo {
    pub fn new(target: PeerId, msg_type: impl Into<String>) -> Self {
        Self {
            target: Some(target),
            msg_type: msg_type.into(),
        }
    }
}

/// Entry owned by the table until it is resolved, failed, expired or
/// cancelled.
pub(crate) struct PendingCall {
    pub(crate) info: CallInfo,
    pub(crate) created_at: Instant,
    pub(crate) timeout: Duration,
    pub(crate) timer: TimerHandle,
    pub(crate) sender: oneshot::Sender<Settlement>,
}

/// What the table hands to the awaiting [`PendingReply`](crate::PendingReply).
#[derive(Debug)]
pub(crate) struct Settlement {
    pub(crate) result: CallResult,
    /// The call's own deadline passed.
    pub(crate) expired: bool,
}

impl PendingCall {
    /// Hand `result` to the caller. False if the caller is gone.
    pub(crate) fn settle(self, result: CallResult) -> bool {
        self.sender
            .send(Settlement {
                result,
                expired: false,
            })
            .is_ok()
    }

    /// Fail the caller with `Timeout`, marking the call as locally expired.
    pub(crate) fn settle_expired(self, correlation_id: CorrelationId) -> bool {
        let detail = self.timeout_detail();
        self.sender
            .send(Settlement {
                result: Err(DispatchError::Timeout {
                    correlation_id,
                    detail,
                }),
                expired: true,
            })
            .is_ok()
    }

    pub(crate) fn timeout_detail(&self) -> String {
        let ms = self.timeout.as_millis();
        match (&self.info.target, self.info.msg_type.is_empty()) {
            (Some(target), false) => {
                format!("{} to {} got no reply within {}ms", self.info.msg_type, target, ms)
            }
            (None, false) => format!("{} got no reply within {}ms", self.info.msg_type, ms),
            _ => format!("no reply within {}ms", ms),
        }
    }
}
