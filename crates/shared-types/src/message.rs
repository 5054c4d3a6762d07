//! # Message Model
//!
//! A [`Message`] is a typed, opaque payload travelling between peers.
//!
//! | kind    | correlation_id | meaning                                   |
//! |---------|----------------|-------------------------------------------|
//! | Request | `Some(id)`     | call, the sender awaits a reply with `id` |
//! | Request | `None`         | one-way notification, no reply            |
//! | Reply   | `Some(id)`     | answer to the request tagged `id`         |
//!
//! Error-tagged replies use the reserved type [`ERROR_REPLY_TYPE`] and carry
//! a serialized [`RemoteError`] as payload.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use crate::correlation::CorrelationId;

/// Reserved message type for error-tagged replies.
pub const ERROR_REPLY_TYPE: &str = "relay.Error";

/// Separator between the namespace segments of a message type.
pub const NAMESPACE_SEPARATOR: char = '.';

/// Name of a peer service reachable over the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for PeerId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&PeerId> for PeerId {
    fn from(peer: &PeerId) -> Self {
        peer.clone()
    }
}

/// Direction of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Request,
    Reply,
}

/// A typed message with an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Request or reply.
    pub kind: MessageKind,
    /// Schema/route name, e.g. `million.ss.test.LoginReq`.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Opaque structured payload.
    pub payload: Value,
    /// Present only on request/reply pairs that must be matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}

impl Message {
    /// A request expecting a reply tagged with `correlation_id`.
    pub fn request(
        msg_type: impl Into<String>,
        payload: Value,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            kind: MessageKind::Request,
            msg_type: msg_type.into(),
            payload,
            correlation_id: Some(correlation_id),
        }
    }

    /// A one-way request; the receiver never replies.
    pub fn notify(msg_type: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: MessageKind::Request,
            msg_type: msg_type.into(),
            payload,
            correlation_id: None,
        }
    }

    /// A successful reply to the request tagged `correlation_id`.
    pub fn reply(correlation_id: CorrelationId, msg_type: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: MessageKind::Reply,
            msg_type: msg_type.into(),
            payload,
            correlation_id: Some(correlation_id),
        }
    }

    /// An error-tagged reply to the request tagged `correlation_id`.
    pub fn error_reply(correlation_id: CorrelationId, error: &RemoteError) -> Self {
        Self::reply(correlation_id, ERROR_REPLY_TYPE, error.to_payload())
    }

    pub fn is_request(&self) -> bool {
        self.kind == MessageKind::Request
    }

    pub fn is_reply(&self) -> bool {
        self.kind == MessageKind::Reply
    }

    /// True for requests that carry a correlation id.
    pub fn expects_reply(&self) -> bool {
        self.is_request() && self.correlation_id.is_some()
    }

    /// True for replies whose payload encodes a [`RemoteError`].
    pub fn is_error(&self) -> bool {
        self.is_reply() && self.msg_type == ERROR_REPLY_TYPE
    }

    /// Decode the error carried by an error-tagged reply.
    ///
    /// Returns `None` when the message is not an error reply.
    pub fn remote_error(&self) -> Option<Result<RemoteError, serde_json::Error>> {
        if !self.is_error() {
            return None;
        }
        Some(serde_json::from_value(self.payload.clone()))
    }
}

/// Category of a failure reported back to a requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// The remote handler's own downstream call timed out.
    Timeout,
    /// No handler is registered for the request's namespace.
    Unhandled,
    /// The remote handler returned an error or panicked.
    HandlerFailure,
}

impl RemoteErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteErrorKind::Timeout => "timeout",
            RemoteErrorKind::Unhandled => "unhandled",
            RemoteErrorKind::HandlerFailure => "handler_failure",
        }
    }
}

/// Error payload of an error-tagged reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unhandled(msg_type: &str) -> Self {
        Self::new(
            RemoteErrorKind::Unhandled,
            format!("no handler registered for {}", msg_type),
        )
    }

    fn to_payload(&self) -> Value {
        json!({
            "kind": self.kind.as_str(),
            "message": self.message,
        })
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}
