//! # Error Types
//!
//! Errors surfaced by the transport and by the dispatch core.

use thiserror::Error;

use crate::correlation::CorrelationId;
use crate::message::{PeerId, RemoteError, RemoteErrorKind};

/// Errors raised by a transport while delivering an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No peer with this name is attached.
    #[error("unknown peer: {0}")]
    UnknownPeer(PeerId),

    /// The peer's inbound queue is at capacity.
    #[error("inbound queue of {0} is full")]
    QueueFull(PeerId),

    /// The peer detached; its inbound queue is closed.
    #[error("peer {0} is disconnected")]
    Disconnected(PeerId),
}

/// Errors of the dispatch core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No response arrived before the deadline.
    #[error("request {correlation_id} timed out: {detail}")]
    Timeout {
        correlation_id: CorrelationId,
        detail: String,
    },

    /// No handler is registered for the request's namespace.
    #[error("unhandled message: {message}")]
    Unhandled { message: String },

    /// The handler raised an error while processing the request.
    #[error("handler failure: {message}")]
    HandlerFailure { message: String },

    /// Programming error: the correlation id already has a live entry.
    #[error("correlation id {0} is already pending")]
    DuplicateCorrelation(CorrelationId),

    /// Response for an id that is no longer pending.
    #[error("stale response for correlation id {0}")]
    StaleResponse(CorrelationId),

    /// The transport refused the outbound message.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The call was abandoned or the dispatcher shut down.
    #[error("call cancelled")]
    Cancelled,

    /// An error-tagged reply whose payload could not be decoded.
    #[error("malformed error reply: {0}")]
    MalformedReply(String),
}

impl DispatchError {
    /// Convert an error received in an error-tagged reply.
    pub fn from_remote(correlation_id: CorrelationId, error: RemoteError) -> Self {
        match error.kind {
            RemoteErrorKind::Timeout => DispatchError::Timeout {
                correlation_id,
                detail: error.message,
            },
            RemoteErrorKind::Unhandled => DispatchError::Unhandled {
                message: error.message,
            },
            RemoteErrorKind::HandlerFailure => DispatchError::HandlerFailure {
                message: error.message,
            },
        }
    }

    /// Kind reported to a peer when this error ends a handler.
    pub fn remote_kind(&self) -> RemoteErrorKind {
        match self {
            DispatchError::Timeout { .. } => RemoteErrorKind::Timeout,
            DispatchError::Unhandled { .. } => RemoteErrorKind::Unhandled,
            _ => RemoteErrorKind::HandlerFailure,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DispatchError::Timeout { .. })
    }
}
