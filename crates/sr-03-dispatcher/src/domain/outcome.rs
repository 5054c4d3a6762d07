//! Result of routing one inbound message.

use shared_types::{CorrelationId, DispatchError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Reply settled the pending call with this id.
    Resolved(CorrelationId),
    /// Reply for an id that is no longer pending; discarded.
    Stale(CorrelationId),
    /// Request handed to its handler task.
    Dispatched,
    /// No handler for the namespace; an `Unhandled` error reply was sent if
    /// the request expected a reply.
    Unhandled,
    /// Malformed or duplicate message, dropped.
    Discarded,
}

impl InboundOutcome {
    /// The error this outcome stands for, if any. Only used for logging.
    pub fn as_error(&self) -> Option<DispatchError> {
        match self {
            InboundOutcome::Stale(id) => Some(DispatchError::StaleResponse(*id)),
            _ => None,
        }
    }
}
