//! # Shared Types Crate
//!
//! Types shared by every crate of the relay: the [`Message`] model carried
//! over the transport, the [`CorrelationId`] that pairs a request with its
//! reply, the [`Envelope`] routed between peers and the [`DispatchError`]
//! taxonomy.
//!
//! ## Design Principles
//!
//! - **Explicit direction**: a message is either a request or a reply. A late
//!   reply is recognised as stale instead of being dispatched as a request.
//! - **Opaque payloads**: payloads are `serde_json::Value`; the relay never
//!   interprets them except for error-tagged replies.
//! - **Envelope identity**: the sender of a message is the envelope's `from`
//!   field, never something carried inside the payload.

pub mod correlation;
pub mod envelope;
pub mod errors;
pub mod message;

pub use correlation::CorrelationId;
pub use envelope::Envelope;
pub use errors::{DispatchError, TransportError};
pub use message::{
    Message, MessageKind, PeerId, RemoteError, RemoteErrorKind, ERROR_REPLY_TYPE,
};
