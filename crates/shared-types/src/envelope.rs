//! # Envelope
//!
//! The unit carried by the transport: a [`Message`] plus its routing header.
//! The `from` field is the sole source of truth for the sender's identity;
//! replies are addressed to it.

use serde::{Deserialize, Serialize};

use crate::message::{Message, PeerId};

/// A message addressed from one peer to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Protocol version for forward compatibility.
    pub version: u16,
    /// The peer that sent the message.
    pub from: PeerId,
    /// The intended recipient.
    pub to: PeerId,
    /// The message itself.
    pub message: Message,
}

impl Envelope {
    /// Current protocol version.
    pub const CURRENT_VERSION: u16 = 1;

    pub fn new(from: PeerId, to: PeerId, message: Message) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            from,
            to,
            message,
        }
    }
}
