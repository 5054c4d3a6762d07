//! # Transport
//!
//! The outbound half of the transport boundary.

use async_trait::async_trait;
use shared_types::{Envelope, PeerId, TransportError};

/// Sends envelopes to peers.
///
/// Implementations own the wire encoding and the connection handling; the
/// dispatch core only sees this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The peer this transport sends as.
    fn local_peer(&self) -> &PeerId;

    /// Hand an envelope to the transport for delivery to `envelope.to`.
    ///
    /// Returning `Ok` means the envelope was accepted, not that the
    /// recipient processed it.
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError>;
}
