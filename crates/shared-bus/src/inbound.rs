//! # Inbound Queue
//!
//! The receiving half of the transport boundary. Each attached peer owns
//! exactly one queue; envelopes come out in the order they were accepted.

use shared_types::{Envelope, PeerId};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from non-blocking receive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InboundError {
    /// Every sender is gone: the peer was detached or the network dropped.
    #[error("inbound queue closed")]
    Closed,
}

/// Inbound envelopes addressed to one peer.
///
/// Dropping the queue disconnects the peer: later sends to it fail with
/// `TransportError::Disconnected`.
#[derive(Debug)]
pub struct InboundQueue {
    peer: PeerId,
    receiver: mpsc::Receiver<Envelope>,
}

impl InboundQueue {
    pub(crate) fn new(peer: PeerId, receiver: mpsc::Receiver<Envelope>) -> Self {
        Self { peer, receiver }
    }

    /// The peer this queue receives for.
    pub fn peer(&self) -> &PeerId {
        &self.peer
    }

    /// Receive the next envelope.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }

    /// Receive without waiting.
    ///
    /// - `Ok(Some(envelope))` - an envelope was queued
    /// - `Ok(None)` - nothing queued right now
    /// - `Err(InboundError::Closed)` - closed and drained
    pub fn try_recv(&mut self) -> Result<Option<Envelope>, InboundError> {
        match self.receiver.try_recv() {
            Ok(envelope) => Ok(Some(envelope)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(InboundError::Closed),
        }
    }
}
