//! # In-Memory Network
//!
//! Routes envelopes between peers attached to the same process.
//!
//! Each peer gets a bounded mpsc queue. Delivery never waits: a full queue
//! is reported as `QueueFull` so a dispatcher sending to itself can never
//! deadlock its own thread.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Envelope, PeerId, TransportError};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::inbound::InboundQueue;
use crate::transport::Transport;
use crate::DEFAULT_CHANNEL_CAPACITY;

struct NetworkInner {
    /// Inbound queue senders keyed by peer name.
    peers: RwLock<HashMap<PeerId, mpsc::Sender<Envelope>>>,

    /// Per-peer queue capacity.
    capacity: usize,

    /// Envelopes accepted for delivery.
    delivered: AtomicU64,

    /// Envelopes rejected (unknown peer, full or closed queue).
    undelivered: AtomicU64,
}

/// In-memory peer network.
///
/// Cheap to clone; clones share the same routing table.
#[derive(Clone)]
pub struct InMemoryNetwork {
    inner: Arc<NetworkInner>,
}

impl InMemoryNetwork {
    /// Create a network with default per-peer capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a network with the given per-peer capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                peers: RwLock::new(HashMap::new()),
                capacity: capacity.max(1),
                delivered: AtomicU64::new(0),
                undelivered: AtomicU64::new(0),
            }),
        }
    }

    /// Attach a peer and return its outbound transport and inbound queue.
    ///
    /// Attaching a name that is already attached replaces the old queue; the
    /// old queue stops receiving.
    pub fn attach(&self, peer: impl Into<PeerId>) -> (PeerTransport, InboundQueue) {
        let peer = peer.into();
        let (sender, receiver) = mpsc::channel(self.inner.capacity);

        if self.inner.peers.write().insert(peer.clone(), sender).is_some() {
            warn!(peer = %peer, "Peer re-attached, previous inbound queue replaced");
        } else {
            debug!(peer = %peer, "Peer attached");
        }

        let transport = PeerTransport {
            local: peer.clone(),
            network: self.clone(),
        };
        (transport, InboundQueue::new(peer, receiver))
    }

    /// Detach a peer. Returns false if it was not attached.
    pub fn detach(&self, peer: &PeerId) -> bool {
        let removed = self.inner.peers.write().remove(peer).is_some();
        if removed {
            debug!(peer = %peer, "Peer detached");
        }
        removed
    }

    /// Names of all attached peers, sorted.
    #[must_use]
    pub fn peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.inner.peers.read().keys().cloned().collect();
        peers.sort();
        peers
    }

    #[must_use]
    pub fn is_attached(&self, peer: &PeerId) -> bool {
        self.inner.peers.read().contains_key(peer)
    }

    /// Total envelopes accepted for delivery.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.inner.delivered.load(Ordering::Relaxed)
    }

    /// Total envelopes that could not be delivered.
    #[must_use]
    pub fn undelivered(&self) -> u64 {
        self.inner.undelivered.load(Ordering::Relaxed)
    }

    fn deliver(&self, envelope: Envelope) -> Result<(), TransportError> {
        let to = envelope.to.clone();
        let sender = self.inner.peers.read().get(&to).cloned();

        let Some(sender) = sender else {
            self.inner.undelivered.fetch_add(1, Ordering::Relaxed);
            warn!(from = %envelope.from, to = %to, "Envelope dropped (unknown peer)");
            return Err(TransportError::UnknownPeer(to));
        };

        match sender.try_send(envelope) {
            Ok(()) => {
                self.inner.delivered.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(envelope)) => {
                self.inner.undelivered.fetch_add(1, Ordering::Relaxed);
                warn!(from = %envelope.from, to = %to, "Envelope dropped (queue full)");
                Err(TransportError::QueueFull(to))
            }
            Err(mpsc::error::TrySendError::Closed(envelope)) => {
                self.inner.undelivered.fetch_add(1, Ordering::Relaxed);
                warn!(from = %envelope.from, to = %to, "Envelope dropped (peer disconnected)");
                // Only forget the entry if nobody re-attached in the meantime.
                let mut peers = self.inner.peers.write();
                if peers.get(&to).is_some_and(|current| current.same_channel(&sender)) {
                    peers.remove(&to);
                }
                Err(TransportError::Disconnected(to))
            }
        }
    }
}

impl Default for InMemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryNetwork")
            .field("peers", &self.peers())
            .field("capacity", &self.inner.capacity)
            .field("delivered", &self.delivered())
            .field("undelivered", &self.undelivered())
            .finish()
    }
}

/// Outbound side of a peer attached to an [`InMemoryNetwork`].
#[derive(Clone, Debug)]
pub struct PeerTransport {
    local: PeerId,
    network: InMemoryNetwork,
}

impl PeerTransport {
    /// The network this transport belongs to.
    pub fn network(&self) -> &InMemoryNetwork {
        &self.network
    }
}

#[async_trait]
impl Transport for PeerTransport {
    fn local_peer(&self) -> &PeerId {
        &self.local
    }

    async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.network.deliver(envelope)
    }
}
