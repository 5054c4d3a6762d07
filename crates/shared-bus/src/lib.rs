//! # Shared Bus - Transport Boundary
//!
//! The dispatch core never talks to sockets. It hands outbound
//! [`Envelope`](shared_types::Envelope)s to a [`Transport`] and reads inbound
//! envelopes from an [`InboundQueue`].
//!
//! ```text
//! ┌──────────────┐   Transport::send()   ┌──────────────┐
//! │  Peer A      │ ─────────┐            │  Peer B      │
//! │ (dispatcher) │          ▼            │ (dispatcher) │
//! └──────────────┘   ┌──────────────┐    └──────────────┘
//!                    │  Network     │  InboundQueue ↑
//!                    │ (keyed by    │ ──────────────┘
//!                    │   PeerId)    │
//!                    └──────────────┘
//! ```
//!
//! [`InMemoryNetwork`] is the reference implementation used by the runtime
//! and by tests. Real deployments plug their own [`Transport`].

pub mod inbound;
pub mod network;
pub mod transport;

pub use inbound::{InboundError, InboundQueue};
pub use network::{InMemoryNetwork, PeerTransport};
pub use shared_types::TransportError;
pub use transport::Transport;

/// Maximum envelopes buffered per peer before `QueueFull`.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
