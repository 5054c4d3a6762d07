//! # SR-03 Dispatcher
//!
//! Single-threaded message dispatch with request/reply correlation.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): [`HandlerRegistry`], [`DispatcherConfig`],
//!   [`DispatchStats`], [`InboundOutcome`]
//! - **Ports Layer** (`ports/`):
//!   - [`MessageHandler`]: driven port, user logic per namespace
//!   - [`DispatchMetrics`]: driven port, event sink
//! - **Service Layer** (`service/`): [`Dispatcher`] and [`HandlerContext`]
//!
//! ## Control Flow
//!
//! ```text
//! inbound envelope ─► Dispatcher::on_inbound
//!                       ├─ reply   ─► PendingCallTable::resolve / fail
//!                       └─ request ─► HandlerRegistry::resolve
//!                                      ├─ none    ─► Unhandled error reply
//!                                      └─ handler ─► spawn_local(handler)
//!                                                     ├─ ctx.call(..) ─► send_request ─► await
//!                                                     └─ Reply/NoReply/Err ─► at most one reply
//! ```
//!
//! ## Invariants
//!
//! - **INVARIANT-1**: a reply never reaches a handler
//! - **INVARIANT-2**: a request gets at most one reply, tagged with its
//!   correlation id; one-way messages get none
//! - **INVARIANT-3**: handler errors and panics become error replies and
//!   never stop the dispatch loop
//! - **INVARIANT-4**: envelopes are routed in arrival order
//!
//! ## Usage Example
//!
//! ```ignore
//! use sr_03_dispatcher::{handler_fn, Dispatcher, DispatcherConfig, HandlerRegistry, HandlerReply};
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register_handler(
//!     "Echo",
//!     handler_fn(|_ctx, _msg_type, payload| async move { HandlerReply::ok("EchoAck", payload) }),
//! )?;
//!
//! let (transport, inbound) = network.attach("B");
//! let dispatcher = Dispatcher::new(DispatcherConfig::new(registry), Rc::new(transport));
//!
//! LocalSet::new().run_until(dispatcher.run(inbound)).await;
//! ```

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{DispatchStats, DispatcherConfig, HandlerRegistry, InboundOutcome, RegistryError};
pub use ports::{
    handler_fn, DispatchMetrics, FnHandler, HandlerReply, HandlerResult, MessageHandler,
    NoopDispatchMetrics,
};
pub use service::{Dispatcher, HandlerContext};

pub use sr_01_timer_queue::TimerHandle;
pub use sr_02_pending_calls::{PendingReply, Reply};
