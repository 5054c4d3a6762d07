//! Ports: the handler interface the dispatcher drives and the metrics sink
//! it reports to.

pub mod handler;
pub mod metrics;

pub use handler::{handler_fn, FnHandler, HandlerReply, HandlerResult, MessageHandler};
pub use metrics::{DispatchMetrics, NoopDispatchMetrics};
