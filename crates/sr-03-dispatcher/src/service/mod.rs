//! Service layer: the dispatcher and the context handed to handlers.

mod context;
mod dispatcher;
mod execution;

pub use context::HandlerContext;
pub use dispatcher::Dispatcher;
