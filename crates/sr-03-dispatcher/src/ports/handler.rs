//! Handler port.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

use crate::service::HandlerContext;

/// What a handler produces for a request.
pub type HandlerResult = anyhow::Result<HandlerReply>;

/// Result of a successful handler run.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerReply {
    /// Send this back to the requester, tagged with its correlation id.
    Reply { msg_type: String, payload: Value },
    /// Send nothing.
    NoReply,
}

impl HandlerReply {
    pub fn reply(msg_type: impl Into<String>, payload: Value) -> Self {
        HandlerReply::Reply {
            msg_type: msg_type.into(),
            payload,
        }
    }

    /// `Ok(HandlerReply::Reply { .. })`, for handler bodies.
    pub fn ok(msg_type: impl Into<String>, payload: Value) -> HandlerResult {
        Ok(Self::reply(msg_type, payload))
    }

    /// `Ok(HandlerReply::NoReply)`, for handler bodies.
    pub fn none() -> HandlerResult {
        Ok(HandlerReply::NoReply)
    }
}

/// User logic invoked for inbound requests of a namespace.
///
/// Handlers run as cooperative tasks on the dispatch thread, so they need not
/// be `Send`. An `Err` becomes an error-tagged reply to the requester:
/// `Timeout` when the error chain contains a timed out downstream call,
/// `HandlerFailure` otherwise. Panics are caught and reported as
/// `HandlerFailure`.
#[async_trait(?Send)]
pub trait MessageHandler {
    async fn handle(&self, ctx: HandlerContext, msg_type: &str, payload: Value) -> HandlerResult;
}

/// Adapts a closure into a [`MessageHandler`].
pub struct FnHandler<F> {
    f: F,
}

/// Wrap `f` as a handler.
///
/// ```ignore
/// registry.register_handler(
///     "Echo",
///     handler_fn(|_ctx, _msg_type, payload| async move { HandlerReply::ok("EchoAck", payload) }),
/// )?;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(HandlerContext, String, Value) -> Fut + 'static,
    Fut: Future<Output = HandlerResult> + 'static,
{
    FnHandler { f }
}

#[async_trait(?Send)]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(HandlerContext, String, Value) -> Fut + 'static,
    Fut: Future<Output = HandlerResult> + 'static,
{
    async fn handle(&self, ctx: HandlerContext, msg_type: &str, payload: Value) -> HandlerResult {
        (self.f)(ctx, msg_type.to_string(), payload).await
    }
}
