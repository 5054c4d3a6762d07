//! Handler execution.
//!
//! Runs one handler to completion and turns its outcome into at most one
//! reply. Errors and panics are reported to the requester, never propagated
//! into the dispatch loop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

use futures::FutureExt;
use serde_json::Value;
use shared_types::{DispatchError, RemoteError, RemoteErrorKind};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::ports::{HandlerReply, MessageHandler};
use crate::service::context::HandlerContext;
use crate::service::dispatcher::Dispatcher;

impl Dispatcher {
    pub(crate) async fn execute(
        &self,
        handler: Rc<dyn MessageHandler>,
        ctx: HandlerContext,
        msg_type: String,
        payload: Value,
    ) {
        let from = ctx.sender().clone();
        let correlation_id = ctx.correlation_id();
        let started = Instant::now();

        let result = AssertUnwindSafe(handler.handle(ctx, &msg_type, payload))
            .catch_unwind()
            .await;
        self.inner
            .metrics
            .handler_completed(&msg_type, started.elapsed());

        let outcome = match result {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(error)) => Err(classify_error(&error)),
            Err(panic) => Err(RemoteError::new(
                RemoteErrorKind::HandlerFailure,
                format!("handler panicked: {}", panic_message(panic.as_ref())),
            )),
        };

        if let Err(remote) = &outcome {
            self.inner.stats.borrow_mut().handler_failures += 1;
            self.inner.metrics.handler_failed(&msg_type, remote.kind);
            warn!(
                from = %from,
                msg_type = %msg_type,
                correlation_id = ?correlation_id,
                error = %remote,
                "Handler failed"
            );
        }

        let Some(correlation_id) = correlation_id else {
            if let Ok(HandlerReply::Reply { msg_type: reply_type, .. }) = outcome {
                debug!(
                    from = %from,
                    msg_type = %msg_type,
                    reply_type = %reply_type,
                    "Reply to one-way message dropped"
                );
            }
            return;
        };

        let sent = match outcome {
            Ok(HandlerReply::Reply {
                msg_type: reply_type,
                payload,
            }) => {
                self.send_reply(&from, correlation_id, reply_type, payload)
                    .await
            }
            Ok(HandlerReply::NoReply) => {
                self.release(&from, correlation_id);
                debug!(
                    from = %from,
                    correlation_id = %correlation_id,
                    msg_type = %msg_type,
                    "Handler finished without reply"
                );
                Ok(false)
            }
            Err(remote) => {
                self.send_error_reply(&from, correlation_id, &remote)
                    .await
            }
        };

        if let Err(error) = sent {
            warn!(
                to = %from,
                correlation_id = %correlation_id,
                error = %error,
                "Reply could not be delivered"
            );
        }
    }
}

/// Map a handler error to the error reported to the requester.
///
/// A timed out downstream call anywhere in the chain is reported as
/// `Timeout`; everything else as `HandlerFailure`.
pub(crate) fn classify_error(error: &anyhow::Error) -> RemoteError {
    let timed_out = error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<DispatchError>())
        .any(DispatchError::is_timeout);

    let kind = if timed_out {
        RemoteErrorKind::Timeout
    } else {
        RemoteErrorKind::HandlerFailure
    };
    RemoteError::new(kind, format!("{error:#}"))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
