//! `ScriptService`: a catch-all handler that chains a call to `TestService`
//! before answering.

use anyhow::Context;
use async_trait::async_trait;
use relay_telemetry::{log_event, log_message_event};
use serde_json::Value;
use shared_types::PeerId;
use sr_03_dispatcher::{HandlerContext, HandlerReply, HandlerResult, MessageHandler};

use super::{LoginPayload, LOGIN_REQ, LOGIN_RES};

/// Value sent to `TestService` with each chained `LoginReq`.
pub const CHAINED_REQUEST_VALUE: &str = "test req";
/// Value of every reply the script service sends.
pub const SCRIPT_REPLY_VALUE: &str = "test res";

/// Handler registered under the empty (catch-all) namespace.
#[derive(Debug, Clone)]
pub struct ScriptServiceHandler {
    test_service: PeerId,
}

impl ScriptServiceHandler {
    pub fn new(test_service: impl Into<PeerId>) -> Self {
        Self {
            test_service: test_service.into(),
        }
    }
}

#[async_trait(?Send)]
impl MessageHandler for ScriptServiceHandler {
    async fn handle(&self, ctx: HandlerContext, msg_type: &str, payload: Value) -> HandlerResult {
        log_message_event!(
            info,
            ctx.local_peer().as_str(),
            "onMsg",
            msg_type,
            ctx.correlation_id(),
            from = %ctx.sender(),
            value = %payload.get("value").unwrap_or(&serde_json::Value::Null)
        );

        let reply = ctx
            .call(
                &self.test_service,
                LOGIN_REQ,
                LoginPayload::new(CHAINED_REQUEST_VALUE).to_value(),
            )
            .await
            .with_context(|| format!("LoginReq to {} failed", self.test_service))?;
        let received: LoginPayload = reply.decode().context("malformed LoginRes payload")?;
        log_event!(
            info,
            ctx.local_peer().as_str(),
            "recv_msg",
            from = %self.test_service,
            value = %received.value
        );

        HandlerReply::ok(LOGIN_RES, LoginPayload::new(SCRIPT_REPLY_VALUE).to_value())
    }
}
