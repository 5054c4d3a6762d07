//! `TestService`: answers login requests.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use relay_telemetry::log_message_event;
use serde_json::Value;
use sr_03_dispatcher::{HandlerContext, HandlerReply, HandlerResult, MessageHandler};

use super::{LoginPayload, LOGIN_REQ, LOGIN_RES};

/// Reply value of every `LoginReq`.
pub const LOGIN_RES_VALUE: &str = "LoginRes res";

/// Handler for the `million.ss.test` namespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct TestServiceHandler;

#[async_trait(?Send)]
impl MessageHandler for TestServiceHandler {
    async fn handle(&self, ctx: HandlerContext, msg_type: &str, payload: Value) -> HandlerResult {
        match msg_type {
            LOGIN_REQ => {
                let req: LoginPayload =
                    serde_json::from_value(payload).context("malformed LoginReq payload")?;
                log_message_event!(
                    info,
                    ctx.local_peer().as_str(),
                    "LoginReq",
                    msg_type,
                    ctx.correlation_id(),
                    from = %ctx.sender(),
                    value = %req.value
                );
                HandlerReply::ok(LOGIN_RES, LoginPayload::new(LOGIN_RES_VALUE).to_value())
            }
            LOGIN_RES => {
                let res: LoginPayload =
                    serde_json::from_value(payload).context("malformed LoginRes payload")?;
                log_message_event!(
                    info,
                    ctx.local_peer().as_str(),
                    "LoginRes",
                    msg_type,
                    ctx.correlation_id(),
                    from = %ctx.sender(),
                    value = %res.value
                );
                HandlerReply::none()
            }
            other => Err(anyhow!("TestService does not handle {other}")),
        }
    }
}
