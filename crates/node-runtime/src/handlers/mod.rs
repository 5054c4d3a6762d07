//! # Service Handlers
//!
//! Message handlers of the services hosted by the runtime.
//!
//! - `TestService` answers `million.ss.test.LoginReq` directly.
//! - `ScriptService` handles any message by first calling `TestService`,
//!   then replying, the way a scripted service chains calls.

pub mod script_service;
pub mod test_service;

use serde::{Deserialize, Serialize};

pub use script_service::ScriptServiceHandler;
pub use test_service::TestServiceHandler;

/// Namespace of the test protocol.
pub const TEST_NAMESPACE: &str = "million.ss.test";
pub const LOGIN_REQ: &str = "million.ss.test.LoginReq";
pub const LOGIN_RES: &str = "million.ss.test.LoginRes";

/// Payload of the login messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPayload {
    pub value: String,
}

impl LoginPayload {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({ "value": self.value })
    }
}
