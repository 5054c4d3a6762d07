//! Cross-crate integration scenarios.

pub mod failures;
pub mod flows;
pub mod support;
pub mod telemetry;
