//! Pending-call domain types.

pub mod call;
pub mod stats;

pub use call::{CallInfo, CallResult, Reply};
pub use stats::PendingStats;
