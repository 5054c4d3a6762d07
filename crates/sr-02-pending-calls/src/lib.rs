//! # SR-02 Pending-Call Table
//!
//! Correlates outbound requests with their replies.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): [`Reply`], [`CallInfo`], [`PendingStats`]
//! - **Table** (`table`): [`PendingCallTable`], the single owner of every
//!   outstanding call
//! - **Reply** (`reply`): [`PendingReply`], the future a caller awaits
//!
//! ## Invariants
//!
//! - **INVARIANT-1**: at most one live entry per correlation id; a duplicate
//!   registration is rejected and leaves the live entry untouched
//! - **INVARIANT-2**: an entry settles exactly once (reply, error, timeout or
//!   cancellation) and is removed when it does
//! - **INVARIANT-3**: a reply for an id that is not pending is stale: counted,
//!   logged and dropped
//! - **INVARIANT-4**: dropping a `PendingReply` removes its entry and timer

pub mod domain;
pub mod reply;
pub mod table;

pub use domain::{CallInfo, CallResult, PendingStats, Reply};
pub use reply::PendingReply;
pub use table::PendingCallTable;
