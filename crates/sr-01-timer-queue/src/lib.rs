//! # SR-01 Timer Queue
//!
//! Deferred callbacks for a single dispatch thread.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): the deadline-ordered [`TimerSchedule`], no clock
//! - **Queue** (`queue`): [`TimerQueue`], the `Rc` handle shared by the
//!   dispatcher and the pending-call table, plus its async driver
//!
//! ## Invariants
//!
//! - **INVARIANT-1**: a callback never fires before its deadline
//! - **INVARIANT-2**: each callback fires at most once, and never after `cancel`
//! - **INVARIANT-3**: timers fire in nondecreasing deadline order; equal
//!   deadlines fire in scheduling order
//! - **INVARIANT-4**: callbacks run one at a time on the driving thread
//!
//! ## Usage Example
//!
//! ```ignore
//! use sr_01_timer_queue::TimerQueue;
//! use std::time::Duration;
//!
//! let timers = TimerQueue::new();
//! let handle = timers.schedule(Duration::from_secs(2), || tracing::info!("tick"));
//!
//! // Inside a LocalSet:
//! tokio::task::spawn_local({
//!     let timers = timers.clone();
//!     async move { timers.run().await }
//! });
//!
//! timers.cancel(handle);
//! ```

pub mod domain;
pub mod queue;

pub use domain::{TimerHandle, TimerId, TimerSchedule};
pub use queue::{TimerQueue, TimerStats, MAX_DELAY};
