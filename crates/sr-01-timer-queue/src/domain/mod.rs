//! Timer domain: handles and the deadline-ordered schedule.

pub mod handle;
pub mod schedule;

pub use handle::{TimerHandle, TimerId};
pub use schedule::TimerSchedule;
