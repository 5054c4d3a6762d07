//! Timer queue bound to the dispatch thread.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use crate::domain::{TimerHandle, TimerSchedule};

type Callback = Box<dyn FnOnce()>;

/// Longest delay honoured; longer delays, `Duration::MAX` included, are
/// clamped to it. Same horizon as tokio's own far-future sleep.
pub const MAX_DELAY: Duration = Duration::from_secs(86_400 * 365 * 30);

struct Shared {
    schedule: RefCell<TimerSchedule<Callback>>,
    /// Signalled when a new earliest deadline appears.
    rearm: Notify,
    fired: Cell<u64>,
    cancelled: Cell<u64>,
}

/// Counters since the queue was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStats {
    pub scheduled: u64,
    pub fired: u64,
    pub cancelled: u64,
    pub live: usize,
}

/// Deferred callbacks for one dispatch thread.
///
/// Cloning yields another handle to the same queue. The queue is `!Send`;
/// callbacks run on the thread that drives it, one at a time.
#[derive(Clone)]
pub struct TimerQueue {
    shared: Rc<Shared>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                schedule: RefCell::new(TimerSchedule::new()),
                rearm: Notify::new(),
                fired: Cell::new(0),
                cancelled: Cell::new(0),
            }),
        }
    }

    /// Run `callback` once, no earlier than `delay` from now.
    ///
    /// Delays above [`MAX_DELAY`] are clamped, so `Duration::MAX` means
    /// "effectively never".
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + 'static,
    {
        self.schedule_at(deadline_after(delay), callback)
    }

    /// Run `callback` once, no earlier than `deadline`.
    pub fn schedule_at<F>(&self, deadline: Instant, callback: F) -> TimerHandle
    where
        F: FnOnce() + 'static,
    {
        let mut schedule = self.shared.schedule.borrow_mut();
        let previous = schedule.next_deadline();
        let handle = schedule.insert(deadline, Box::new(callback));
        drop(schedule);

        if previous.map_or(true, |earliest| deadline < earliest) {
            self.shared.rearm.notify_one();
        }

        trace!(timer = %handle.id(), "Timer scheduled");
        handle
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        let removed = self.shared.schedule.borrow_mut().remove(handle.id());
        match removed {
            Some(callback) => {
                self.shared.cancelled.set(self.shared.cancelled.get() + 1);
                trace!(timer = %handle.id(), "Timer cancelled");
                // The callback may own values whose Drop touches this queue.
                drop(callback);
                true
            }
            None => false,
        }
    }

    /// Whether the timer is still waiting to fire.
    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.shared.schedule.borrow().contains(handle.id())
    }

    /// Fire every timer whose deadline is `<= now`, in deadline order.
    ///
    /// Callbacks may schedule or cancel timers; newly scheduled timers that
    /// are already due fire in the same pass.
    pub fn fire_due(&self, now: Instant) -> usize {
        let mut fired = 0;
        loop {
            let due = self.shared.schedule.borrow_mut().pop_due(now);
            let Some((id, callback)) = due else {
                break;
            };
            trace!(timer = %id, "Timer fired");
            callback();
            fired += 1;
        }

        if fired > 0 {
            self.shared.fired.set(self.shared.fired.get() + fired as u64);
            debug!(fired, remaining = self.len(), "Fired due timers");
        }
        fired
    }

    /// Deadline of the earliest live timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.shared.schedule.borrow_mut().next_deadline()
    }

    /// Number of live timers.
    pub fn len(&self) -> usize {
        self.shared.schedule.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> TimerStats {
        let fired = self.shared.fired.get();
        let cancelled = self.shared.cancelled.get();
        let live = self.len();
        TimerStats {
            scheduled: fired + cancelled + live as u64,
            fired,
            cancelled,
            live,
        }
    }

    /// Drop every pending timer without running it.
    pub fn clear(&self) -> usize {
        let callbacks = self.shared.schedule.borrow_mut().drain();
        let dropped = callbacks.len();
        self.shared
            .cancelled
            .set(self.shared.cancelled.get() + dropped as u64);
        // Dropped outside the borrow, as in `cancel`.
        drop(callbacks);
        dropped
    }

    /// Drive the queue forever.
    ///
    /// Sleeps until the earliest deadline, fires what is due, and wakes early
    /// when an earlier timer is scheduled. Dropping the future stops the
    /// driver; no timer is lost because all state lives in the queue.
    pub async fn run(&self) {
        loop {
            match self.next_deadline() {
                Some(deadline) => {
                    tokio::select! {
                        _ = sleep_until(deadline) => {
                            self.fire_due(Instant::now());
                        }
                        _ = self.shared.rearm.notified() => {}
                    }
                }
                None => self.shared.rearm.notified().await,
            }
        }
    }
}

/// `now + delay`, clamped to [`MAX_DELAY`].
fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay.min(MAX_DELAY))
        .unwrap_or_else(|| now + MAX_DELAY)
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("live", &self.len())
            .field("next_deadline", &self.next_deadline())
            .finish()
    }
}
