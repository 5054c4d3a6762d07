//! Deadline-ordered schedule.
//!
//! A binary min-heap keyed by `(fire_at, sequence)` plus a map of live
//! entries. Cancellation only removes the map entry; the heap slot is skipped
//! when it reaches the top.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use tokio::time::Instant;

use super::handle::{TimerHandle, TimerId};

/// Pure timer bookkeeping, no clock and no I/O.
#[derive(Debug)]
pub struct TimerSchedule<T> {
    heap: BinaryHeap<Reverse<(Instant, TimerId)>>,
    live: HashMap<TimerId, T>,
    next_sequence: u64,
}

impl<T> TimerSchedule<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            next_sequence: 0,
        }
    }

    /// Add an entry due at `fire_at`.
    pub fn insert(&mut self, fire_at: Instant, payload: T) -> TimerHandle {
        let id = TimerId(self.next_sequence);
        self.next_sequence += 1;

        self.heap.push(Reverse((fire_at, id)));
        self.live.insert(id, payload);

        TimerHandle { id, fire_at }
    }

    /// Remove a live entry. Returns the payload if it had not fired yet.
    pub fn remove(&mut self, id: TimerId) -> Option<T> {
        self.live.remove(&id)
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.live.contains_key(&id)
    }

    /// Pop the earliest live entry whose deadline is `<= now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, T)> {
        while let Some(Reverse((fire_at, id))) = self.heap.peek().copied() {
            if fire_at > now {
                return None;
            }
            self.heap.pop();
            if let Some(payload) = self.live.remove(&id) {
                return Some((id, payload));
            }
        }
        None
    }

    /// Deadline of the earliest live entry.
    ///
    /// Discards cancelled slots sitting on top of the heap.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(Reverse((fire_at, id))) = self.heap.peek().copied() {
            if self.live.contains_key(&id) {
                return Some(fire_at);
            }
            self.heap.pop();
        }
        None
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Heap slots including cancelled ones not yet skipped.
    pub fn slots(&self) -> usize {
        self.heap.len()
    }

    /// Remove every entry and hand the payloads back to the caller.
    pub fn drain(&mut self) -> Vec<T> {
        self.heap.clear();
        self.live.drain().map(|(_, payload)| payload).collect()
    }
}

impl<T> Default for TimerSchedule<T> {
    fn default() -> Self {
        Self::new()
    }
}
