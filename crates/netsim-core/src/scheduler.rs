use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::error::SchedulerError;

/// Opaque handle returned by [`Scheduler::add`]. Pass it to
/// [`Scheduler::cancel`] to mark the event inactive; a cancelled entry
/// stays in the heap and is silently discarded the moment it would
/// otherwise pop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchedulerHandle(u64);

/// A single heap entry: (deadline, insertion sequence, payload). The
/// payload doubles as "handler identity" — rather than dispatching to an
/// arbitrary callable, callers define one enum covering every kind of
/// event their simulation needs and match on it after popping (see
/// `netsim-core::event::SimEvent`).
struct HeapEntry<T> {
    time: f64,
    seq: u64,
    payload: T,
}

impl<T> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}
impl<T> Eq for HeapEntry<T> {}

impl<T> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the smallest deadline pops
        // first, ties broken by insertion order (smallest seq first).
        other
            .time
            .partial_cmp(&self.time)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Single-threaded, deterministic discrete-event engine: a min-heap of
/// future events driving simulated time forward. Generic over the event
/// payload so it can be unit-tested in isolation from any particular
/// simulation's packet/timer/link types.
pub struct Scheduler<T> {
    time: f64,
    heap: BinaryHeap<HeapEntry<T>>,
    next_seq: u64,
    cancelled: HashSet<u64>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            heap: BinaryHeap::new(),
            next_seq: 0,
            cancelled: HashSet::new(),
        }
    }

    /// Simulated seconds since the last `reset()`.
    pub fn current_time(&self) -> f64 {
        self.time
    }

    pub fn remaining_events(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Clears the heap and resets simulated time to zero.
    pub fn reset(&mut self) {
        self.heap.clear();
        self.time = 0.0;
        self.next_seq = 0;
        self.cancelled.clear();
    }

    /// Schedules `payload` to fire at `current_time() + delay`. `delay`
    /// must be non-negative. Two events with equal deadlines fire in the
    /// order they were added.
    pub fn add(&mut self, delay: f64, payload: T) -> Result<SchedulerHandle, SchedulerError> {
        if delay < 0.0 {
            return Err(SchedulerError::NegativeDelay { delay });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(HeapEntry {
            time: self.time + delay,
            seq,
            payload,
        });
        Ok(SchedulerHandle(seq))
    }

    /// Marks an event inactive. A no-op if it has already fired or been
    /// cancelled; idempotent by design.
    pub fn cancel(&mut self, handle: SchedulerHandle) {
        self.cancelled.insert(handle.0);
    }

    /// Pops the earliest active event, advancing `current_time` to its
    /// deadline. Cancelled entries are discarded transparently. Returns
    /// `None` once the heap is empty.
    pub fn pop_next(&mut self) -> Option<(f64, T)> {
        loop {
            let entry = self.heap.pop()?;
            if self.cancelled.remove(&entry.seq) {
                continue;
            }
            self.time = entry.time;
            return Some((entry.time, entry.payload));
        }
    }

    /// Runs to completion, invoking `handler` for every active event in
    /// deadline order. `handler` receives the scheduler back so it may
    /// post further events (possibly at delay 0, which enqueue behind
    /// everything already posted for the same timestamp).
    pub fn run(&mut self, mut handler: impl FnMut(&mut Scheduler<T>, T)) {
        while let Some((_, payload)) = self.pop_next() {
            handler(self, payload);
        }
    }
}
