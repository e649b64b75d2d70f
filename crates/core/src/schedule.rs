//! Time-ordered event queue (the simulation's time table).
//!
//! Events are processed in non-decreasing scheduled-time order; equal-time
//! events keep their creation order (FIFO tie-break), which keeps execution
//! deterministic when output and propagation events coincide. The queue is
//! monotonic from the simulator's point of view: within one run it never
//! yields a time earlier than one it already yielded.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tracing::trace;

/// Closed set of event payloads the simulator can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPayload {
    /// Advance the fire front by the gap since the previous step
    FrontStep,
    /// Invoke the output sink, then reschedule if periodic output is enabled
    EmitOutput,
    /// Hook for external data refresh; currently a no-op
    RefreshLayers,
}

/// One pending entry in the queue.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledEvent {
    /// Scheduled time, seconds from the session's reference origin
    pub time: f64,
    /// Creation order, used as the FIFO tie-break
    pub seq: u64,
    pub payload: EventPayload,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of pending events with a popped-time watermark.
#[derive(Debug)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<ScheduledEvent>>,
    next_seq: u64,
    /// Highest time handed out so far in this run
    watermark: f64,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            watermark: f64::NEG_INFINITY,
        }
    }

    /// Insert an event, assigning the next creation-order sequence number.
    pub fn insert(&mut self, time: f64, payload: EventPayload) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        trace!(time, seq, ?payload, "event scheduled");
        self.heap.push(Reverse(ScheduledEvent { time, seq, payload }));
        seq
    }

    /// Next scheduled time without removal, or `None` when empty.
    pub fn peek_next_time(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(e)| e.time)
    }

    /// Whether any pending event carries the given payload.
    pub fn contains(&self, payload: EventPayload) -> bool {
        self.heap.iter().any(|Reverse(e)| e.payload == payload)
    }

    /// Remove and return the single next event due at or before `now`.
    ///
    /// The simulator drains one event at a time so that entries an event
    /// re-inserts (periodic output, the next propagation step) are still
    /// considered within the same advance call.
    pub fn pop_next_due(&mut self, now: f64) -> Option<ScheduledEvent> {
        if self.peek_next_time()? > now {
            return None;
        }
        let Reverse(event) = self.heap.pop()?;
        debug_assert!(
            event.time >= self.watermark,
            "event queue handed out times out of order"
        );
        self.watermark = self.watermark.max(event.time);
        Some(event)
    }

    /// Remove and return every event due at or before `now`, in order.
    pub fn pop_due(&mut self, now: f64) -> Vec<ScheduledEvent> {
        let mut due = Vec::new();
        while let Some(event) = self.pop_next_due(now) {
            due.push(event);
        }
        due
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
