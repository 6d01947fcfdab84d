//! `spec.md` §4.2 EventQueue: a min-heap ordered by simulated timestamp,
//! ties broken by FIFO insertion order.

use crate::event::Event;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// A total-ordered wrapper around `f64` simulated time. The simulator never
/// schedules a NaN timestamp, so this is safe to treat as totally ordered.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedTime(f64);

impl Eq for OrderedTime {}

impl PartialOrd for OrderedTime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedTime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(std::cmp::Ordering::Equal)
    }
}

struct Entry {
    time: OrderedTime,
    sequence: u64,
    event: Event,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.sequence == other.sequence
    }
}
impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Ascending time, then ascending insertion sequence — `BinaryHeap`
        // is a max-heap, so `pop_min` wraps entries in `Reverse`.
        self.time.cmp(&other.time).then(self.sequence.cmp(&other.sequence))
    }
}

/// `spec.md` §4.2: `push`, `pop_min`, `is_empty`. The simulator clock
/// equals the timestamp of the most recently popped event.
#[derive(Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    next_sequence: u64,
    clock: f64,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue {
            heap: BinaryHeap::new(),
            next_sequence: 0,
            clock: 0.0,
        }
    }

    pub fn push(&mut self, event: Event) {
        let entry = Entry {
            time: OrderedTime(event.time),
            sequence: self.next_sequence,
            event,
        };
        self.next_sequence += 1;
        self.heap.push(Reverse(entry));
    }

    pub fn pop_min(&mut self) -> Option<Event> {
        let Reverse(entry) = self.heap.pop()?;
        self.clock = entry.time.0;
        Some(entry.event)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// The timestamp of the most recently popped event.
    pub fn clock(&self) -> f64 {
        self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlab_core::{Block, NodeId};
    use num_bigint::BigUint;

    fn dummy_block() -> Block {
        Block::genesis(
            NodeId(0),
            ledgerlab_core::BlockId(BigUint::from(1u32)),
            BigUint::from(1u32),
        )
    }

    #[test]
    fn pops_in_ascending_time_order() {
        let mut q = EventQueue::new();
        q.push(Event::create_block(3.0, dummy_block()));
        q.push(Event::create_block(1.0, dummy_block()));
        q.push(Event::create_block(2.0, dummy_block()));
        assert_eq!(q.pop_min().unwrap().time, 1.0);
        assert_eq!(q.pop_min().unwrap().time, 2.0);
        assert_eq!(q.pop_min().unwrap().time, 3.0);
        assert!(q.pop_min().is_none());
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let mut q = EventQueue::new();
        q.push(Event::receive_block(1.0, dummy_block(), NodeId(9)));
        q.push(Event::receive_block(1.0, dummy_block(), NodeId(1)));
        assert_eq!(q.pop_min().unwrap().node, Some(NodeId(9)));
        assert_eq!(q.pop_min().unwrap().node, Some(NodeId(1)));
    }

    #[test]
    fn clock_tracks_most_recently_popped_event() {
        let mut q = EventQueue::new();
        assert_eq!(q.clock(), 0.0);
        q.push(Event::create_block(5.0, dummy_block()));
        q.pop_min();
        assert_eq!(q.clock(), 5.0);
    }
}
