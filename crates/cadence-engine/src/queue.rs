//! Pending-event queue with deterministic ordering.
//!
//! [`EventQueue`] knows nothing about wall-clock time. It is an ordinary
//! discrete-event priority queue: events come out ordered by the key
//! `(time, seq)`, where `seq` is assigned from a monotonic counter at
//! insertion. Two events with the same virtual time therefore leave the
//! queue in the order they were inserted.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use cadence_core::{EventSeq, QueueError, SimTime};

/// Ordering key for a queued event.
///
/// Ordered by time first, then by insertion sequence (FIFO).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventKey {
    /// When the event is due, in virtual time.
    pub time: SimTime,
    /// Insertion sequence number.
    pub seq: EventSeq,
}

/// An event removed from the queue.
#[derive(Debug)]
pub struct Event<T> {
    /// When the event is due, in virtual time.
    pub time: SimTime,
    /// Insertion sequence number.
    pub seq: EventSeq,
    /// What to do when it fires.
    pub payload: T,
}

struct Entry<T> {
    key: EventKey,
    payload: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Reversed: BinaryHeap is a max-heap and we want the smallest key on top.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key.cmp(&self.key)
    }
}

/// Min-queue of pending events keyed by `(time, seq)`.
///
/// Generic over the payload so the ordering logic can be exercised
/// without handlers; the scheduler stores boxed handlers.
pub struct EventQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    next_seq: u64,
}

impl<T> EventQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Insert an event, returning its sequence number. O(log n).
    ///
    /// Sequence numbers are strictly increasing across the life of the
    /// queue, including across [`clear`](Self::clear).
    pub fn insert(&mut self, time: SimTime, payload: T) -> EventSeq {
        let seq = EventSeq(self.next_seq);
        self.next_seq += 1;
        self.heap.push(Entry {
            key: EventKey { time, seq },
            payload,
        });
        seq
    }

    /// Remove and return the event with the smallest `(time, seq)`.
    pub fn pop_min(&mut self) -> Result<Event<T>, QueueError> {
        let entry = self.heap.pop().ok_or(QueueError::Empty)?;
        Ok(Event {
            time: entry.key.time,
            seq: entry.key.seq,
            payload: entry.payload,
        })
    }

    /// Time of the next event without removing it.
    pub fn peek_min_time(&self) -> Result<SimTime, QueueError> {
        self.heap
            .peek()
            .map(|e| e.key.time)
            .ok_or(QueueError::Empty)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no events are pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Discard every pending event without running it.
    /// Returns how many were discarded.
    pub fn clear(&mut self) -> usize {
        let n = self.heap.len();
        self.heap.clear();
        n
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EventQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("len", &self.heap.len())
            .field("next_seq", &self.next_seq)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(secs: f64) -> SimTime {
        SimTime::new(secs).unwrap()
    }

    #[test]
    fn empty_queue_errors() {
        let mut q: EventQueue<()> = EventQueue::new();
        assert_eq!(q.peek_min_time(), Err(QueueError::Empty));
        assert!(matches!(q.pop_min(), Err(QueueError::Empty)));
    }

    #[test]
    fn pops_in_time_order() {
        let mut q = EventQueue::new();
        q.insert(t(2.0), "a");
        q.insert(t(2.0), "b");
        q.insert(t(1.0), "c");
        assert_eq!(q.peek_min_time(), Ok(t(1.0)));
        let order: Vec<_> = std::iter::from_fn(|| q.pop_min().ok())
            .map(|e| e.payload)
            .collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn sequence_is_strictly_increasing() {
        let mut q = EventQueue::new();
        let a = q.insert(t(5.0), ());
        let b = q.insert(t(0.0), ());
        q.clear();
        let c = q.insert(t(1.0), ());
        assert!(a < b && b < c);
    }

    #[test]
    fn peek_does_not_remove() {
        let mut q = EventQueue::new();
        q.insert(t(3.0), 1u8);
        assert_eq!(q.peek_min_time(), Ok(t(3.0)));
        assert_eq!(q.len(), 1);
        let e = q.pop_min().unwrap();
        assert_eq!(e.time, t(3.0));
        assert!(q.is_empty());
    }

    #[test]
    fn clear_reports_discarded() {
        let mut q = EventQueue::new();
        for i in 0..4 {
            q.insert(t(i as f64), i);
        }
        assert_eq!(q.clear(), 4);
        assert!(q.is_empty());
    }

    proptest! {
        #[test]
        fn pops_are_sorted_and_fifo(times in prop::collection::vec(0u8..8, 0..64)) {
            let mut q = EventQueue::new();
            for (i, secs) in times.iter().enumerate() {
                q.insert(t(*secs as f64), i);
            }
            let mut last: Option<(SimTime, usize)> = None;
            let mut popped = 0;
            while let Ok(e) = q.pop_min() {
                if let Some((lt, li)) = last {
                    prop_assert!(lt <= e.time);
                    if lt == e.time {
                        prop_assert!(li < e.payload, "equal times must pop FIFO");
                    }
                }
                last = Some((e.time, e.payload));
                popped += 1;
            }
            prop_assert_eq!(popped, times.len());
        }
    }
}
