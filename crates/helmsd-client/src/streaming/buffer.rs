//! Bounded ring buffer with monotonic sequence numbering
//!
//! Single writer (the reader's ingest path), many readers (cursors). The
//! buffer retains the `capacity` most recent records; at capacity the oldest
//! record is evicted before insertion. Sequence numbers are assigned at
//! insertion, start at 1, and are never reused or reset.

use std::collections::VecDeque;
use std::sync::Arc;

use super::types::StreamRecord;

#[derive(Debug)]
pub(crate) struct RingBuffer<T> {
    records: VecDeque<StreamRecord<T>>,
    capacity: usize,
    next_seq: u64,
}

impl<T> RingBuffer<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be positive");
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 1,
        }
    }

    /// Append a record, evicting the oldest at capacity; returns its sequence
    pub(crate) fn push(&mut self, payload: T) -> u64 {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.push_back(StreamRecord {
            seq,
            payload: Arc::new(payload),
        });
        seq
    }

    /// The oldest retained record newer than `seq`
    ///
    /// A cursor that has fallen behind the retention window lands on the
    /// oldest retained record; the sequence delta makes the gap observable.
    pub(crate) fn first_after(&self, seq: u64) -> Option<StreamRecord<T>> {
        let head = self.records.front()?.seq;
        if seq < head {
            return self.records.front().cloned();
        }
        // Sequences are contiguous within the buffer, so index directly.
        let index = (seq - head + 1) as usize;
        self.records.get(index).cloned()
    }

    /// Highest sequence assigned so far (0 before the first record)
    pub(crate) fn latest_seq(&self) -> u64 {
        self.next_seq - 1
    }

    /// Copy of the retained window, oldest first
    pub(crate) fn snapshot(&self) -> Vec<StreamRecord<T>> {
        self.records.iter().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn payloads(buffer: &RingBuffer<&'static str>) -> Vec<(u64, &'static str)> {
        buffer
            .snapshot()
            .into_iter()
            .map(|r| (r.seq, *r.payload))
            .collect()
    }

    #[test]
    fn test_eviction_keeps_most_recent() {
        let mut buffer = RingBuffer::new(3);
        for payload in ["A", "B", "C", "D"] {
            buffer.push(payload);
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(payloads(&buffer), vec![(2, "B"), (3, "C"), (4, "D")]);
    }

    #[test]
    fn test_sequences_never_reset() {
        let mut buffer = RingBuffer::new(2);
        for i in 0..10 {
            let seq = buffer.push(i);
            assert_eq!(seq, i + 1);
        }
        assert_eq!(buffer.latest_seq(), 10);
        assert_eq!(buffer.snapshot()[0].seq, 9);
    }

    #[test]
    fn test_first_after_within_window() {
        let mut buffer = RingBuffer::new(4);
        for payload in ["A", "B", "C"] {
            buffer.push(payload);
        }

        let record = buffer.first_after(1).unwrap();
        assert_eq!((record.seq, *record.payload), (2, "B"));
        assert!(buffer.first_after(3).is_none());
    }

    #[test]
    fn test_first_after_skips_to_oldest_on_lag() {
        let mut buffer = RingBuffer::new(2);
        for payload in ["A", "B", "C", "D", "E"] {
            buffer.push(payload);
        }

        // Cursor at seq 1 lags past the window; lands on the oldest retained.
        let record = buffer.first_after(1).unwrap();
        assert_eq!((record.seq, *record.payload), (4, "D"));
    }

    #[test]
    fn test_empty_buffer() {
        let buffer: RingBuffer<&str> = RingBuffer::new(3);
        assert_eq!(buffer.latest_seq(), 0);
        assert!(buffer.first_after(0).is_none());
    }
}
