//! FIFO of received batches awaiting drain

use crate::types::ReadingBatch;
use std::collections::VecDeque;

/// Queue between the push channel and the chart
///
/// Unbounded unless a capacity is given. With a capacity, enqueuing into a
/// full buffer evicts the oldest batch and counts it as dropped.
#[derive(Debug, Clone, Default)]
pub struct ReadingBuffer {
    queue: VecDeque<ReadingBatch>,
    capacity: Option<usize>,
    dropped: u64,
}

impl ReadingBuffer {
    /// A capacity of zero is treated as unbounded
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            queue: VecDeque::new(),
            capacity: capacity.filter(|c| *c > 0),
            dropped: 0,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Append a batch at the tail, returning the evicted head if full
    pub fn enqueue(&mut self, batch: ReadingBatch) -> Option<ReadingBatch> {
        let evicted = match self.capacity {
            Some(cap) if self.queue.len() >= cap => {
                self.dropped += 1;
                self.queue.pop_front()
            }
            _ => None,
        };
        self.queue.push_back(batch);
        evicted
    }

    /// Remove the oldest batch
    pub fn dequeue_one(&mut self) -> Option<ReadingBatch> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Batches evicted so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
