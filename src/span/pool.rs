//! Max-priority pool of closed spans.
//!
//! Only the heaviest spans matter for the report, so closed spans go into a
//! binary heap instead of a sorted list: O(log n) to insert at close time,
//! O(log n) to pull out exactly as many as the report needs.

use super::node::SpanId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy)]
struct LeafEntry {
    delta: f64,
    /// Insertion sequence; equal deltas pop in insertion order
    seq: u64,
    id: SpanId,
}

impl PartialEq for LeafEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LeafEntry {}

impl PartialOrd for LeafEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LeafEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.delta
            .total_cmp(&other.delta)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Closed spans of one metric, extracted heaviest first
#[derive(Debug, Default)]
pub struct LeafPool {
    heap: BinaryHeap<LeafEntry>,
    next_seq: u64,
}

impl LeafPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: SpanId, delta: f64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(LeafEntry { delta, seq, id });
    }

    /// Remove and return the span with the largest delta
    ///
    /// Ties go to the span inserted first. `None` once the pool is empty.
    pub fn pop_max(&mut self) -> Option<SpanId> {
        self.heap.pop().map(|entry| entry.id)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(pool: &mut LeafPool) -> Vec<SpanId> {
        std::iter::from_fn(|| pool.pop_max()).collect()
    }

    #[test]
    fn test_pops_descending() {
        let mut pool = LeafPool::new();
        pool.insert(SpanId::new(0), 5.0);
        pool.insert(SpanId::new(1), 50.0);
        pool.insert(SpanId::new(2), -3.0);
        pool.insert(SpanId::new(3), 20.0);

        assert_eq!(pool.len(), 4);
        assert_eq!(
            drain(&mut pool),
            vec![SpanId::new(1), SpanId::new(3), SpanId::new(0), SpanId::new(2)]
        );
        assert!(pool.is_empty());
    }

    #[test]
    fn test_ties_pop_in_insertion_order() {
        let mut pool = LeafPool::new();
        for i in 0..5 {
            pool.insert(SpanId::new(i), 7.0);
        }
        pool.insert(SpanId::new(9), 8.0);

        assert_eq!(
            drain(&mut pool),
            vec![
                SpanId::new(9),
                SpanId::new(0),
                SpanId::new(1),
                SpanId::new(2),
                SpanId::new(3),
                SpanId::new(4)
            ]
        );
    }

    #[test]
    fn test_empty_pool() {
        let mut pool = LeafPool::new();
        assert_eq!(pool.pop_max(), None);
        assert!(pool.is_empty());
    }
}
