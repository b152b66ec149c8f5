use std::{cmp::Reverse, collections::BinaryHeap};

#[derive(Clone, Copy, PartialEq)]
struct Scored(f32, u32);

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .total_cmp(&other.0)
            .then_with(|| other.1.cmp(&self.1))
    }
}

/// Keeps the `k` best `(score, id)` pairs in a min-heap, so the weakest kept
/// score is always at hand as the admission threshold.
///
/// Among equal scores the smaller id ranks higher.
pub struct TopKComputer {
    heap: BinaryHeap<Reverse<Scored>>,
    k: usize,
}

impl TopKComputer {
    pub fn new(k: usize) -> Self {
        assert!(k > 0);
        Self {
            heap: BinaryHeap::with_capacity(k + 1),
            k,
        }
    }

    pub fn push(&mut self, score: f32, id: u32) {
        let candidate = Scored(score, id);
        if self.is_full() {
            match self.heap.peek() {
                Some(Reverse(weakest)) if candidate > *weakest => {
                    self.heap.pop();
                }
                _ => return,
            }
        }
        self.heap.push(Reverse(candidate));
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() == self.k
    }

    /// Weakest kept score, or negative infinity until the heap is full.
    pub fn threshold(&self) -> f32 {
        match self.heap.peek() {
            Some(Reverse(weakest)) if self.is_full() => weakest.0,
            _ => f32::NEG_INFINITY,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Kept pairs by descending score.
    pub fn into_sorted_vec(self) -> Vec<(f32, u32)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(Scored(score, id))| (score, id))
            .collect()
    }
}
