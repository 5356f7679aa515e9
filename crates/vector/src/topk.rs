//! Bounded top-K collection over an unbounded candidate stream.
//!
//! Ordering keys live next to the payload, never inside it: payloads do not
//! need to be comparable. Equal scores are ordered by a random `u64` drawn at
//! insertion time, so ties resolve arbitrarily but consistently.

use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// `(score, tiebreak)`, compared lexicographically
type RankKey = (OrderedFloat<f32>, u64);

struct Ranked<T> {
    key: RankKey,
    payload: T,
}

impl<T> PartialEq for Ranked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Ranked<T> {}

impl<T> Ord for Ranked<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl<T> PartialOrd for Ranked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Keeps the `capacity` highest-scoring payloads seen so far
pub struct TopK<T> {
    capacity: usize,
    // Min-heap: the root is the current worst retained item
    heap: BinaryHeap<Reverse<Ranked<T>>>,
    rng: StdRng,
}

impl<T> TopK<T> {
    /// Collector with OS-seeded tie-breaking
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_os_rng())
    }

    /// Collector with reproducible tie-breaking
    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        Self {
            capacity,
            // Grows with the stream, never preallocated from `capacity`
            heap: BinaryHeap::new(),
            rng,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Lowest retained score, once the collector is full
    pub fn threshold(&self) -> Option<f32> {
        if self.heap.len() < self.capacity {
            return None;
        }
        self.heap.peek().map(|Reverse(worst)| worst.key.0.into_inner())
    }

    /// Insert `payload`, evicting the current minimum if over capacity
    pub fn offer(&mut self, score: f32, payload: T) {
        if self.capacity == 0 {
            return;
        }
        let tiebreak = self.rng.random::<u64>();
        self.heap.push(Reverse(Ranked {
            key: (OrderedFloat(score), tiebreak),
            payload,
        }));

        if self.heap.len() > self.capacity {
            self.heap.pop();
        }
    }

    /// Retained payloads, best first
    pub fn drain(self) -> Vec<T> {
        // Ascending order of Reverse<_> is descending order of the keys
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(ranked)| ranked.payload)
            .collect()
    }
}
