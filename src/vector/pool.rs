//! Per-index pool of search scratch space.
//!
//! Every beam search needs a candidate min-heap, a bounded result max-heap and
//! a visited set. Allocating them per query churns the allocator, so each
//! [`VectorIndex`](super::VectorIndex) owns a [`ScratchPool`] and lends out
//! [`PooledScratch`] guards that hand the buffers back when dropped.

use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// Upper bound on idle scratch buffers kept per index.
const DEFAULT_MAX_IDLE: usize = 8;

/// Generation-stamped visited set with O(1) reset.
#[derive(Debug, Default)]
pub struct VisitedSet {
    marks: Vec<u32>,
    generation: u32,
}

impl VisitedSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            marks: vec![0; capacity],
            generation: 1,
        }
    }

    /// Forget every visit. Only touches memory when the generation wraps.
    pub fn clear(&mut self) {
        if self.generation == u32::MAX {
            self.marks.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    pub fn ensure_capacity(&mut self, capacity: usize) {
        if capacity > self.marks.len() {
            self.marks.resize(capacity, 0);
        }
    }

    /// Returns `true` if `slot` had not been visited yet.
    #[inline]
    pub fn insert(&mut self, slot: u32) -> bool {
        let idx = slot as usize;
        if self.marks[idx] == self.generation {
            false
        } else {
            self.marks[idx] = self.generation;
            true
        }
    }
}

/// Buffers for one beam search.
#[derive(Debug, Default)]
pub struct SearchScratch {
    /// Nodes still to expand, closest first.
    pub candidates: BinaryHeap<Reverse<(OrderedFloat<f32>, u32)>>,
    /// Best nodes seen so far, farthest on top so it can be evicted.
    pub results: BinaryHeap<(OrderedFloat<f32>, u32)>,
    pub visited: VisitedSet,
}

impl SearchScratch {
    /// Prepare for a search over an index with `node_count` slots.
    pub fn reset(&mut self, node_count: usize) {
        self.candidates.clear();
        self.results.clear();
        self.visited.ensure_capacity(node_count);
        self.visited.clear();
    }
}

/// Pool of reusable [`SearchScratch`] buffers.
#[derive(Debug)]
pub struct ScratchPool {
    idle: Mutex<Vec<SearchScratch>>,
    max_idle: usize,
}

impl ScratchPool {
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Borrow a scratch buffer for the lifetime of the returned guard.
    pub fn acquire(&self) -> PooledScratch<'_> {
        let scratch = self
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop()
            .unwrap_or_default();
        PooledScratch {
            scratch,
            pool: self,
        }
    }

    /// Number of idle buffers waiting to be reused.
    pub fn idle_count(&self) -> usize {
        self.idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn release(&self, mut scratch: SearchScratch) {
        scratch.candidates.clear();
        scratch.results.clear();
        let mut idle = self
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if idle.len() < self.max_idle {
            idle.push(scratch);
        }
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE)
    }
}

/// Scoped loan of a [`SearchScratch`]; returned to its pool on drop.
pub struct PooledScratch<'a> {
    scratch: SearchScratch,
    pool: &'a ScratchPool,
}

impl Deref for PooledScratch<'_> {
    type Target = SearchScratch;

    fn deref(&self) -> &SearchScratch {
        &self.scratch
    }
}

impl DerefMut for PooledScratch<'_> {
    fn deref_mut(&mut self) -> &mut SearchScratch {
        &mut self.scratch
    }
}

impl Drop for PooledScratch<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.scratch));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visited_insert_and_clear() {
        let mut visited = VisitedSet::new(16);
        assert!(visited.insert(3));
        assert!(!visited.insert(3));
        visited.clear();
        assert!(visited.insert(3));
    }

    #[test]
    fn test_visited_generation_wrap() {
        let mut visited = VisitedSet::new(4);
        visited.generation = u32::MAX - 1;
        visited.clear();
        assert!(visited.insert(1));
        visited.clear();
        assert_eq!(visited.generation, 1);
        assert!(visited.insert(1));
    }

    #[test]
    fn test_guard_returns_buffer() {
        let pool = ScratchPool::new(2);
        assert_eq!(pool.idle_count(), 0);
        {
            let mut scratch = pool.acquire();
            scratch.reset(10);
            scratch.results.push((OrderedFloat(0.5), 1));
        }
        assert_eq!(pool.idle_count(), 1);

        let scratch = pool.acquire();
        assert!(scratch.results.is_empty());
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_pool_caps_idle_buffers() {
        let pool = ScratchPool::new(1);
        {
            let _a = pool.acquire();
            let _b = pool.acquire();
        }
        assert_eq!(pool.idle_count(), 1);
    }
}
