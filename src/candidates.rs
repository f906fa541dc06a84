//! A capacity-bounded max-heap of `(distance, payload)` candidates.
//!
//! During a k-NN search this holds the k best candidates seen so far. Once
//! full, the root of the heap is the worst retained distance, which the
//! query engine uses as its pruning threshold: a subtree whose lower bound
//! exceeds it cannot contribute a result.

use crate::{Error, Result};
use itertools::Itertools;

pub struct CandidateHeap<T> {
    cap: usize,
    /// Binary max-heap ordered by distance; `entries[0]` is the worst
    /// retained candidate once the heap is full.
    entries: Vec<(f64, T)>,
}

impl<T> CandidateHeap<T> {
    /// Makes an empty heap retaining at most `cap` candidates.
    ///
    /// ```
    /// # use sstree::CandidateHeap;
    /// let heap = CandidateHeap::<u32>::new(3).unwrap();
    /// assert_eq!(heap.len(), 0);
    /// ```
    pub fn new(cap: usize) -> Result<Self> {
        if cap == 0 {
            return Err(Error::InvalidArgument("candidate capacity must be positive"));
        }
        Ok(Self {
            cap,
            entries: Vec::with_capacity(cap),
        })
    }

    /// Offers a candidate. It is kept if the heap still has room or if it
    /// beats the current worst retained distance; otherwise it is discarded
    /// with no side effect. Candidates tied with the worst distance may be
    /// evicted in any order.
    pub fn push(&mut self, distance: f64, payload: T) {
        if self.entries.len() < self.cap {
            self.entries.push((distance, payload));
            self.sift_up(self.entries.len() - 1);
        } else if distance < self.entries[0].0 {
            self.entries[0] = (distance, payload);
            self.sift_down(0);
        }
    }

    /// The current worst retained distance, or `None` while the heap is not
    /// yet full. While fewer than `cap` candidates are held every subtree may
    /// still contribute, so callers must not prune.
    pub fn worst(&self) -> Option<f64> {
        if self.entries.len() == self.cap {
            Some(self.entries[0].0)
        } else {
            None
        }
    }

    /// Number of candidates currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the heap, yielding payloads ordered by ascending distance.
    pub fn into_sorted(self) -> Vec<T> {
        self.entries
            .into_iter()
            .sorted_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, payload)| payload)
            .collect()
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.entries[pos].0 > self.entries[parent].0 {
                self.entries.swap(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        loop {
            let mut child = 2 * pos + 1;
            if child >= self.entries.len() {
                break;
            }
            let right = child + 1;
            if right < self.entries.len() && self.entries[right].0 > self.entries[child].0 {
                child = right;
            }
            if self.entries[child].0 > self.entries[pos].0 {
                self.entries.swap(pos, child);
                pos = child;
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_capacity() {
        assert!(CandidateHeap::<u32>::new(0).is_err());
    }

    #[test]
    fn keeps_the_best_k() {
        let mut heap = CandidateHeap::new(3).unwrap();
        for (distance, payload) in [(5.0, 'e'), (1.0, 'a'), (4.0, 'd'), (2.0, 'b'), (3.0, 'c')]
            .iter()
            .cloned()
        {
            heap.push(distance, payload);
        }
        assert_eq!(heap.into_sorted(), vec!['a', 'b', 'c']);
    }

    #[test]
    fn worst_is_none_until_full() {
        let mut heap = CandidateHeap::new(2).unwrap();
        assert_eq!(heap.worst(), None);
        heap.push(3.0, ());
        assert_eq!(heap.worst(), None);
        heap.push(1.0, ());
        assert_eq!(heap.worst(), Some(3.0));
        // A better candidate evicts the worst and tightens the threshold.
        heap.push(2.0, ());
        assert_eq!(heap.worst(), Some(2.0));
        // A worse candidate is discarded.
        heap.push(9.0, ());
        assert_eq!(heap.worst(), Some(2.0));
    }

    #[test]
    fn drains_in_ascending_order() {
        let mut heap = CandidateHeap::new(8).unwrap();
        for n in 0..8u32 {
            heap.push(f64::from((n * 7) % 8), n);
        }
        let drained = heap.into_sorted();
        let mut expected: Vec<u32> = (0..8).collect();
        expected.sort_by_key(|&n| (n * 7) % 8);
        assert_eq!(drained, expected);
    }
}
