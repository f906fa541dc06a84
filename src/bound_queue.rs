//! Work queue for the branch-and-bound k-NN traversal.
//!
//! Entries are `(lower bound, node index)` pairs kept sorted by descending
//! bound, so popping from the tail always yields the most promising node.
//! Processing smallest-bound-first fills the candidate heap early, which
//! tightens the pruning threshold sooner.

pub(crate) struct BoundQueue {
    /// Sorted by descending bound; the tail holds the smallest.
    entries: Vec<(f64, u32)>,
}

impl BoundQueue {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, bound: f64, node: u32) {
        let at = self.entries.partition_point(|&(b, _)| b > bound);
        self.entries.insert(at, (bound, node));
    }

    /// Pops the entry with the smallest lower bound.
    pub fn pop(&mut self) -> Option<(f64, u32)> {
        self.entries.pop()
    }

    /// Drops every entry whose bound exceeds `worst`. A node whose bounding
    /// ball lies entirely beyond the k-th best distance cannot contain a
    /// result.
    pub fn prune(&mut self, worst: f64) {
        self.entries.retain(|&(bound, _)| bound <= worst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_smallest_bound_first() {
        let mut queue = BoundQueue::new();
        queue.push(3.0, 3);
        queue.push(1.0, 1);
        queue.push(2.0, 2);
        queue.push(0.0, 0);
        let order: Vec<u32> = std::iter::from_fn(|| queue.pop()).map(|(_, n)| n).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn prune_drops_everything_beyond_the_threshold() {
        let mut queue = BoundQueue::new();
        for n in 0..6 {
            queue.push(f64::from(n), n as u32);
        }
        queue.prune(2.5);
        let order: Vec<f64> = std::iter::from_fn(|| queue.pop()).map(|(b, _)| b).collect();
        assert_eq!(order, vec![0.0, 1.0, 2.0]);
    }
}
