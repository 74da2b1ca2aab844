//! Workload generators.

use cairn_common::types::PageId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One step of a page access workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOp {
    /// Read the page under a shared latch.
    Read(PageId),
    /// Bump the page's counter under an exclusive latch.
    Increment(PageId),
}

impl PageOp {
    /// The page this step touches.
    pub fn page_id(self) -> PageId {
        match self {
            PageOp::Read(id) | PageOp::Increment(id) => id,
        }
    }
}

/// Generates random reads and increments over a fixed set of pages.
///
/// A fraction of accesses goes to a small hot set so that the pool sees
/// both repeated hits and a steady stream of evictions.
#[derive(Debug)]
pub struct PageWorkload {
    rng: StdRng,
    num_pages: u64,
    hot_pages: u64,
    write_ratio: f64,
}

impl PageWorkload {
    /// Creates a deterministic workload over pages `0..num_pages`.
    pub fn new(seed: u64, num_pages: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            num_pages,
            hot_pages: (num_pages / 8).max(1),
            write_ratio: 0.3,
        }
    }

    /// Sets the fraction of steps that are increments.
    pub fn with_write_ratio(mut self, ratio: f64) -> Self {
        self.write_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Produces the next step.
    pub fn next_op(&mut self) -> PageOp {
        let page = if self.rng.gen_bool(0.5) {
            self.rng.gen_range(0..self.hot_pages)
        } else {
            self.rng.gen_range(0..self.num_pages)
        };
        let page_id = PageId::new(page);

        if self.rng.gen_bool(self.write_ratio) {
            PageOp::Increment(page_id)
        } else {
            PageOp::Read(page_id)
        }
    }
}

impl Iterator for PageWorkload {
    type Item = PageOp;

    fn next(&mut self) -> Option<PageOp> {
        Some(self.next_op())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a: Vec<_> = PageWorkload::new(3, 100).take(50).collect();
        let b: Vec<_> = PageWorkload::new(3, 100).take(50).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pages_in_range() {
        let workload = PageWorkload::new(1, 10).with_write_ratio(1.0);
        for op in workload.take(200) {
            assert!(op.page_id().as_u64() < 10);
            assert!(matches!(op, PageOp::Increment(_)));
        }
    }
}
