//! Block partition of a linear 1-D fiber mesh.
//!
//! A fiber with `n` elements has `n + 1` nodes. Rank `r` holds a contiguous run of elements and
//! owns the first node of each of them; the last rank additionally owns the final node. Every
//! rank but the last keeps one ghost node (the first node of the next rank) to close its last
//! element. Natural node numbers therefore start at the same offset as the element numbers.

use std::ops::Range;

use crate::core::traits::FiberPartition;
use crate::error::FiberError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshPartition1D {
    elements_per_rank: Vec<usize>,
    element_offsets: Vec<usize>,
}

impl MeshPartition1D {
    pub fn from_elements_per_rank(elements_per_rank: Vec<usize>) -> Result<Self, FiberError> {
        if elements_per_rank.is_empty() {
            return Err(FiberError::EmptyRankSubset);
        }
        let element_offsets = elements_per_rank
            .iter()
            .scan(0usize, |acc, &n| {
                let begin = *acc;
                *acc += n;
                Some(begin)
            })
            .collect();
        Ok(Self { elements_per_rank, element_offsets })
    }

    /// Splits `n_elements` as evenly as possible; the first ranks take the remainder.
    pub fn uniform(n_elements: usize, n_ranks: usize) -> Result<Self, FiberError> {
        if n_ranks == 0 {
            return Err(FiberError::EmptyRankSubset);
        }
        let (base, rest) = (n_elements / n_ranks, n_elements % n_ranks);
        Self::from_elements_per_rank((0..n_ranks).map(|r| base + usize::from(r < rest)).collect())
    }

    /// Natural node numbers of the owned nodes of `rank`.
    pub fn node_range_without_ghosts(&self, rank: usize) -> Range<usize> {
        let begin = self.begin_node_global_natural(rank);
        begin..begin + self.n_nodes_local_without_ghosts(rank)
    }

    /// Natural node numbers of the owned and ghost nodes of `rank`.
    pub fn node_range_with_ghosts(&self, rank: usize) -> Range<usize> {
        let begin = self.begin_node_global_natural(rank);
        begin..begin + self.n_nodes_local_with_ghosts(rank)
    }

    fn is_last(&self, rank: usize) -> bool {
        rank + 1 == self.elements_per_rank.len()
    }
}

impl FiberPartition for MeshPartition1D {
    fn n_ranks(&self) -> usize { self.elements_per_rank.len() }
    fn n_elements_global(&self) -> usize { self.elements_per_rank.iter().sum() }
    fn n_nodes_global(&self) -> usize { self.n_elements_global() + 1 }
    fn n_elements_local(&self, rank: usize) -> usize { self.elements_per_rank[rank] }

    fn n_nodes_local_without_ghosts(&self, rank: usize) -> usize {
        self.elements_per_rank[rank] + usize::from(self.is_last(rank))
    }

    fn n_nodes_local_with_ghosts(&self, rank: usize) -> usize {
        let ghost = !self.is_last(rank) && self.elements_per_rank[rank] > 0;
        self.n_nodes_local_without_ghosts(rank) + usize::from(ghost)
    }

    fn begin_node_global_natural(&self, rank: usize) -> usize { self.element_offsets[rank] }
    fn begin_element_global(&self, rank: usize) -> usize { self.element_offsets[rank] }
}
