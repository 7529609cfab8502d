//! Deterministic fiber addressing.
//!
//! Everything here is a pure function of the fiber numbers and the static partitions, so every
//! rank derives the same owners, counts and offsets without exchanging a single message.

use crate::core::traits::FiberPartition;
use crate::error::FiberError;

/// Rank that runs the reaction step for `fiber_no`.
#[inline]
pub fn computing_rank(fiber_no: usize, n_ranks: usize) -> usize {
    fiber_no % n_ranks
}

/// What every rank of the subset contributes to one fiber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankContributions {
    pub n_elements_on_ranks: Vec<usize>,
    pub element_offsets_on_ranks: Vec<usize>,
    pub n_dofs_on_ranks: Vec<usize>,
    /// First owned dof of each rank in natural ordering.
    pub offsets_on_ranks: Vec<usize>,
}

impl RankContributions {
    /// Evaluates the fiber partition for all `n_ranks` ranks.
    ///
    /// Call this right before each collective; the result must not outlive a repartition.
    pub fn compute<P: FiberPartition + ?Sized>(
        fiber_no: usize,
        partition: &P,
        n_ranks: usize,
    ) -> Result<Self, FiberError> {
        if n_ranks == 0 {
            return Err(FiberError::EmptyRankSubset);
        }
        if partition.n_ranks() != n_ranks {
            return Err(FiberError::PartitionMismatch {
                fiber_no,
                partition_ranks: partition.n_ranks(),
                subset_ranks: n_ranks,
            });
        }
        if partition.n_elements_global() == 0 {
            return Err(FiberError::ZeroElementFiber(fiber_no));
        }
        Ok(Self {
            n_elements_on_ranks: (0..n_ranks).map(|r| partition.n_elements_local(r)).collect(),
            element_offsets_on_ranks: (0..n_ranks).map(|r| partition.begin_element_global(r)).collect(),
            n_dofs_on_ranks: (0..n_ranks).map(|r| partition.n_nodes_local_without_ghosts(r)).collect(),
            offsets_on_ranks: (0..n_ranks).map(|r| partition.begin_node_global_natural(r)).collect(),
        })
    }

    /// Dof counts and offsets of a transfer carrying `n_channels` values per dof, each rank's
    /// block stored contiguously.
    pub fn dof_layout(&self, n_channels: usize) -> (Vec<usize>, Vec<usize>) {
        (
            self.n_dofs_on_ranks.iter().map(|&n| n * n_channels).collect(),
            self.offsets_on_ranks.iter().map(|&o| o * n_channels).collect(),
        )
    }
}

/// Static description of one fiber of the rank subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiberEntry {
    pub fiber_no: usize,
    pub computing_rank: usize,
    pub n_elements_global: usize,
    pub n_dofs_global: usize,
    /// Position among the fibers computed by this rank, if this rank computes the fiber.
    pub fiber_data_no: Option<usize>,
}

/// Owners and the flat value address space of all fibers of one rank subset.
///
/// The values of the fibers owned by this rank are concatenated in increasing `fiber_data_no`
/// order: `global value index = values_offset[fiber_data_no] + natural dof number`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiberAddressMap {
    own_rank: usize,
    n_ranks: usize,
    fibers: Vec<FiberEntry>,
    owned: Vec<usize>,
    values_offset: Vec<usize>,
}

impl FiberAddressMap {
    /// Builds the map from `(fiber_no, partition)` pairs in strictly increasing `fiber_no` order.
    pub fn new<'a, P, I>(own_rank: usize, n_ranks: usize, fibers: I) -> Result<Self, FiberError>
    where
        P: FiberPartition + ?Sized + 'a,
        I: IntoIterator<Item = (usize, &'a P)>,
    {
        if n_ranks == 0 {
            return Err(FiberError::EmptyRankSubset);
        }
        if own_rank >= n_ranks {
            return Err(FiberError::Config(format!("own rank {} not in subset of {} ranks", own_rank, n_ranks)));
        }
        let mut entries: Vec<FiberEntry> = Vec::new();
        let mut owned = Vec::new();
        let mut values_offset = vec![0];
        for (fiber_no, partition) in fibers {
            if let Some(prev) = entries.last() {
                if prev.fiber_no >= fiber_no {
                    return Err(FiberError::Config(format!(
                        "fibers must be given in increasing order, {} follows {}", fiber_no, prev.fiber_no
                    )));
                }
            }
            let contributions = RankContributions::compute(fiber_no, partition, n_ranks)?;
            let owner = computing_rank(fiber_no, n_ranks);
            let n_dofs_global = partition.n_nodes_global();
            debug_assert_eq!(contributions.n_dofs_on_ranks.iter().sum::<usize>(), n_dofs_global);
            let fiber_data_no = (owner == own_rank).then(|| {
                owned.push(entries.len());
                let end = values_offset[values_offset.len() - 1] + n_dofs_global;
                values_offset.push(end);
                owned.len() - 1
            });
            entries.push(FiberEntry {
                fiber_no,
                computing_rank: owner,
                n_elements_global: partition.n_elements_global(),
                n_dofs_global,
                fiber_data_no,
            });
        }
        Ok(Self { own_rank, n_ranks, fibers: entries, owned, values_offset })
    }

    pub fn own_rank(&self) -> usize { self.own_rank }
    pub fn n_ranks(&self) -> usize { self.n_ranks }

    /// All fibers of the subset, in the collective call order.
    pub fn fibers(&self) -> &[FiberEntry] { &self.fibers }

    /// Fibers computed by this rank, in `fiber_data_no` order.
    pub fn owned_fibers(&self) -> impl Iterator<Item = &FiberEntry> + '_ {
        self.owned.iter().map(move |&i| &self.fibers[i])
    }

    pub fn n_owned_fibers(&self) -> usize { self.owned.len() }

    pub fn fiber_data_no(&self, fiber_no: usize) -> Option<usize> {
        self.fibers.iter().find(|f| f.fiber_no == fiber_no).and_then(|f| f.fiber_data_no)
    }

    pub fn values_offset(&self, fiber_data_no: usize) -> usize {
        self.values_offset[fiber_data_no]
    }

    /// Number of values of all owned fibers together.
    pub fn total_values(&self) -> usize {
        self.values_offset[self.values_offset.len() - 1]
    }

    #[inline]
    pub fn global_value_index(&self, fiber_data_no: usize, value_no: usize) -> usize {
        self.values_offset[fiber_data_no] + value_no
    }
}
