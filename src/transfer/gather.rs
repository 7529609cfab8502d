//! Variable-count gather of distributed fiber data to the computing rank.

use crate::core::traits::{FiberPartition, FieldVariable};
use crate::error::FiberError;
use crate::mesh::fiber::LocalFiber;
use crate::parallel::Comm;
use crate::transfer::address_map::{FiberAddressMap, FiberEntry, RankContributions};

/// Whole-fiber data held by the computing rank of one fiber.
///
/// Only the computing rank allocates these; every other rank of the subset keeps its local
/// piece only.
#[derive(Debug, Clone, PartialEq)]
pub struct FiberData {
    pub fiber_no: usize,
    /// Length of every element, in global element order.
    pub element_lengths: Vec<f64>,
    /// Primary values in natural dof order.
    pub values: Vec<f64>,
    /// Extra channels after the reaction step, one block of `values.len()` per channel.
    pub further_values: Vec<f64>,
}

impl FiberData {
    pub fn new(entry: &FiberEntry) -> Self {
        Self {
            fiber_no: entry.fiber_no,
            element_lengths: vec![0.0; entry.n_elements_global],
            values: vec![0.0; entry.n_dofs_global],
            further_values: Vec::new(),
        }
    }

    /// Allocates the whole-fiber buffers of every fiber this rank computes.
    pub fn allocate_owned(map: &FiberAddressMap) -> Vec<FiberData> {
        map.owned_fibers().map(FiberData::new).collect()
    }

    pub fn fiber_length(&self) -> f64 {
        self.element_lengths.iter().sum()
    }
}

/// Collects element lengths and primary values of each fiber on its computing rank.
#[derive(Debug, Default)]
pub struct FiberDataGatherer {
    values: Vec<f64>,
}

impl FiberDataGatherer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gathers one fiber. Collective over all ranks of `comm`.
    ///
    /// `target` must be the fiber's [`FiberData`] on the computing rank and `None` elsewhere.
    /// After the call, `target.values[offsets_on_ranks[r] + k]` holds the `k`-th local value of
    /// rank `r`.
    pub fn gather<C: Comm, F: FieldVariable, P: FiberPartition>(
        &mut self,
        comm: &C,
        entry: &FiberEntry,
        fiber: &LocalFiber<F, P>,
        target: Option<&mut FiberData>,
    ) -> Result<(), FiberError> {
        let rank = comm.rank();
        let contributions = RankContributions::compute(fiber.fiber_no, &fiber.partition, comm.size())?;

        let lengths = fiber.element_lengths();
        if lengths.len() != contributions.n_elements_on_ranks[rank] {
            return Err(FiberError::Config(format!(
                "fiber {}: {} local element lengths, partition says {}",
                fiber.fiber_no, lengths.len(), contributions.n_elements_on_ranks[rank]
            )));
        }
        fiber.diffusion.get_values_without_ghosts(0, &mut self.values)?;

        let (recv_lengths, recv_values) = match target {
            Some(data) => (Some(data.element_lengths.as_mut_slice()), Some(data.values.as_mut_slice())),
            None => (None, None),
        };
        comm.variable_gather(
            &lengths,
            recv_lengths,
            &contributions.n_elements_on_ranks,
            &contributions.element_offsets_on_ranks,
            entry.computing_rank,
        )?;
        comm.variable_gather(
            &self.values,
            recv_values,
            &contributions.n_dofs_on_ranks,
            &contributions.offsets_on_ranks,
            entry.computing_rank,
        )?;
        log::trace!(
            "rank {}: gathered fiber {} ({} local values) to rank {}",
            rank, fiber.fiber_no, self.values.len(), entry.computing_rank
        );
        Ok(())
    }

    /// Gathers every fiber of the subset in `map` order.
    ///
    /// `fibers` holds the local pieces in the same order as `map.fibers()`, `data` the buffers
    /// from [`FiberData::allocate_owned`].
    pub fn gather_all<C: Comm, F: FieldVariable, P: FiberPartition>(
        &mut self,
        comm: &C,
        map: &FiberAddressMap,
        fibers: &[LocalFiber<F, P>],
        data: &mut [FiberData],
    ) -> Result<(), FiberError> {
        check_fiber_order(map, fibers)?;
        for (entry, fiber) in map.fibers().iter().zip(fibers) {
            let target = match entry.fiber_data_no {
                Some(no) => Some(data.get_mut(no).ok_or_else(|| {
                    FiberError::Config(format!("no gather buffer for fiber {}", entry.fiber_no))
                })?),
                None => None,
            };
            self.gather(comm, entry, fiber, target)?;
        }
        Ok(())
    }
}

/// Local fibers must match the map one to one, in the same order.
pub(crate) fn check_fiber_order<F, P>(map: &FiberAddressMap, fibers: &[LocalFiber<F, P>]) -> Result<(), FiberError> {
    if map.fibers().len() != fibers.len()
        || map.fibers().iter().zip(fibers).any(|(e, f)| e.fiber_no != f.fiber_no)
    {
        return Err(FiberError::Config(format!(
            "local fibers {:?} do not match address map {:?}",
            fibers.iter().map(|f| f.fiber_no).collect::<Vec<_>>(),
            map.fibers().iter().map(|e| e.fiber_no).collect::<Vec<_>>()
        )));
    }
    Ok(())
}
