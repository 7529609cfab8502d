//! The part of one fiber held by the local rank.

use crate::core::traits::{FiberPartition, FieldVariable};
use crate::error::FiberError;
use crate::mesh::partition::MeshPartition1D;
use crate::utils::geometry::element_lengths;

/// Local data of one fiber on one rank of its rank subset.
///
/// `reaction` is the field driven by the batched reaction step, `diffusion` the companion field
/// of the diffusion solver. Both hold the same dofs and must stay synchronized; the scatter step
/// writes them together.
#[derive(Debug, Clone)]
pub struct LocalFiber<F, P = MeshPartition1D> {
    pub fiber_no: usize,
    pub partition: P,
    /// Node positions including the ghost nodes.
    pub node_positions: Vec<[f64; 3]>,
    pub reaction: F,
    pub diffusion: F,
}

impl<F: FieldVariable, P: FiberPartition> LocalFiber<F, P> {
    /// Checks the local sizes against the partition entry of `rank`.
    pub fn new(
        fiber_no: usize,
        partition: P,
        rank: usize,
        node_positions: Vec<[f64; 3]>,
        reaction: F,
        diffusion: F,
    ) -> Result<Self, FiberError> {
        if rank >= partition.n_ranks() {
            return Err(FiberError::PartitionMismatch {
                fiber_no,
                partition_ranks: partition.n_ranks(),
                subset_ranks: rank + 1,
            });
        }
        let n_with_ghosts = partition.n_nodes_local_with_ghosts(rank);
        if node_positions.len() != n_with_ghosts {
            return Err(FiberError::Config(format!(
                "fiber {}: {} node positions given, rank {} has {} nodes with ghosts",
                fiber_no, node_positions.len(), rank, n_with_ghosts
            )));
        }
        let n_dofs = partition.n_nodes_local_without_ghosts(rank);
        for (name, field) in [("reaction", &reaction), ("diffusion", &diffusion)] {
            if field.n_dofs_local_without_ghosts() != n_dofs {
                return Err(FiberError::Config(format!(
                    "fiber {}: {} field has {} dofs, rank {} owns {} nodes",
                    fiber_no, name, field.n_dofs_local_without_ghosts(), rank, n_dofs
                )));
            }
            if field.n_components() == 0 {
                return Err(FiberError::Config(format!("fiber {}: {} field has no components", fiber_no, name)));
            }
        }
        Ok(Self { fiber_no, partition, node_positions, reaction, diffusion })
    }

    /// Lengths of the local elements.
    pub fn element_lengths(&self) -> Vec<f64> {
        element_lengths(&self.node_positions)
    }
}

/// Node positions of a straight fiber along `direction` with uniform spacing, restricted to the
/// nodes (with ghosts) of `rank`.
pub fn straight_node_positions(
    partition: &MeshPartition1D,
    rank: usize,
    origin: [f64; 3],
    step: [f64; 3],
) -> Vec<[f64; 3]> {
    partition
        .node_range_with_ghosts(rank)
        .map(|i| {
            let s = i as f64;
            [origin[0] + s * step[0], origin[1] + s * step[1], origin[2] + s * step[2]]
        })
        .collect()
}
