//! Core collaborator traits for fiberlane.

use crate::error::FiberError;

/// 1-D partition of one fiber mesh across the ranks of its rank subset.
///
/// All queries take the rank explicitly, so every rank can evaluate the layout of every other
/// rank locally. Node numbers are in natural (partition-independent) ordering.
pub trait FiberPartition {
    /// Number of ranks the fiber is split over.
    fn n_ranks(&self) -> usize;
    fn n_elements_global(&self) -> usize;
    fn n_nodes_global(&self) -> usize;
    fn n_elements_local(&self, rank: usize) -> usize;
    /// Nodes owned by `rank`.
    fn n_nodes_local_without_ghosts(&self, rank: usize) -> usize;
    /// Owned nodes plus the ghost nodes needed to close the local elements.
    fn n_nodes_local_with_ghosts(&self, rank: usize) -> usize;
    /// First owned node of `rank` in natural ordering.
    fn begin_node_global_natural(&self, rank: usize) -> usize;
    /// First local element of `rank` in global numbering.
    fn begin_element_global(&self, rank: usize) -> usize;
}

/// Multi-component nodal field on the local, non-ghost dofs of one rank.
pub trait FieldVariable {
    fn n_components(&self) -> usize;
    fn n_dofs_local_without_ghosts(&self) -> usize;
    /// Replaces the contents of `values` with all local values of `component`.
    fn get_values_without_ghosts(&self, component: usize, values: &mut Vec<f64>) -> Result<(), FiberError>;
    /// Writes `values[i]` to local dof `dof_nos_local[i]` of `component`.
    fn set_values_without_ghosts(
        &mut self,
        component: usize,
        dof_nos_local: &[usize],
        values: &[f64],
    ) -> Result<(), FiberError>;
}
