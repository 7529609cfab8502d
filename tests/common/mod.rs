//! Shared fixtures for the multi-rank integration tests.
#![allow(dead_code)]

use std::thread;

use fiberlane::mesh::straight_node_positions;
use fiberlane::parallel::ThreadComm;
use fiberlane::{BatchReactionStep, ComponentField, FiberError, LocalFiber, MeshPartition1D, PointBuffer};

/// Runs `f` once per rank of an in-memory rank group, each on its own thread.
pub fn run_ranks<R, F>(n_ranks: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(ThreadComm) -> R + Sync,
{
    let comms = ThreadComm::group(n_ranks);
    thread::scope(|s| {
        let f = &f;
        let handles: Vec<_> = comms.into_iter().map(|comm| s.spawn(move || f(comm))).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Primary value of natural dof `node` of fiber `fiber_no`; distinct across fibers.
pub fn dof_value(fiber_no: usize, node: usize) -> f64 {
    1000.0 * fiber_no as f64 + node as f64
}

/// Node spacing of fiber `fiber_no`.
pub fn spacing(fiber_no: usize) -> f64 {
    0.5 * (fiber_no + 1) as f64
}

/// The piece of fiber `fiber_no` held by `rank`. Component 0 of both field copies holds
/// [`dof_value`], further components of the reaction copy are -1.
pub fn local_fiber(
    fiber_no: usize,
    partition: MeshPartition1D,
    rank: usize,
    reaction_components: usize,
    diffusion_components: usize,
) -> LocalFiber<ComponentField> {
    let positions = straight_node_positions(&partition, rank, [0.0, 1.0, 0.0], [spacing(fiber_no), 0.0, 0.0]);
    let primary: Vec<f64> = partition.node_range_without_ghosts(rank).map(|n| dof_value(fiber_no, n)).collect();
    let field = |n_components: usize| {
        let mut components = vec![primary.clone()];
        components.extend((1..n_components).map(|_| vec![-1.0; primary.len()]));
        ComponentField::from_components(components).unwrap()
    };
    LocalFiber::new(fiber_no, partition, rank, positions, field(reaction_components), field(diffusion_components)).unwrap()
}

/// Reaction step that leaves the buffers untouched.
pub struct NoReaction;

impl<const W: usize> BatchReactionStep<f64, W> for NoReaction {
    fn advance(&mut self, _buffers: &mut [PointBuffer<f64, W>], _t: f64, _dt: f64, _n_sub_steps: usize) -> Result<(), FiberError> {
        Ok(())
    }
}

/// Reaction step adding a constant to state 0 of every lane.
pub struct Shift(pub f64);

impl<const W: usize> BatchReactionStep<f64, W> for Shift {
    fn advance(&mut self, buffers: &mut [PointBuffer<f64, W>], _t: f64, _dt: f64, _n_sub_steps: usize) -> Result<(), FiberError> {
        for b in buffers {
            for v in b.states[0].iter_mut() {
                *v += self.0;
            }
        }
        Ok(())
    }
}
