//! Transfer channel tests for fiberlane
//!
//! Extra channels (further states and intermediates of the reaction model) are scattered with a
//! stride of the channel count. A target field without the matching component skips that
//! channel only; everything else is still written.

mod common;

use common::{dof_value, local_fiber, run_ranks};
use fiberlane::mesh::straight_node_positions;
use fiberlane::parallel::Comm;
use fiberlane::{
    ChannelSource, ComponentField, ExplicitEuler, FieldCopy, FieldVariable, FiberPartition, FiberSolverContext,
    LocalFiber, MeshPartition1D, RhsKernel, SolverOptions, TransferOptions,
};

/// Two states and one intermediate: `s0' = 0`, `s1' = s0`, `i0 = 2 s0`.
struct Probe;

impl<const W: usize> RhsKernel<f64, W> for Probe {
    fn n_states(&self) -> usize { 2 }
    fn n_intermediates(&self) -> usize { 1 }
    fn initial_states(&self) -> Vec<f64> { vec![0.0, 0.0] }
    fn evaluate(&self, _t: f64, states: &[[f64; W]], rates: &mut [[f64; W]], intermediates: &mut [[f64; W]]) {
        for lane in 0..W {
            rates[0][lane] = 0.0;
            rates[1][lane] = states[0][lane];
            intermediates[0][lane] = 2.0 * states[0][lane];
        }
    }
}

fn options() -> SolverOptions {
    SolverOptions {
        time_step_width: 0.5,
        n_sub_steps: 1,
        transfer: TransferOptions { states_for_transfer: vec![0, 1], intermediates_for_transfer: vec![0] },
        ..SolverOptions::default()
    }
}

fn component(field: &ComponentField, c: usize) -> Vec<f64> {
    let mut out = Vec::new();
    field.get_values_without_ghosts(c, &mut out).unwrap();
    out
}

fn partitions(n_ranks: usize) -> Vec<MeshPartition1D> {
    match n_ranks {
        3 => vec![
            MeshPartition1D::from_elements_per_rank(vec![3, 1, 2]).unwrap(),
            MeshPartition1D::from_elements_per_rank(vec![1, 4, 0]).unwrap(),
            MeshPartition1D::uniform(5, 3).unwrap(),
            MeshPartition1D::from_elements_per_rank(vec![2, 2, 2]).unwrap(),
        ],
        _ => (0..4).map(|f| MeshPartition1D::uniform(3 + 2 * f, n_ranks).unwrap()).collect(),
    }
}

fn fibers_for_rank(
    n_ranks: usize,
    rank: usize,
    reaction_components: usize,
    diffusion_components: usize,
) -> Vec<LocalFiber<ComponentField>> {
    partitions(n_ranks)
        .into_iter()
        .enumerate()
        .map(|(f, p)| local_fiber(f, p, rank, reaction_components, diffusion_components))
        .collect()
}

/// Every rank gets its own slice of every extra channel, even with uneven partitions.
#[test]
fn extra_channels_reach_every_rank() {
    run_ranks(3, |comm| {
        let rank = comm.rank();
        let fibers = fibers_for_rank(3, rank, 3, 3);
        let mut ctx: FiberSolverContext<_, _, f64, 4> =
            FiberSolverContext::with_kernel(comm, options(), fibers, &Probe).unwrap();
        let report = ctx.step(&mut ExplicitEuler::new(Probe)).unwrap();
        assert!(report.is_complete());

        for fiber in ctx.fibers() {
            let v: Vec<f64> = fiber.partition.node_range_without_ghosts(rank).map(|n| dof_value(fiber.fiber_no, n)).collect();
            for field in [&fiber.reaction, &fiber.diffusion] {
                assert_eq!(component(field, 0), v);
                assert_eq!(component(field, 1), v.iter().map(|x| 0.5 * x).collect::<Vec<_>>());
                assert_eq!(component(field, 2), v.iter().map(|x| 2.0 * x).collect::<Vec<_>>());
            }
        }
    });
}

/// The diffusion copy has no room for extra channels: they are skipped there only, the
/// reaction copy and the primary channel are fully updated.
#[test_log::test]
fn missing_component_skips_channel_only() {
    let reports = run_ranks(2, |comm| {
        let rank = comm.rank();
        let fibers = fibers_for_rank(2, rank, 3, 1);
        let mut ctx: FiberSolverContext<_, _, f64, 4> =
            FiberSolverContext::with_kernel(comm, options(), fibers, &Probe).unwrap();
        let report = ctx.step(&mut ExplicitEuler::new(Probe)).unwrap().clone();

        for fiber in ctx.fibers() {
            let v: Vec<f64> = fiber.partition.node_range_without_ghosts(rank).map(|n| dof_value(fiber.fiber_no, n)).collect();
            assert_eq!(component(&fiber.diffusion, 0), v);
            assert_eq!(fiber.diffusion.n_components(), 1);
            assert_eq!(component(&fiber.reaction, 0), v);
            assert_eq!(component(&fiber.reaction, 1), v.iter().map(|x| 0.5 * x).collect::<Vec<_>>());
            assert_eq!(component(&fiber.reaction, 2), v.iter().map(|x| 2.0 * x).collect::<Vec<_>>());
        }
        report
    });

    for report in reports {
        assert_eq!(report.skipped.len(), 2 * 4);
        assert!(report.skipped.iter().all(|s| s.copies == FieldCopy::DIFFUSION));
        assert!(report.skipped.iter().any(|s| s.channel == ChannelSource::Intermediate(0) && s.component == 2));
    }
}

/// A channel missing from both copies is skipped in both; the one that fits is written.
#[test_log::test]
fn channel_missing_everywhere_is_skipped_in_both_copies() {
    use fiberlane::parallel::SelfComm;
    let fibers: Vec<_> = (0..2).map(|f| local_fiber(f, MeshPartition1D::uniform(3, 1).unwrap(), 0, 2, 2)).collect();
    let mut ctx: FiberSolverContext<_, _, f64, 2> =
        FiberSolverContext::with_kernel(SelfComm, options(), fibers, &Probe).unwrap();
    let report = ctx.step(&mut ExplicitEuler::new(Probe)).unwrap();
    assert_eq!(report.skipped.len(), 2);
    assert!(report.skipped.iter().all(|s| s.copies == FieldCopy::BOTH && s.channel == ChannelSource::Intermediate(0)));
    let fiber = &ctx.fibers()[1];
    assert_eq!(component(&fiber.diffusion, 1), vec![500.0, 500.5, 501.0, 501.5]);
    assert_eq!(component(&fiber.reaction, 1), vec![500.0, 500.5, 501.0, 501.5]);
}

/// Transfer indices outside the reaction model are rejected when the context is built.
#[test]
fn out_of_model_channel_is_rejected_at_setup() {
    use fiberlane::parallel::SelfComm;
    let fibers = vec![local_fiber(0, MeshPartition1D::uniform(3, 1).unwrap(), 0, 1, 1)];
    let mut opts = options();
    opts.transfer.intermediates_for_transfer = vec![1];
    let ctx = FiberSolverContext::<_, _, f64, 4>::with_kernel(SelfComm, opts, fibers, &Probe);
    assert!(ctx.is_err());
}

/// Block partition with the rank order reversed: rank 0 holds the last block of nodes, so the
/// natural offsets decrease with the rank.
#[derive(Debug, Clone)]
struct ReversedBlocks(MeshPartition1D);

impl ReversedBlocks {
    fn block(&self, rank: usize) -> usize {
        self.0.n_ranks() - 1 - rank
    }
}

impl FiberPartition for ReversedBlocks {
    fn n_ranks(&self) -> usize { self.0.n_ranks() }
    fn n_elements_global(&self) -> usize { self.0.n_elements_global() }
    fn n_nodes_global(&self) -> usize { self.0.n_nodes_global() }
    fn n_elements_local(&self, rank: usize) -> usize { self.0.n_elements_local(self.block(rank)) }
    fn n_nodes_local_without_ghosts(&self, rank: usize) -> usize { self.0.n_nodes_local_without_ghosts(self.block(rank)) }
    fn n_nodes_local_with_ghosts(&self, rank: usize) -> usize { self.0.n_nodes_local_with_ghosts(self.block(rank)) }
    fn begin_node_global_natural(&self, rank: usize) -> usize { self.0.begin_node_global_natural(self.block(rank)) }
    fn begin_element_global(&self, rank: usize) -> usize { self.0.begin_element_global(self.block(rank)) }
}

fn reversed_fiber(fiber_no: usize, partition: ReversedBlocks, rank: usize) -> LocalFiber<ComponentField, ReversedBlocks> {
    let block = partition.block(rank);
    let positions = straight_node_positions(&partition.0, block, [0.0; 3], [1.0, 0.0, 0.0]);
    let primary: Vec<f64> = partition.0.node_range_without_ghosts(block).map(|n| dof_value(fiber_no, n)).collect();
    let n = primary.len();
    let field = ComponentField::from_components(vec![primary, vec![-1.0; n], vec![-1.0; n]]).unwrap();
    LocalFiber::new(fiber_no, partition, rank, positions, field.clone(), field).unwrap()
}

/// Extra channels are placed by natural offset, not by rank order.
#[test]
fn extra_channels_follow_offsets_not_rank_order() {
    let partitions = || {
        [vec![2, 1, 3], vec![1, 4, 0], vec![2, 2, 2]]
            .into_iter()
            .map(|e| ReversedBlocks(MeshPartition1D::from_elements_per_rank(e).unwrap()))
    };
    run_ranks(3, |comm| {
        let rank = comm.rank();
        let fibers: Vec<_> = partitions().enumerate().map(|(f, p)| reversed_fiber(f, p, rank)).collect();
        let mut ctx: FiberSolverContext<_, _, f64, 4, ReversedBlocks> =
            FiberSolverContext::with_kernel(comm, options(), fibers, &Probe).unwrap();
        assert!(ctx.step(&mut ExplicitEuler::new(Probe)).unwrap().is_complete());

        for fiber in ctx.fibers() {
            let block = fiber.partition.block(rank);
            let v: Vec<f64> = fiber.partition.0.node_range_without_ghosts(block).map(|n| dof_value(fiber.fiber_no, n)).collect();
            for field in [&fiber.reaction, &fiber.diffusion] {
                assert_eq!(component(field, 0), v);
                assert_eq!(component(field, 1), v.iter().map(|x| 0.5 * x).collect::<Vec<_>>());
                assert_eq!(component(field, 2), v.iter().map(|x| 2.0 * x).collect::<Vec<_>>());
            }
        }
    });
}
