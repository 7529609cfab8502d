//! Solver context for one group of fibers sharing a rank subset.
//!
//! # Usage
//!
//! 1. Construct a `FiberSolverContext` from the subset communicator, the options, the local
//!    fiber pieces (in increasing fiber number, identical on every rank) and the dimensions of
//!    the reaction model.
//! 2. Call `step` once per macro time step with a [`BatchReactionStep`]. Every rank of the subset
//!    must call it the same number of times.
//! 3. Between steps, a diffusion solver may work on `fibers_mut()`; the diffusion field is what
//!    the next gather reads.

use crate::config::options::SolverOptions;
use crate::core::traits::{FiberPartition, FieldVariable};
use crate::error::FiberError;
use crate::mesh::fiber::LocalFiber;
use crate::mesh::partition::MeshPartition1D;
use crate::parallel::Comm;
use crate::reaction::{BatchReactionStep, RhsKernel};
use crate::transfer::address_map::FiberAddressMap;
use crate::transfer::channels::TransferChannels;
use crate::transfer::gather::{FiberData, FiberDataGatherer};
use crate::transfer::lanes::{lane_address, LaneBatchPacker, LaneScalar, PointBuffer};
use crate::transfer::scatter::{FiberDataScatterer, ScatterReport};
use crate::utils::stimulation::StimulationSchedule;

pub struct FiberSolverContext<C, F, T, const W: usize, P = MeshPartition1D> {
    comm: C,
    options: SolverOptions,
    channels: TransferChannels,
    map: FiberAddressMap,
    fibers: Vec<LocalFiber<F, P>>,
    /// Whole-fiber buffers, only for fibers computed on this rank.
    fiber_data: Vec<FiberData>,
    buffers: Vec<PointBuffer<T, W>>,
    initial_states: Vec<T>,
    n_intermediates: usize,
    gatherer: FiberDataGatherer,
    scatterer: FiberDataScatterer,
    stimulation: Option<StimulationSchedule>,
    time_step_no: usize,
    last_report: ScatterReport,
}

impl<C, F, T, const W: usize, P> FiberSolverContext<C, F, T, W, P>
where
    C: Comm,
    F: FieldVariable,
    T: LaneScalar,
    P: FiberPartition,
{
    /// Sets up addressing and buffers for a reaction model with `initial_states.len()` states
    /// and `n_intermediates` intermediates.
    pub fn new(
        comm: C,
        options: SolverOptions,
        fibers: Vec<LocalFiber<F, P>>,
        initial_states: Vec<T>,
        n_intermediates: usize,
    ) -> Result<Self, FiberError> {
        options.validate()?;
        if comm.size() == 0 {
            return Err(FiberError::EmptyRankSubset);
        }
        let channels = TransferChannels::from_options(&options.transfer, initial_states.len(), n_intermediates)?;
        let map = build_map(&comm, &fibers)?;
        let fiber_data = FiberData::allocate_owned(&map);
        let buffers = LaneBatchPacker::<W>::allocate(&map, &initial_states, n_intermediates);
        log::info!(
            "rank {}/{}: {} fibers, computing {} ({} values in {} buffers of {} lanes), {} extra channels",
            comm.rank(), comm.size(), map.fibers().len(), map.n_owned_fibers(),
            map.total_values(), buffers.len(), W, channels.n_extra()
        );
        Ok(Self {
            comm,
            options,
            channels,
            map,
            fibers,
            fiber_data,
            buffers,
            initial_states,
            n_intermediates,
            gatherer: FiberDataGatherer::new(),
            scatterer: FiberDataScatterer::new(),
            stimulation: None,
            time_step_no: 0,
            last_report: ScatterReport::default(),
        })
    }

    /// Like [`FiberSolverContext::new`], taking the model dimensions from `kernel`.
    pub fn with_kernel<K: RhsKernel<T, W>>(
        comm: C,
        options: SolverOptions,
        fibers: Vec<LocalFiber<F, P>>,
        kernel: &K,
    ) -> Result<Self, FiberError> {
        let initial_states = kernel.initial_states();
        if initial_states.len() != kernel.n_states() {
            return Err(FiberError::Config(format!(
                "kernel gives {} initial values for {} states", initial_states.len(), kernel.n_states()
            )));
        }
        Self::new(comm, options, fibers, initial_states, kernel.n_intermediates())
    }

    pub fn with_stimulation(mut self, stimulation: StimulationSchedule) -> Self {
        self.stimulation = Some(stimulation);
        self
    }

    pub fn set_stimulation(&mut self, stimulation: Option<StimulationSchedule>) {
        self.stimulation = stimulation;
    }

    /// Runs one macro time step: gather, pack, stimulate, react, unpack, scatter.
    pub fn step<R: BatchReactionStep<T, W>>(&mut self, reaction: &mut R) -> Result<&ScatterReport, FiberError> {
        let time = self.time();
        let dt = self.options.time_step_width;

        self.gatherer.gather_all(&self.comm, &self.map, &self.fibers, &mut self.fiber_data)?;
        LaneBatchPacker::<W>::scatter_into_lanes(&self.map, &self.fiber_data, self.channels.primary_state, &mut self.buffers)?;
        if let Some(stimulation) = &self.stimulation {
            stimulate(stimulation, time, &self.map, &self.fiber_data, &mut self.buffers);
        }

        reaction.advance(&mut self.buffers, T::from_wire(time), T::from_wire(dt), self.options.n_sub_steps)?;

        LaneBatchPacker::<W>::gather_from_lanes(&self.map, &self.buffers, &self.channels, &mut self.fiber_data)?;
        self.last_report =
            self.scatterer
                .scatter_all(&self.comm, &self.map, &self.channels, &mut self.fibers, &self.fiber_data)?;

        self.time_step_no += 1;
        log::debug!(
            "rank {}: time step {} done, t = {}, {} skipped channels",
            self.comm.rank(), self.time_step_no, self.time(), self.last_report.skipped.len()
        );
        Ok(&self.last_report)
    }

    /// Runs `n_steps` macro time steps.
    pub fn run<R: BatchReactionStep<T, W>>(&mut self, reaction: &mut R, n_steps: usize) -> Result<(), FiberError> {
        for _ in 0..n_steps {
            self.step(reaction)?;
        }
        Ok(())
    }

    /// Replaces the local fiber pieces after a partition change and rebuilds the addressing.
    ///
    /// Lane buffers, and with them the reaction state beyond the primary channel, survive if
    /// this rank still computes the same fibers with the same dof counts; otherwise they are
    /// reset to the initial states.
    pub fn repartition(&mut self, fibers: Vec<LocalFiber<F, P>>) -> Result<(), FiberError> {
        let map = build_map(&self.comm, &fibers)?;
        let same_layout = map.n_owned_fibers() == self.map.n_owned_fibers()
            && map
                .owned_fibers()
                .zip(self.map.owned_fibers())
                .all(|(a, b)| a.fiber_no == b.fiber_no && a.n_dofs_global == b.n_dofs_global);
        if !same_layout {
            log::warn!(
                "rank {}: owned fiber layout changed by repartition, resetting reaction state",
                self.comm.rank()
            );
            self.buffers = LaneBatchPacker::<W>::allocate(&map, &self.initial_states, self.n_intermediates);
        }
        self.fiber_data = FiberData::allocate_owned(&map);
        self.map = map;
        self.fibers = fibers;
        Ok(())
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.options.start_time + self.time_step_no as f64 * self.options.time_step_width
    }

    pub fn time_step_no(&self) -> usize { self.time_step_no }
    pub fn comm(&self) -> &C { &self.comm }
    pub fn options(&self) -> &SolverOptions { &self.options }
    pub fn channels(&self) -> &TransferChannels { &self.channels }
    pub fn map(&self) -> &FiberAddressMap { &self.map }
    pub fn fibers(&self) -> &[LocalFiber<F, P>] { &self.fibers }
    pub fn fibers_mut(&mut self) -> &mut [LocalFiber<F, P>] { &mut self.fibers }
    /// Whole-fiber data of the fibers computed here, as of the last step.
    pub fn fiber_data(&self) -> &[FiberData] { &self.fiber_data }
    pub fn buffers(&self) -> &[PointBuffer<T, W>] { &self.buffers }
    pub fn buffers_mut(&mut self) -> &mut [PointBuffer<T, W>] { &mut self.buffers }
    pub fn last_report(&self) -> &ScatterReport { &self.last_report }
}

fn build_map<C: Comm, F, P: FiberPartition>(comm: &C, fibers: &[LocalFiber<F, P>]) -> Result<FiberAddressMap, FiberError> {
    FiberAddressMap::new(comm.rank(), comm.size(), fibers.iter().map(|f| (f.fiber_no, &f.partition)))
}

/// Prescribes model state 0 at the innervation zone of every owned fiber that fires at `time`.
fn stimulate<T: LaneScalar, const W: usize>(
    stimulation: &StimulationSchedule,
    time: f64,
    map: &FiberAddressMap,
    fiber_data: &[FiberData],
    buffers: &mut [PointBuffer<T, W>],
) {
    let value = T::from_wire(stimulation.value);
    for (fiber_data_no, data) in fiber_data.iter().enumerate() {
        if !stimulation.fiber_gets_stimulated(data.fiber_no, time) {
            continue;
        }
        let nodes = stimulation.stimulated_nodes(data.values.len());
        log::info!("t: {}, stimulate fiber {} at nodes {:?}", time, data.fiber_no, nodes);
        for node in nodes {
            let (b, lane) = lane_address::<W>(map.global_value_index(fiber_data_no, node));
            buffers[b].states[0][lane] = value;
        }
    }
}
