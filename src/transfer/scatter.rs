//! Variable-count scatter of reaction results back to the contributing ranks.
//!
//! Two exchanges per fiber: the primary channel (one value per dof) and, if configured, the
//! extra channels (`n_extra` values per dof). Each exchange computes its own counts and offsets;
//! the extra-channel layout is scaled by the channel count and must never be reused for the
//! primary exchange. Once both have arrived, the received slice is written into the reaction
//! and the diffusion copy of the local field in one step.

use crate::core::traits::{FiberPartition, FieldVariable};
use crate::error::FiberError;
use crate::mesh::fiber::LocalFiber;
use crate::parallel::Comm;
use crate::transfer::address_map::{FiberAddressMap, FiberEntry, RankContributions};
use crate::transfer::channels::{ChannelSource, FieldCopy, TransferChannels};
use crate::transfer::gather::{check_fiber_order, FiberData};

/// An extra channel that could not be written because a field copy lacks the component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedChannel {
    pub fiber_no: usize,
    pub channel: ChannelSource,
    pub component: usize,
    pub copies: FieldCopy,
}

/// Channels skipped during one scatter pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScatterReport {
    pub skipped: Vec<SkippedChannel>,
}

impl ScatterReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Returns each rank's slice of the reaction results into its local fields.
#[derive(Debug, Default)]
pub struct FiberDataScatterer {
    values: Vec<f64>,
    further_values: Vec<f64>,
    send_buffer: Vec<f64>,
    dof_nos: Vec<usize>,
}

impl FiberDataScatterer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scatters one fiber. Collective over all ranks of `comm`.
    ///
    /// `source` is the fiber's [`FiberData`] on the computing rank and `None` elsewhere.
    pub fn scatter<C: Comm, F: FieldVariable, P: FiberPartition>(
        &mut self,
        comm: &C,
        entry: &FiberEntry,
        channels: &TransferChannels,
        fiber: &mut LocalFiber<F, P>,
        source: Option<&FiberData>,
        report: &mut ScatterReport,
    ) -> Result<(), FiberError> {
        let rank = comm.rank();
        let root = entry.computing_rank;
        let n_extra = channels.n_extra();
        let contributions = RankContributions::compute(fiber.fiber_no, &fiber.partition, comm.size())?;
        let n_local = contributions.n_dofs_on_ranks[rank];

        // primary channel
        let (counts, offsets) = contributions.dof_layout(1);
        self.values.resize(n_local, 0.0);
        comm.variable_scatter(source.map(|d| d.values.as_slice()), &mut self.values, &counts, &offsets, root)?;

        // extra channels, per-rank blocks of n_extra * n_dofs values
        if n_extra > 0 {
            let (counts, offsets) = contributions.dof_layout(n_extra);
            let send = match source {
                Some(data) => {
                    self.pack_extra(data, &contributions, n_extra)?;
                    Some(self.send_buffer.as_slice())
                }
                None => None,
            };
            self.further_values.resize(n_local * n_extra, 0.0);
            comm.variable_scatter(send, &mut self.further_values, &counts, &offsets, root)?;
        }

        self.write_local(fiber, channels, n_local, report)?;
        log::trace!(
            "rank {}: scattered fiber {} ({} local values, {} extra channels) from rank {}",
            rank, fiber.fiber_no, n_local, n_extra, root
        );
        Ok(())
    }

    /// Scatters every fiber of the subset in `map` order.
    pub fn scatter_all<C: Comm, F: FieldVariable, P: FiberPartition>(
        &mut self,
        comm: &C,
        map: &FiberAddressMap,
        channels: &TransferChannels,
        fibers: &mut [LocalFiber<F, P>],
        data: &[FiberData],
    ) -> Result<ScatterReport, FiberError> {
        check_fiber_order(map, fibers)?;
        let mut report = ScatterReport::default();
        for (entry, fiber) in map.fibers().iter().zip(fibers.iter_mut()) {
            let source = match entry.fiber_data_no {
                Some(no) => Some(data.get(no).ok_or_else(|| {
                    FiberError::Config(format!("no scatter source for fiber {}", entry.fiber_no))
                })?),
                None => None,
            };
            self.scatter(comm, entry, channels, fiber, source, &mut report)?;
        }
        Ok(report)
    }

    /// Reorders channel-major `further_values` into one contiguous block per rank, placed at
    /// `offsets_on_ranks[r] * n_extra` whatever the rank order of the offsets.
    fn pack_extra(&mut self, data: &FiberData, contributions: &RankContributions, n_extra: usize) -> Result<(), FiberError> {
        let n_values = data.values.len();
        if data.further_values.len() != n_extra * n_values {
            return Err(FiberError::Config(format!(
                "fiber {}: {} further values, expected {} channels x {} values",
                data.fiber_no, data.further_values.len(), n_extra, n_values
            )));
        }
        self.send_buffer.clear();
        self.send_buffer.resize(n_extra * n_values, 0.0);
        for (&offset, &count) in contributions.offsets_on_ranks.iter().zip(&contributions.n_dofs_on_ranks) {
            if offset + count > n_values {
                return Err(FiberError::Config(format!(
                    "fiber {}: dofs {}..{} exceed the {} values of the fiber",
                    data.fiber_no, offset, offset + count, n_values
                )));
            }
            let rank_block = offset * n_extra;
            for k in 0..n_extra {
                let channel = &data.further_values[k * n_values..(k + 1) * n_values];
                let dst = rank_block + k * count;
                self.send_buffer[dst..dst + count].copy_from_slice(&channel[offset..offset + count]);
            }
        }
        Ok(())
    }

    /// Writes the received values into both field copies. Both copies are checked before either
    /// is written, so a mismatch leaves them untouched.
    fn write_local<F: FieldVariable, P>(
        &mut self,
        fiber: &mut LocalFiber<F, P>,
        channels: &TransferChannels,
        n_local: usize,
        report: &mut ScatterReport,
    ) -> Result<(), FiberError> {
        for (copy, field) in [(FieldCopy::REACTION, &fiber.reaction), (FieldCopy::DIFFUSION, &fiber.diffusion)] {
            if field.n_dofs_local_without_ghosts() != n_local || field.n_components() == 0 {
                return Err(FiberError::Field(format!(
                    "fiber {}: {:?} field has {} dofs and {} components, {} dofs received",
                    fiber.fiber_no, copy, field.n_dofs_local_without_ghosts(), field.n_components(), n_local
                )));
            }
        }
        self.dof_nos.clear();
        self.dof_nos.extend(0..n_local);

        let mut skipped = vec![FieldCopy::empty(); channels.n_extra()];
        for (copy, field) in [(FieldCopy::REACTION, &mut fiber.reaction), (FieldCopy::DIFFUSION, &mut fiber.diffusion)] {
            field.set_values_without_ghosts(0, &self.dof_nos, &self.values)?;
            for (k, flags) in skipped.iter_mut().enumerate() {
                let component = TransferChannels::target_component(k);
                if component >= field.n_components() {
                    flags.insert(copy);
                    continue;
                }
                let block = &self.further_values[k * n_local..(k + 1) * n_local];
                field.set_values_without_ghosts(component, &self.dof_nos, block)?;
            }
        }

        for (k, copies) in skipped.into_iter().enumerate().filter(|(_, c)| !c.is_empty()) {
            let component = TransferChannels::target_component(k);
            log::warn!(
                "fiber {}: cannot transfer {:?} to component {} of the {:?} field, skipping",
                fiber.fiber_no, channels.extra[k], component, copies
            );
            report.skipped.push(SkippedChannel { fiber_no: fiber.fiber_no, channel: channels.extra[k], component, copies });
        }
        Ok(())
    }
}
