//! Fixed-width lane buffers and the packer that maps fiber values onto them.
//!
//! The values of all fibers computed by this rank form one flat address space (see
//! [`FiberAddressMap`]). Global value index `i` lives in lane `i % W` of point buffer `i / W`.
//! Fibers are not padded to a multiple of `W`: a buffer may hold the tail of one fiber and the
//! head of the next, and only the lanes past the last value of the last fiber are unused.

use crate::error::FiberError;
use crate::transfer::address_map::FiberAddressMap;
use crate::transfer::channels::{ChannelSource, TransferChannels};
use crate::transfer::gather::FiberData;

/// Scalar type of the lane buffers. Transport between ranks always uses f64.
pub trait LaneScalar: num_traits::Float + Send + Sync + std::fmt::Debug + 'static {
    fn from_wire(v: f64) -> Self;
    fn to_wire(self) -> f64;
}

impl LaneScalar for f64 {
    #[inline]
    fn from_wire(v: f64) -> Self { v }
    #[inline]
    fn to_wire(self) -> f64 { self }
}

impl LaneScalar for f32 {
    #[inline]
    fn from_wire(v: f64) -> Self { v as f32 }
    #[inline]
    fn to_wire(self) -> f64 { self as f64 }
}

/// `W` instances of the reaction model, one per lane.
#[derive(Debug, Clone, PartialEq)]
pub struct PointBuffer<T, const W: usize> {
    /// `states[state_no][lane]`
    pub states: Vec<[T; W]>,
    /// `intermediates[intermediate_no][lane]`
    pub intermediates: Vec<[T; W]>,
}

impl<T: LaneScalar, const W: usize> PointBuffer<T, W> {
    /// Every lane starts from `initial_states`; intermediates start at zero.
    pub fn new(initial_states: &[T], n_intermediates: usize) -> Self {
        Self {
            states: initial_states.iter().map(|&s| [s; W]).collect(),
            intermediates: vec![[T::zero(); W]; n_intermediates],
        }
    }

    pub fn channel(&self, source: ChannelSource) -> Option<&[T; W]> {
        match source {
            ChannelSource::State(s) => self.states.get(s),
            ChannelSource::Intermediate(i) => self.intermediates.get(i),
        }
    }
}

/// Buffer index and lane of a global value index.
#[inline]
pub fn lane_address<const W: usize>(global_value_index: usize) -> (usize, usize) {
    const { assert!(W > 0, "lane width must be positive") };
    (global_value_index / W, global_value_index % W)
}

/// Buffers needed for `total_values` values at `width` lanes each.
///
/// # Panics
/// If `width` is zero.
#[inline]
pub fn n_point_buffers(total_values: usize, width: usize) -> usize {
    assert!(width > 0, "lane width must be positive");
    total_values.div_ceil(width)
}

/// Moves whole-fiber values between [`FiberData`] and the lane buffers.
pub struct LaneBatchPacker<const W: usize>;

impl<const W: usize> LaneBatchPacker<W> {
    /// Allocates `ceil(total_values / W)` buffers for the fibers owned according to `map`.
    pub fn allocate<T: LaneScalar>(
        map: &FiberAddressMap,
        initial_states: &[T],
        n_intermediates: usize,
    ) -> Vec<PointBuffer<T, W>> {
        const { assert!(W > 0, "lane width must be positive") };
        vec![PointBuffer::new(initial_states, n_intermediates); n_point_buffers(map.total_values(), W)]
    }

    /// Writes the primary values of every owned fiber into `states[primary_state]` of its lanes.
    pub fn scatter_into_lanes<T: LaneScalar>(
        map: &FiberAddressMap,
        data: &[FiberData],
        primary_state: usize,
        buffers: &mut [PointBuffer<T, W>],
    ) -> Result<(), FiberError> {
        Self::check(map, data, buffers)?;
        if buffers.first().is_some_and(|b| primary_state >= b.states.len()) {
            return Err(FiberError::Config(format!("primary state {} not in point buffers", primary_state)));
        }
        for (fiber_data_no, fiber) in data.iter().enumerate() {
            for (value_no, &v) in fiber.values.iter().enumerate() {
                let (b, lane) = lane_address::<W>(map.global_value_index(fiber_data_no, value_no));
                buffers[b].states[primary_state][lane] = T::from_wire(v);
            }
        }
        Ok(())
    }

    /// Reads the primary channel into `values` and the extra channels into `further_values`
    /// (`further_values[k * n_values + value_no]`) of every owned fiber.
    pub fn gather_from_lanes<T: LaneScalar>(
        map: &FiberAddressMap,
        buffers: &[PointBuffer<T, W>],
        channels: &TransferChannels,
        data: &mut [FiberData],
    ) -> Result<(), FiberError> {
        Self::check(map, data, buffers)?;
        let primary = ChannelSource::State(channels.primary_state);
        for (fiber_data_no, fiber) in data.iter_mut().enumerate() {
            let n_values = fiber.values.len();
            fiber.further_values.resize(n_values * channels.n_extra(), 0.0);
            for value_no in 0..n_values {
                let (b, lane) = lane_address::<W>(map.global_value_index(fiber_data_no, value_no));
                let buffer = &buffers[b];
                fiber.values[value_no] = read(buffer, primary)?[lane].to_wire();
                for (k, &source) in channels.extra.iter().enumerate() {
                    fiber.further_values[k * n_values + value_no] = read(buffer, source)?[lane].to_wire();
                }
            }
        }
        Ok(())
    }

    fn check<T>(map: &FiberAddressMap, data: &[FiberData], buffers: &[PointBuffer<T, W>]) -> Result<(), FiberError> {
        if data.len() != map.n_owned_fibers() {
            return Err(FiberError::Config(format!(
                "{} fiber data blocks for {} owned fibers", data.len(), map.n_owned_fibers()
            )));
        }
        if let Some((fiber, entry)) = data
            .iter()
            .zip(map.owned_fibers())
            .find(|(fiber, entry)| fiber.fiber_no != entry.fiber_no || fiber.values.len() != entry.n_dofs_global)
        {
            return Err(FiberError::Config(format!(
                "fiber data {} with {} values does not match fiber {} with {} dofs",
                fiber.fiber_no, fiber.values.len(), entry.fiber_no, entry.n_dofs_global
            )));
        }
        let needed = n_point_buffers(map.total_values(), W);
        if buffers.len() < needed {
            return Err(FiberError::Config(format!("{} point buffers, {} needed", buffers.len(), needed)));
        }
        Ok(())
    }
}

fn read<T: LaneScalar, const W: usize>(buffer: &PointBuffer<T, W>, source: ChannelSource) -> Result<&[T; W], FiberError> {
    buffer
        .channel(source)
        .ok_or_else(|| FiberError::Config(format!("channel {:?} not in point buffers", source)))
}
