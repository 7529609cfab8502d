//! Transfer channel selection.

use bitflags::bitflags;

use crate::config::options::TransferOptions;
use crate::error::FiberError;

bitflags! {
    /// The two local copies of a fiber's data that the scatter step keeps in sync.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct FieldCopy: u8 {
        /// Field driven by the batched reaction step.
        const REACTION  = 0b01;
        /// Companion field of the diffusion solver.
        const DIFFUSION = 0b10;
        const BOTH      = Self::REACTION.bits() | Self::DIFFUSION.bits();
    }
}

/// Reaction-model field read from the point buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelSource {
    State(usize),
    Intermediate(usize),
}

/// Resolved transfer channels of one reaction model.
///
/// Extra channel `k` is written to component `k + 1` of the local fields; component 0 always
/// holds the primary state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferChannels {
    pub primary_state: usize,
    pub extra: Vec<ChannelSource>,
}

impl TransferChannels {
    /// Resolves `options` against the dimensions of the reaction model.
    pub fn from_options(options: &TransferOptions, n_states: usize, n_intermediates: usize) -> Result<Self, FiberError> {
        let primary_state = options.primary_state();
        for &s in std::iter::once(&primary_state).chain(options.extra_states()) {
            if s >= n_states {
                return Err(FiberError::Config(format!(
                    "state {} selected for transfer, the model has {} states", s, n_states
                )));
            }
        }
        if let Some(&i) = options.intermediates_for_transfer.iter().find(|&&i| i >= n_intermediates) {
            return Err(FiberError::Config(format!(
                "intermediate {} selected for transfer, the model has {} intermediates", i, n_intermediates
            )));
        }
        let extra = options
            .extra_states()
            .iter()
            .map(|&s| ChannelSource::State(s))
            .chain(options.intermediates_for_transfer.iter().map(|&i| ChannelSource::Intermediate(i)))
            .collect();
        Ok(Self { primary_state, extra })
    }

    pub fn n_extra(&self) -> usize { self.extra.len() }

    /// Local field component receiving extra channel `k`.
    #[inline]
    pub fn target_component(k: usize) -> usize { k + 1 }
}
