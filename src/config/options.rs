//! Solver and transfer options.
//!
//! `TransferOptions` selects which reaction-model fields cross the gather/scatter boundary:
//! the first entry of `states_for_transfer` is the primary state (state 0 if the list is empty),
//! the remaining states followed by `intermediates_for_transfer` are the extra channels written
//! back into the local fields after every reaction step.

use crate::error::FiberError;

/// Lane count of the point buffers when nothing else is chosen (four f64 lanes per AVX register).
pub const DEFAULT_LANE_WIDTH: usize = 4;

/// Reaction-model fields that are transferred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOptions {
    /// Model state numbers; index 0 is the primary state.
    pub states_for_transfer: Vec<usize>,
    /// Model intermediate numbers.
    pub intermediates_for_transfer: Vec<usize>,
}

impl TransferOptions {
    pub fn primary_state(&self) -> usize {
        self.states_for_transfer.first().copied().unwrap_or(0)
    }

    /// Extra states, i.e. all configured states but the primary one.
    pub fn extra_states(&self) -> &[usize] {
        self.states_for_transfer.get(1..).unwrap_or(&[])
    }
}

/// Time stepping parameters of one fiber solver instance.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Width of one macro time step.
    pub time_step_width: f64,
    /// Reaction sub-steps per macro time step.
    pub n_sub_steps: usize,
    pub start_time: f64,
    pub transfer: TransferOptions,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            time_step_width: 1e-3,
            n_sub_steps: 1,
            start_time: 0.0,
            transfer: TransferOptions::default(),
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> Result<(), FiberError> {
        if !(self.time_step_width.is_finite() && self.time_step_width > 0.0) {
            return Err(FiberError::Config(format!(
                "time_step_width must be positive and finite, got {}", self.time_step_width
            )));
        }
        if self.n_sub_steps == 0 {
            return Err(FiberError::Config("n_sub_steps must be at least 1".into()));
        }
        if !self.start_time.is_finite() {
            return Err(FiberError::Config(format!("start_time must be finite, got {}", self.start_time)));
        }
        Ok(())
    }
}
