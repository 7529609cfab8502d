//! Configuration consumed by the transfer protocol and the solver context.

pub mod options;
pub use options::{SolverOptions, TransferOptions, DEFAULT_LANE_WIDTH};
