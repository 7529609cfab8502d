//! fiberlane: distributed fiber-data transfer and SIMD-lane batching
//!
//! This crate gathers the per-rank pieces of many 1-D reaction-diffusion fibers onto a
//! deterministic owning rank, packs the whole-fiber data into fixed-width lane buffers for a
//! batched reaction kernel, and scatters the results back into the distributed field copies.
//! Communication runs over shared memory (threads) or distributed memory (MPI).

pub mod parallel;

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod mesh;
pub mod reaction;
pub mod transfer;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use crate::core::*;
pub use error::*;
pub use mesh::*;
pub use reaction::*;
pub use transfer::*;
pub use utils::*;
