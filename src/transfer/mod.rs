//! The fiber transfer protocol.
//!
//! Per macro time step, for every fiber of the rank subset in increasing `fiber_no` order:
//! the [`FiberDataGatherer`] collects the distributed pieces on the computing rank, the
//! [`LaneBatchPacker`] moves the whole-fiber values into fixed-width lane buffers, an external
//! reaction step advances the buffers, the packer reads the results back, and the
//! [`FiberDataScatterer`] returns each rank's slice into both of its local field copies.
//!
//! Modules:
//! - [`address_map`]: owner, per-rank counts/offsets and the flat value address space.
//! - [`channels`]: which model fields are transferred and where they land.
//! - [`lanes`]: point buffers and the lane packer.
//! - [`gather`]: variable-count gather to the computing rank.
//! - [`scatter`]: variable-count scatter back to the contributing ranks.

pub mod address_map;
pub use address_map::{computing_rank, FiberAddressMap, FiberEntry, RankContributions};
pub mod channels;
pub use channels::{ChannelSource, FieldCopy, TransferChannels};
pub mod lanes;
pub use lanes::{lane_address, n_point_buffers, LaneBatchPacker, LaneScalar, PointBuffer};
pub mod gather;
pub use gather::{FiberData, FiberDataGatherer};
pub mod scatter;
pub use scatter::{FiberDataScatterer, ScatterReport, SkippedChannel};
