//! Mesh module: 1-D fiber partitions and the per-rank piece of each fiber.

pub mod partition;
pub use partition::MeshPartition1D;
pub mod fiber;
pub use fiber::{straight_node_positions, LocalFiber};
