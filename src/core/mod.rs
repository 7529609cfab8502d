//! Collaborator interfaces consumed by the transfer protocol, plus a concrete field variable.

pub mod traits;
pub use traits::{FiberPartition, FieldVariable};
pub mod field;
pub use field::ComponentField;
