//! Context module for fiberlane.
//!
//! The context owns everything one fiber solver instance needs across macro time steps: the
//! communicator of its rank subset, the address map, the local fiber pieces, the whole-fiber
//! buffers of the fibers this rank computes, and the lane buffers. It is passed by reference to
//! the transfer stages; nothing is kept in process-wide state.
//!
//! Modules:
//! - [`fiber_context`]: Contains the `FiberSolverContext` struct driving gather, reaction and scatter.
//!
//! # Example
//! ```rust
//! use fiberlane::{ComponentField, FiberSolverContext, LocalFiber, MeshPartition1D, SolverOptions};
//! use fiberlane::parallel::SelfComm;
//! use fiberlane::mesh::straight_node_positions;
//!
//! let partition = MeshPartition1D::uniform(4, 1).unwrap();
//! let positions = straight_node_positions(&partition, 0, [0.0; 3], [0.1, 0.0, 0.0]);
//! let field = ComponentField::from_components(vec![vec![-75.0; 5]]).unwrap();
//! let fiber = LocalFiber::new(0, partition, 0, positions, field.clone(), field).unwrap();
//! let ctx: FiberSolverContext<_, _, f64, 4> =
//!     FiberSolverContext::new(SelfComm, SolverOptions::default(), vec![fiber], vec![-75.0], 0).unwrap();
//! assert_eq!(ctx.buffers().len(), 2);
//! ```

pub mod fiber_context;
pub use fiber_context::FiberSolverContext;
