//! MPI-based communication for the fiber transfer protocol.
//!
//! This module provides an implementation of the `Comm` trait over the `mpi` crate. The two
//! variable-count collectives map directly onto `MPI_Gatherv`/`MPI_Scatterv`; only the root
//! rank builds a `Partition` describing counts and displacements, every other rank sends or
//! receives its own slice only.
//!
//! A rank subset is an MPI communicator. Use [`MpiComm::split`] to carve the subset that shares
//! a group of fibers out of the world communicator.
//!
//! # Example
//! ```no_run
//! use fiberlane::parallel::{Comm, MpiComm};
//! let comm = MpiComm::new().unwrap();
//! println!("Rank: {} / {}", comm.rank(), comm.size());
//! ```

#[cfg(feature = "mpi")]
use mpi::datatype::{Partition, PartitionMut};
#[cfg(feature = "mpi")]
use mpi::topology::{Color, SimpleCommunicator};
#[cfg(feature = "mpi")]
use mpi::traits::*;
#[cfg(feature = "mpi")]
use mpi::Count;

#[cfg(feature = "mpi")]
use crate::error::FiberError;

/// MPI communicator wrapper for one rank subset.
#[cfg(feature = "mpi")]
pub struct MpiComm {
    /// Keeps MPI initialized for as long as the world handle is alive.
    _universe: Option<mpi::environment::Universe>,
    /// The communicator spanning the rank subset.
    pub comm: SimpleCommunicator,
    /// The rank of this process within the subset.
    pub rank: usize,
    /// The number of processes in the subset.
    pub size: usize,
}

#[cfg(feature = "mpi")]
impl MpiComm {
    /// Initializes MPI and wraps the world communicator.
    pub fn new() -> Result<Self, FiberError> {
        let universe = mpi::initialize()
            .ok_or_else(|| FiberError::Communication("MPI was already initialized".into()))?;
        let comm = universe.world();
        let mut out = Self::from_communicator(comm);
        out._universe = Some(universe);
        Ok(out)
    }

    /// Wraps an existing communicator; MPI must stay initialized elsewhere.
    pub fn from_communicator(comm: SimpleCommunicator) -> Self {
        let rank = comm.rank() as usize;
        let size = comm.size() as usize;
        MpiComm { _universe: None, comm, rank, size }
    }

    /// Collectively splits this communicator; ranks passing the same `color` end up in the same
    /// subset. Ranks passing `None` get no subset.
    pub fn split(&self, color: Option<u32>) -> Option<MpiComm> {
        let color = match color {
            Some(c) => Color::with_value(c as i32),
            None => Color::undefined(),
        };
        self.comm.split_by_color(color).map(Self::from_communicator)
    }
}

#[cfg(feature = "mpi")]
fn to_counts(values: &[usize]) -> Vec<Count> {
    values.iter().map(|&v| v as Count).collect()
}

#[cfg(feature = "mpi")]
impl super::Comm for MpiComm {
    fn rank(&self) -> usize { self.rank }
    fn size(&self) -> usize { self.size }
    fn barrier(&self) { self.comm.barrier(); }

    fn variable_gather(
        &self,
        local: &[f64],
        recv: Option<&mut [f64]>,
        counts: &[usize],
        offsets: &[usize],
        root: usize,
    ) -> Result<(), FiberError> {
        super::check_layout(counts, offsets, self.size, root)?;
        let root_process = self.comm.process_at_rank(root as i32);
        if self.rank == root {
            let recv = recv.ok_or_else(|| FiberError::Communication("root passed no receive buffer".into()))?;
            let mut partition = PartitionMut::new(recv, to_counts(counts), to_counts(offsets));
            root_process.gather_varcount_into_root(local, &mut partition);
        } else {
            root_process.gather_varcount_into(local);
        }
        Ok(())
    }

    fn variable_scatter(
        &self,
        send: Option<&[f64]>,
        recv: &mut [f64],
        counts: &[usize],
        offsets: &[usize],
        root: usize,
    ) -> Result<(), FiberError> {
        super::check_layout(counts, offsets, self.size, root)?;
        let root_process = self.comm.process_at_rank(root as i32);
        if self.rank == root {
            let send = send.ok_or_else(|| FiberError::Communication("root passed no send buffer".into()))?;
            let partition = Partition::new(send, to_counts(counts), to_counts(offsets));
            root_process.scatter_varcount_into_root(&partition, recv);
        } else {
            root_process.scatter_varcount_into(recv);
        }
        Ok(())
    }
}
