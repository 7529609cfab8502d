//! Communication backends for the fiber transfer protocol.
//!
//! The gather/scatter protocol only needs two variable-count collectives on top of the usual
//! rank/size/barrier queries. Every backend places data purely by the `offsets` it is handed, so
//! arrival order never matters.

use crate::error::FiberError;

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn barrier(&self);
    /// Variable-count gather to `root`.
    ///
    /// Rank `r` contributes `counts[r]` values that land at `recv[offsets[r]..]` on the root.
    /// Only the root passes a receive buffer; all other ranks pass `None`.
    fn variable_gather(
        &self,
        local: &[f64],
        recv: Option<&mut [f64]>,
        counts: &[usize],
        offsets: &[usize],
        root: usize,
    ) -> Result<(), FiberError>;
    /// Variable-count scatter from `root`, the reverse of [`Comm::variable_gather`].
    ///
    /// Only the root passes a send buffer; rank `r` receives `send[offsets[r]..][..counts[r]]`.
    fn variable_scatter(
        &self,
        send: Option<&[f64]>,
        recv: &mut [f64],
        counts: &[usize],
        offsets: &[usize],
        root: usize,
    ) -> Result<(), FiberError>;
}

#[cfg(feature="mpi")]
pub mod mpi_comm;
#[cfg(feature="mpi")]
pub use mpi_comm::MpiComm;

pub mod thread_comm;
pub use thread_comm::ThreadComm;

/// Single-process backend: every collective is a direct copy.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelfComm;

impl Comm for SelfComm {
    fn rank(&self) -> usize { 0 }
    fn size(&self) -> usize { 1 }
    fn barrier(&self) {}
    fn variable_gather(
        &self,
        local: &[f64],
        recv: Option<&mut [f64]>,
        counts: &[usize],
        offsets: &[usize],
        root: usize,
    ) -> Result<(), FiberError> {
        check_layout(counts, offsets, 1, root)?;
        let recv = recv.ok_or_else(|| FiberError::Communication("root passed no receive buffer".into()))?;
        let slot = slot_mut(recv, counts, offsets, 0)?;
        copy_exact(local, slot)
    }
    fn variable_scatter(
        &self,
        send: Option<&[f64]>,
        recv: &mut [f64],
        counts: &[usize],
        offsets: &[usize],
        root: usize,
    ) -> Result<(), FiberError> {
        check_layout(counts, offsets, 1, root)?;
        let send = send.ok_or_else(|| FiberError::Communication("root passed no send buffer".into()))?;
        copy_exact(slot(send, counts, offsets, 0)?, recv)
    }
}

pub enum UniverseComm {
    #[cfg(feature="mpi")]
    Mpi(MpiComm),
    Thread(ThreadComm),
    Serial(SelfComm),
}

impl Comm for UniverseComm {
    fn rank(&self) -> usize {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.rank(),
            UniverseComm::Thread(comm) => comm.rank(),
            UniverseComm::Serial(comm) => comm.rank(),
        }
    }
    fn size(&self) -> usize {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.size(),
            UniverseComm::Thread(comm) => comm.size(),
            UniverseComm::Serial(comm) => comm.size(),
        }
    }
    fn barrier(&self) {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.barrier(),
            UniverseComm::Thread(comm) => comm.barrier(),
            UniverseComm::Serial(comm) => comm.barrier(),
        }
    }
    fn variable_gather(
        &self,
        local: &[f64],
        recv: Option<&mut [f64]>,
        counts: &[usize],
        offsets: &[usize],
        root: usize,
    ) -> Result<(), FiberError> {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.variable_gather(local, recv, counts, offsets, root),
            UniverseComm::Thread(comm) => comm.variable_gather(local, recv, counts, offsets, root),
            UniverseComm::Serial(comm) => comm.variable_gather(local, recv, counts, offsets, root),
        }
    }
    fn variable_scatter(
        &self,
        send: Option<&[f64]>,
        recv: &mut [f64],
        counts: &[usize],
        offsets: &[usize],
        root: usize,
    ) -> Result<(), FiberError> {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.variable_scatter(send, recv, counts, offsets, root),
            UniverseComm::Thread(comm) => comm.variable_scatter(send, recv, counts, offsets, root),
            UniverseComm::Serial(comm) => comm.variable_scatter(send, recv, counts, offsets, root),
        }
    }
}

/// Counts and offsets must describe every rank of the communicator, and `root` must be one of them.
pub(crate) fn check_layout(counts: &[usize], offsets: &[usize], size: usize, root: usize) -> Result<(), FiberError> {
    if counts.len() != size || offsets.len() != size {
        return Err(FiberError::Communication(format!(
            "layout has {} counts and {} offsets for {} ranks",
            counts.len(), offsets.len(), size
        )));
    }
    if root >= size {
        return Err(FiberError::Communication(format!("root {} out of range for {} ranks", root, size)));
    }
    Ok(())
}

pub(crate) fn slot<'a>(buf: &'a [f64], counts: &[usize], offsets: &[usize], r: usize) -> Result<&'a [f64], FiberError> {
    let (begin, end) = (offsets[r], offsets[r] + counts[r]);
    buf.get(begin..end).ok_or_else(|| {
        FiberError::Communication(format!("slot {}..{} of rank {} exceeds buffer of {} values", begin, end, r, buf.len()))
    })
}

pub(crate) fn slot_mut<'a>(buf: &'a mut [f64], counts: &[usize], offsets: &[usize], r: usize) -> Result<&'a mut [f64], FiberError> {
    let (begin, end) = (offsets[r], offsets[r] + counts[r]);
    let len = buf.len();
    buf.get_mut(begin..end).ok_or_else(|| {
        FiberError::Communication(format!("slot {}..{} of rank {} exceeds buffer of {} values", begin, end, r, len))
    })
}

pub(crate) fn copy_exact(src: &[f64], dst: &mut [f64]) -> Result<(), FiberError> {
    if src.len() != dst.len() {
        return Err(FiberError::Communication(format!(
            "count mismatch: {} values sent, {} expected", src.len(), dst.len()
        )));
    }
    dst.copy_from_slice(src);
    Ok(())
}
