// in-memory multi-rank communication: one OS thread per rank

use std::sync::{Arc, Barrier, Mutex, MutexGuard};

use super::{check_layout, copy_exact, slot, slot_mut, Comm};
use crate::error::FiberError;

struct Mailbox {
    barrier: Barrier,
    slots: Mutex<Vec<Option<Vec<f64>>>>,
}

/// One rank of an in-memory rank group.
///
/// Every collective deposits into a shared mailbox, waits at a barrier, reads, and waits again,
/// so a collective only completes once all ranks of the group have entered it. Each handle is
/// meant to be moved to its own thread.
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl ThreadComm {
    /// Creates the handles for a group of `size` ranks, in rank order.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        let mailbox = Arc::new(Mailbox {
            barrier: Barrier::new(size.max(1)),
            slots: Mutex::new(vec![None; size]),
        });
        (0..size)
            .map(|rank| ThreadComm { rank, size, mailbox: Arc::clone(&mailbox) })
            .collect()
    }

    fn slots(&self) -> MutexGuard<'_, Vec<Option<Vec<f64>>>> {
        // a panicking rank cannot leave a half-written slot behind
        self.mailbox.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Comm for ThreadComm {
    fn rank(&self) -> usize { self.rank }
    fn size(&self) -> usize { self.size }
    fn barrier(&self) { self.mailbox.barrier.wait(); }

    fn variable_gather(
        &self,
        local: &[f64],
        recv: Option<&mut [f64]>,
        counts: &[usize],
        offsets: &[usize],
        root: usize,
    ) -> Result<(), FiberError> {
        let layout = check_layout(counts, offsets, self.size, root);
        self.slots()[self.rank] = Some(local.to_vec());
        self.mailbox.barrier.wait();

        let result = if self.rank == root {
            let incoming: Vec<Option<Vec<f64>>> = self.slots().iter_mut().map(Option::take).collect();
            layout.and_then(|_| {
                let recv = recv.ok_or_else(|| FiberError::Communication("root passed no receive buffer".into()))?;
                for (r, data) in incoming.into_iter().enumerate() {
                    let data = data.ok_or_else(|| FiberError::Communication(format!("rank {} sent nothing", r)))?;
                    copy_exact(&data, slot_mut(recv, counts, offsets, r)?)?;
                }
                Ok(())
            })
        } else {
            layout
        };
        self.mailbox.barrier.wait();
        result
    }

    fn variable_scatter(
        &self,
        send: Option<&[f64]>,
        recv: &mut [f64],
        counts: &[usize],
        offsets: &[usize],
        root: usize,
    ) -> Result<(), FiberError> {
        let layout = check_layout(counts, offsets, self.size, root);
        let mut root_result = Ok(());
        if self.rank == root {
            let mut slots = self.slots();
            match (&layout, send) {
                (Ok(()), Some(send)) => {
                    for r in 0..self.size {
                        match slot(send, counts, offsets, r) {
                            Ok(part) => slots[r] = Some(part.to_vec()),
                            Err(e) => root_result = Err(e),
                        }
                    }
                }
                (Ok(()), None) => {
                    root_result = Err(FiberError::Communication("root passed no send buffer".into()));
                }
                (Err(_), _) => {}
            }
        }
        self.mailbox.barrier.wait();

        let data = self.slots()[self.rank].take();
        self.mailbox.barrier.wait();
        layout?;
        root_result?;
        let data = data.ok_or_else(|| FiberError::Communication(format!("rank {} received nothing from root {}", self.rank, root)))?;
        copy_exact(&data, recv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn gather_places_by_offset_not_arrival() {
        let comms = ThreadComm::group(3);
        // rank r contributes r+1 values; layout reversed so offsets are not in rank order
        let counts = vec![1, 2, 3];
        let offsets = vec![5, 3, 0];
        let results: Vec<Option<Vec<f64>>> = thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    let (counts, offsets) = (counts.clone(), offsets.clone());
                    s.spawn(move || {
                        let r = comm.rank();
                        let local = vec![r as f64; r + 1];
                        let mut recv = if r == 1 { Some(vec![-1.0; 6]) } else { None };
                        comm.variable_gather(&local, recv.as_deref_mut(), &counts, &offsets, 1).unwrap();
                        recv
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(results[0].is_none());
        assert!(results[2].is_none());
        assert_eq!(results[1].as_ref().unwrap(), &vec![2.0, 2.0, 2.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn scatter_delivers_each_slice() {
        let comms = ThreadComm::group(2);
        let counts = vec![3, 1];
        let offsets = vec![0, 3];
        let results: Vec<Vec<f64>> = thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    let (counts, offsets) = (counts.clone(), offsets.clone());
                    s.spawn(move || {
                        let send = vec![1.0, 2.0, 3.0, 4.0];
                        let mut recv = vec![0.0; counts[comm.rank()]];
                        let root_send = (comm.rank() == 0).then_some(send.as_slice());
                        comm.variable_scatter(root_send, &mut recv, &counts, &offsets, 0).unwrap();
                        recv
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results, vec![vec![1.0, 2.0, 3.0], vec![4.0]]);
    }
}
