//! Batched reaction step over the lane buffers.
//!
//! The transfer protocol treats the reaction step as an opaque collaborator: it receives the
//! point buffers, the current time, the macro step width and a sub-step count, and mutates the
//! buffers in place. [`ExplicitEuler`] and [`Heun`] are provided for kernels that only supply a
//! lane-vectorized right-hand side ([`RhsKernel`]).

use crate::error::FiberError;
use crate::transfer::lanes::{LaneScalar, PointBuffer};

/// Advances every lane of every buffer by `dt`. Results are written back into `buffers`.
pub trait BatchReactionStep<T, const W: usize> {
    fn advance(&mut self, buffers: &mut [PointBuffer<T, W>], t: T, dt: T, n_sub_steps: usize) -> Result<(), FiberError>;
}

/// Right-hand side of the reaction ODE, evaluated for `W` instances at once.
pub trait RhsKernel<T, const W: usize>: Sync {
    fn n_states(&self) -> usize;
    fn n_intermediates(&self) -> usize;
    /// Initial value of every state, broadcast to all lanes.
    fn initial_states(&self) -> Vec<T>;
    /// Computes `rates = f(t, states)` and refreshes the intermediates.
    fn evaluate(&self, t: T, states: &[[T; W]], rates: &mut [[T; W]], intermediates: &mut [[T; W]]);
}

pub mod euler;
pub use euler::ExplicitEuler;
pub mod heun;
pub use heun::Heun;

/// Installs the global rayon pool used to integrate buffers in parallel.
///
/// Uses one thread per CPU unless `n_threads` is given. Returns `false` if a global pool was
/// already installed.
#[cfg(feature = "rayon")]
pub fn init_thread_pool(n_threads: Option<usize>) -> bool {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads.unwrap_or_else(num_cpus::get))
        .build_global()
        .is_ok()
}

pub(crate) fn check_step<T: LaneScalar, const W: usize, K: RhsKernel<T, W>>(
    kernel: &K,
    buffers: &[PointBuffer<T, W>],
    dt: T,
    n_sub_steps: usize,
) -> Result<T, FiberError> {
    if n_sub_steps == 0 {
        return Err(FiberError::Config("n_sub_steps must be at least 1".into()));
    }
    if let Some(b) = buffers
        .iter()
        .find(|b| b.states.len() != kernel.n_states() || b.intermediates.len() != kernel.n_intermediates())
    {
        return Err(FiberError::Config(format!(
            "point buffer has {} states and {} intermediates, kernel expects {} and {}",
            b.states.len(), b.intermediates.len(), kernel.n_states(), kernel.n_intermediates()
        )));
    }
    let n = <T as num_traits::NumCast>::from(n_sub_steps).ok_or_else(|| FiberError::Config("sub-step count not representable".into()))?;
    Ok(dt / n)
}

/// Runs `body` on every buffer with per-worker scratch created by `init`.
pub(crate) fn for_each_buffer<T, const W: usize, S, I, B>(buffers: &mut [PointBuffer<T, W>], init: I, body: B)
where
    T: LaneScalar,
    I: Fn() -> S + Sync + Send,
    B: Fn(&mut S, &mut PointBuffer<T, W>) + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        buffers.par_iter_mut().for_each_init(init, body);
    }
    #[cfg(not(feature = "rayon"))]
    {
        let mut scratch = init();
        for buffer in buffers.iter_mut() {
            body(&mut scratch, buffer);
        }
    }
}
