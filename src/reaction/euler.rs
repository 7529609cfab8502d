//! Explicit Euler integration of a lane-vectorized reaction model.

use crate::error::FiberError;
use crate::reaction::{check_step, for_each_buffer, BatchReactionStep, RhsKernel};
use crate::transfer::lanes::{LaneScalar, PointBuffer};

/// `y ← y + h f(t, y)` for each of the `n_sub_steps` sub-steps of width `h = dt / n_sub_steps`.
pub struct ExplicitEuler<K> {
    pub kernel: K,
}

impl<K> ExplicitEuler<K> {
    pub fn new(kernel: K) -> Self {
        Self { kernel }
    }
}

impl<T, const W: usize, K> BatchReactionStep<T, W> for ExplicitEuler<K>
where
    T: LaneScalar,
    K: RhsKernel<T, W>,
{
    fn advance(&mut self, buffers: &mut [PointBuffer<T, W>], t: T, dt: T, n_sub_steps: usize) -> Result<(), FiberError> {
        let h = check_step(&self.kernel, buffers, dt, n_sub_steps)?;
        let kernel = &self.kernel;
        let n_states = kernel.n_states();
        for_each_buffer(
            buffers,
            || vec![[T::zero(); W]; n_states],
            |rates, buffer| {
                let mut time = t;
                for _ in 0..n_sub_steps {
                    kernel.evaluate(time, &buffer.states, rates, &mut buffer.intermediates);
                    for (state, rate) in buffer.states.iter_mut().zip(rates.iter()) {
                        for lane in 0..W {
                            state[lane] = state[lane] + h * rate[lane];
                        }
                    }
                    time = time + h;
                }
            },
        );
        Ok(())
    }
}
