//! Heun integration (explicit trapezoidal rule) of a lane-vectorized reaction model.

use crate::error::FiberError;
use crate::reaction::{check_step, for_each_buffer, BatchReactionStep, RhsKernel};
use crate::transfer::lanes::{LaneScalar, PointBuffer};

/// `y* = y + h f(t, y)`, `y ← y + h/2 (f(t, y) + f(t + h, y*))` per sub-step.
///
/// Intermediates hold the values of the second evaluation.
pub struct Heun<K> {
    pub kernel: K,
}

impl<K> Heun<K> {
    pub fn new(kernel: K) -> Self {
        Self { kernel }
    }
}

struct Scratch<T, const W: usize> {
    rates0: Vec<[T; W]>,
    rates1: Vec<[T; W]>,
    predictor: Vec<[T; W]>,
}

impl<T, const W: usize, K> BatchReactionStep<T, W> for Heun<K>
where
    T: LaneScalar,
    K: RhsKernel<T, W>,
{
    fn advance(&mut self, buffers: &mut [PointBuffer<T, W>], t: T, dt: T, n_sub_steps: usize) -> Result<(), FiberError> {
        let h = check_step(&self.kernel, buffers, dt, n_sub_steps)?;
        let half = h / (T::one() + T::one());
        let kernel = &self.kernel;
        let n_states = kernel.n_states();
        for_each_buffer(
            buffers,
            || Scratch {
                rates0: vec![[T::zero(); W]; n_states],
                rates1: vec![[T::zero(); W]; n_states],
                predictor: vec![[T::zero(); W]; n_states],
            },
            |s: &mut Scratch<T, W>, buffer| {
                let mut time = t;
                for _ in 0..n_sub_steps {
                    kernel.evaluate(time, &buffer.states, &mut s.rates0, &mut buffer.intermediates);
                    for ((p, y), k0) in s.predictor.iter_mut().zip(&buffer.states).zip(&s.rates0) {
                        for lane in 0..W {
                            p[lane] = y[lane] + h * k0[lane];
                        }
                    }
                    kernel.evaluate(time + h, &s.predictor, &mut s.rates1, &mut buffer.intermediates);
                    for ((y, k0), k1) in buffer.states.iter_mut().zip(&s.rates0).zip(&s.rates1) {
                        for lane in 0..W {
                            y[lane] = y[lane] + half * (k0[lane] + k1[lane]);
                        }
                    }
                    time = time + h;
                }
            },
        );
        Ok(())
    }
}
