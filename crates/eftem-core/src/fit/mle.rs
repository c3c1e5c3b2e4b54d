use crate::consts::{INITIAL_STEP, MAX_DIVERGENT_STEPS, R_START};

use super::{BackgroundFit, ErrorCode, PixelFit};

/// Maximum-likelihood fit of the power law to Poisson-distributed counts.
///
/// Solves `S1(r)/S0(r) = W` for `r` with Newton-Raphson, where
/// `Sk(r) = Σ ln(E_i)^k * E_i^-r` and `W = Σ ln(E_i) y_i / Σ y_i`, then
/// derives `a = ln(Σ y_i / S0(r))`.
#[derive(Clone, Debug)]
pub struct MleFit {
    ln_e: Vec<f64>,
    epsilon: f64,
}

impl MleFit {
    /// `energy_losses` are the pre-edge energy losses in eV, in the same order
    /// as the counts later passed to [`BackgroundFit::fit`].
    pub fn new(energy_losses: &[f32], epsilon: f32) -> Self {
        Self::from_ln_energy_losses(
            energy_losses.iter().map(|&e| (e as f64).ln()).collect(),
            epsilon,
        )
    }

    pub fn from_ln_energy_losses(ln_e: Vec<f64>, epsilon: f32) -> Self {
        Self {
            ln_e,
            epsilon: epsilon as f64,
        }
    }

    /// `(S0, S1, S2)` at exponent `r`.
    fn power_sums(&self, r: f64) -> (f64, f64, f64) {
        self.ln_e.iter().fold((0.0, 0.0, 0.0), |(s0, s1, s2), &l| {
            let p = (-r * l).exp();
            (s0 + p, s1 + l * p, s2 + l * l * p)
        })
    }

    /// Count-weighted mean of `ln(E)`; 0 when all counts are 0.
    fn weight(&self, counts: &[f32]) -> f64 {
        let (num, den) = self
            .ln_e
            .iter()
            .zip(counts)
            .fold((0.0, 0.0), |(num, den), (&l, &y)| {
                (num + l * y as f64, den + y as f64)
            });
        if den == 0.0 {
            0.0
        } else {
            num / den
        }
    }

    fn newton_step(&self, r: f64, weight: f64) -> f64 {
        let (s0, s1, s2) = self.power_sums(r);
        let mean = s1 / s0;
        r - (mean - weight) / (mean * mean - s2 / s0)
    }
}

impl BackgroundFit for MleFit {
    fn fit(&self, counts: &[f32]) -> PixelFit {
        debug_assert_eq!(counts.len(), self.ln_e.len());

        if counts.iter().any(|&y| y < 0.0) {
            return PixelFit::failed(ErrorCode::SignalLessThanZero);
        }

        let weight = self.weight(counts);
        let mut r = R_START;
        let mut guard = StepGuard::new(self.epsilon);

        loop {
            let next = self.newton_step(r, weight);
            if !next.is_finite() {
                return PixelFit::failed(ErrorCode::Nan);
            }
            let step = (next - r).abs();
            r = next;
            match guard.observe(step) {
                StepOutcome::Converged => break,
                StepOutcome::Continue => {}
                StepOutcome::Diverged => return PixelFit::failed(ErrorCode::Convergence),
            }
        }

        let (s0, _, _) = self.power_sums(r);
        let sum_counts: f64 = counts.iter().map(|&y| y as f64).sum();
        let ratio = sum_counts / s0;
        if ratio < 0.0 {
            return PixelFit {
                r: r as f32,
                a: 0.0,
                error: ErrorCode::ANotPossibleToCalculate,
            };
        }
        let a = ratio.ln();
        if a.is_nan() {
            return PixelFit {
                r: r as f32,
                a: 0.0,
                error: ErrorCode::Nan,
            };
        }

        PixelFit {
            r: r as f32,
            a: a as f32,
            error: ErrorCode::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepOutcome {
    Converged,
    Continue,
    Diverged,
}

/// Exit conditions of the Newton iteration, fed one step size at a time.
#[derive(Debug)]
struct StepGuard {
    epsilon: f64,
    prev_step: f64,
    growing_steps: u32,
}

impl StepGuard {
    fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            prev_step: INITIAL_STEP,
            growing_steps: 0,
        }
    }

    fn observe(&mut self, step: f64) -> StepOutcome {
        if step < self.epsilon {
            return StepOutcome::Converged;
        }
        // An exactly repeated step means the iteration is cycling.
        if step == self.prev_step {
            return StepOutcome::Diverged;
        }
        if step > self.prev_step {
            self.growing_steps += 1;
            if self.growing_steps >= MAX_DIVERGENT_STEPS {
                return StepOutcome::Diverged;
            }
        }
        self.prev_step = step;
        StepOutcome::Continue
    }
}
