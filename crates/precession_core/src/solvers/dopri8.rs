//! Embedded Runge-Kutta 8(7) integrator with adaptive step control
//! (Dormand & Prince, after Hairer, Nørsett & Wanner's DOPRI8).

use log::trace;

use super::coefficients::{A, B, B_HAT, C, STAGES};
use crate::error::{PrecessionError, Result};
use crate::spin::SpinVector;
use crate::traits::DynamicalSystem;

/// Rounding unit assumed by the step controller.
pub const UROUND: f64 = 2.23e-16;

/// Smallest tolerance the controller accepts.
pub const MIN_TOLERANCE: f64 = 13.0 * UROUND;

/// Outcome of one step attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Accepted,
    Rejected,
    /// The target time was already reached; nothing was attempted.
    Finished,
}

/// Integration statistics for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub fn_evals: u64,
    pub accepted_steps: u64,
    pub rejected_steps: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dopri8Settings {
    /// Local error tolerance; raised to [`MIN_TOLERANCE`] if smaller.
    pub tolerance: f64,
    /// Largest step magnitude.
    pub max_step: f64,
    /// Attempts (accepted and rejected) allowed before giving up.
    pub max_attempts: usize,
}

impl Default for Dopri8Settings {
    fn default() -> Self {
        Self {
            tolerance: MIN_TOLERANCE,
            max_step: f64::INFINITY,
            max_attempts: 2000,
        }
    }
}

/// Integrates one interval `[t0, target]`, one attempt at a time.
///
/// A rejected attempt only shrinks the step; time and state move exclusively
/// on acceptance.
pub struct Dopri8<'a, S: DynamicalSystem + ?Sized> {
    system: &'a S,
    settings: Dopri8Settings,
    t: f64,
    y: SpinVector,
    target: f64,
    h: f64,
    direction: f64,
    rejected: bool,
    attempts: usize,
    k1: Option<SpinVector>,
    stats: Stats,
}

impl<'a, S: DynamicalSystem + ?Sized> Dopri8<'a, S> {
    pub fn new(
        system: &'a S,
        t0: f64,
        y0: SpinVector,
        target: f64,
        initial_step: f64,
        settings: Dopri8Settings,
    ) -> Self {
        let direction = if target - t0 < 0.0 { -1.0 } else { 1.0 };
        let max_step = settings.max_step.abs();
        let settings = Dopri8Settings {
            tolerance: settings.tolerance.max(MIN_TOLERANCE),
            max_step,
            ..settings
        };
        let h = initial_step.abs().max(1.0e-10).min(max_step) * direction;
        Self {
            system,
            settings,
            t: t0,
            y: y0,
            target,
            h,
            direction,
            rejected: false,
            attempts: 0,
            k1: None,
            stats: Stats::default(),
        }
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn y(&self) -> SpinVector {
        self.y
    }

    /// Step size of the next attempt.
    pub fn step_size(&self) -> f64 {
        self.h
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn is_finished(&self) -> bool {
        (self.t - self.target) * self.direction + UROUND > 0.0
    }

    /// Computes one trial step and accepts or rejects it.
    pub fn attempt(&mut self) -> Result<StepStatus> {
        if self.is_finished() {
            return Ok(StepStatus::Finished);
        }

        self.attempts += 1;
        if self.attempts > self.settings.max_attempts {
            return Err(PrecessionError::StepLimitExceeded {
                max_steps: self.settings.max_attempts,
                time: self.t,
                target: self.target,
            });
        }
        if self.t + 0.03 * self.h == self.t {
            return Err(PrecessionError::StepSizeUnderflow {
                time: self.t,
                step: self.h,
            });
        }

        let mut h = self.h;
        let lands = (self.t + h - self.target) * self.direction >= 0.0;
        if lands {
            h = self.target - self.t;
        }

        let k1 = match self.k1 {
            Some(k1) => k1,
            None => {
                let k1 = self.system.apply(self.t, self.y)?;
                self.stats.fn_evals += 1;
                self.k1 = Some(k1);
                k1
            }
        };

        let (y8, y7) = self.trial(k1, h)?;
        let err = self.error_norm(y8, y7);

        let tol = self.settings.tolerance;
        let fac = ((err / tol).powf(1.0 / 8.0) / 0.9).clamp(1.0 / 6.0, 3.0);
        let mut h_new = h / fac;

        // NaN errors are rejected too
        if !(err <= tol) {
            trace!(
                "rejected step at t = {} (h = {}, err = {:e})",
                self.t,
                h,
                err
            );
            self.rejected = true;
            self.h = h_new;
            self.stats.rejected_steps += 1;
            return Ok(StepStatus::Rejected);
        }

        self.t = if lands { self.target } else { self.t + h };
        self.y = y8;
        self.k1 = None;
        self.stats.accepted_steps += 1;

        if h_new.abs() > self.settings.max_step {
            h_new = self.direction * self.settings.max_step;
        }
        if self.rejected {
            h_new = self.direction * h_new.abs().min(h.abs());
        }
        self.rejected = false;
        self.h = h_new;
        Ok(StepStatus::Accepted)
    }

    /// Attempts steps until the target is reached; returns the final state.
    pub fn integrate(&mut self) -> Result<SpinVector> {
        while self.attempt()? != StepStatus::Finished {}
        Ok(self.y)
    }

    /// Eighth- and seventh-order solutions for a step of size `h`.
    #[allow(clippy::needless_range_loop)]
    fn trial(&mut self, k1: SpinVector, h: f64) -> Result<(SpinVector, SpinVector)> {
        let mut k = [SpinVector::ZERO; STAGES];
        k[0] = k1;
        for i in 1..STAGES {
            let mut sum = SpinVector::ZERO;
            for j in 0..i {
                sum += A[i][j] * k[j];
            }
            k[i] = self.system.apply(self.t + C[i] * h, self.y + h * sum)?;
        }
        self.stats.fn_evals += (STAGES - 1) as u64;

        let mut high = SpinVector::ZERO;
        let mut low = SpinVector::ZERO;
        for i in 0..STAGES {
            high += B[i] * k[i];
            low += B_HAT[i] * k[i];
        }
        Ok((self.y + h * high, self.y + h * low))
    }

    /// RMS of the component errors, each scaled by the solution magnitude.
    fn error_norm(&self, y8: SpinVector, y7: SpinVector) -> f64 {
        let floor = (2.0 * UROUND / self.settings.tolerance).max(1.0e-6);
        let scale = |high: f64, low: f64, start: f64| {
            let denom = floor.max(high.abs()).max(start.abs());
            (high - low) / denom
        };
        let ex = scale(y8.x, y7.x, self.y.x);
        let ey = scale(y8.y, y7.y, self.y.y);
        ((ex * ex + ey * ey) / 2.0).sqrt()
    }
}
