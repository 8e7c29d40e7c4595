//! Fixed-step Adams predictor–corrector of order 12.

use log::info;

use super::coefficients::{ADAMS_ORDER, CORRECTOR, PREDICTOR};
use super::dopri8::{Dopri8, Dopri8Settings, MIN_TOLERANCE};
use crate::error::{PrecessionError, Result};
use crate::spin::SpinVector;
use crate::traits::{DynamicalSystem, StepObserver};

/// The last [`ADAMS_ORDER`] derivative evaluations, oldest first.
///
/// Pushing onto a full window drops the oldest entry; no heap storage is
/// involved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryWindow {
    entries: [SpinVector; ADAMS_ORDER],
    start: usize,
    len: usize,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryWindow {
    pub const fn new() -> Self {
        Self {
            entries: [SpinVector::ZERO; ADAMS_ORDER],
            start: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == ADAMS_ORDER
    }

    pub fn push(&mut self, value: SpinVector) {
        if self.len < ADAMS_ORDER {
            self.entries[(self.start + self.len) % ADAMS_ORDER] = value;
            self.len += 1;
        } else {
            self.entries[self.start] = value;
            self.start = (self.start + 1) % ADAMS_ORDER;
        }
    }

    /// Entry `index`, counting from the oldest.
    pub fn get(&self, index: usize) -> Option<SpinVector> {
        (index < self.len).then(|| self.entries[(self.start + index) % ADAMS_ORDER])
    }

    pub fn newest(&self) -> Option<SpinVector> {
        self.len.checked_sub(1).and_then(|last| self.get(last))
    }

    /// Overwrites the newest entry; no-op on an empty window.
    pub fn replace_newest(&mut self, value: SpinVector) {
        if let Some(last) = self.len.checked_sub(1) {
            self.entries[(self.start + last) % ADAMS_ORDER] = value;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = SpinVector> + '_ {
        (0..self.len).map(move |i| self.entries[(self.start + i) % ADAMS_ORDER])
    }

    /// `Σ numerator·f / denominator` over a full window.
    fn weighted_sum(&self, weights: &[(f64, f64); ADAMS_ORDER]) -> SpinVector {
        self.iter()
            .zip(weights)
            .fold(SpinVector::ZERO, |acc, (f, (num, den))| {
                acc + SpinVector::new(num * f.x / den, num * f.y / den)
            })
    }
}

/// Multistep integrator state between steps.
///
/// Grid points are `t0 + k·h` with `t0` the end of the start-up phase, so
/// long runs do not accumulate rounding in time.
#[derive(Debug, Clone)]
pub struct AdamsIntegrator {
    t0: f64,
    step: f64,
    t: f64,
    y: SpinVector,
    history: HistoryWindow,
    steps_completed: usize,
    total_steps: usize,
    index_offset: usize,
}

impl AdamsIntegrator {
    /// Resumes from a full derivative history ending at `(t0, y0)`.
    pub fn new(
        t0: f64,
        y0: SpinVector,
        step: f64,
        target: f64,
        history: HistoryWindow,
    ) -> Result<Self> {
        if !history.is_full() {
            return Err(PrecessionError::InvalidSettings(format!(
                "multistep history holds {} of {} derivatives",
                history.len(),
                ADAMS_ORDER
            )));
        }
        if !step.is_finite() || step == 0.0 {
            return Err(PrecessionError::InvalidSettings(format!(
                "multistep step must be finite and non-zero, got {}",
                step
            )));
        }
        let direction = if target - t0 < 0.0 { -1.0 } else { 1.0 };
        let step = step.abs() * direction;
        Ok(Self {
            t0,
            step,
            t: t0,
            y: y0,
            history,
            steps_completed: 0,
            total_steps: ((target - t0) / step).abs().floor() as usize,
            index_offset: 0,
        })
    }

    /// Starts a run at `(t0, y0)`: fills the history with `ADAMS_ORDER - 1`
    /// adaptive Runge-Kutta steps of size `step`, reporting each grid point.
    pub fn bootstrap<S, O>(
        system: &S,
        t0: f64,
        y0: SpinVector,
        step: f64,
        target: f64,
        max_attempts: usize,
        observer: &mut O,
    ) -> Result<Self>
    where
        S: DynamicalSystem + ?Sized,
        O: StepObserver + ?Sized,
    {
        let startup_span = (ADAMS_ORDER - 1) as f64 * step.abs();
        if !((target - t0).abs() > startup_span) {
            return Err(PrecessionError::InvalidSettings(format!(
                "integration span {} is shorter than the {} start-up steps of {} years",
                (target - t0).abs(),
                ADAMS_ORDER - 1,
                step.abs()
            )));
        }
        let direction = if target - t0 < 0.0 { -1.0 } else { 1.0 };
        let step = step.abs() * direction;
        let settings = Dopri8Settings {
            tolerance: MIN_TOLERANCE,
            max_step: step.abs(),
            max_attempts,
        };

        let mut history = HistoryWindow::new();
        let mut t = t0;
        let mut y = y0;
        history.push(system.apply(t, y)?);
        observer.on_step(0, t, y);

        for j in 1..ADAMS_ORDER {
            let t_next = t + step;
            y = Dopri8::new(system, t, y, t_next, step, settings).integrate()?;
            t = t_next;
            history.push(system.apply(t, y)?);
            observer.on_step(j, t, y);
        }
        info!(
            "multistep start-up finished at t = {} after {} adaptive intervals",
            t,
            ADAMS_ORDER - 1
        );

        let mut integrator = Self::new(t, y, step, target, history)?;
        integrator.index_offset = ADAMS_ORDER - 1;
        Ok(integrator)
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn y(&self) -> SpinVector {
        self.y
    }

    pub fn step_size(&self) -> f64 {
        self.step
    }

    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    pub fn steps_completed(&self) -> usize {
        self.steps_completed
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn is_done(&self) -> bool {
        self.steps_completed >= self.total_steps
    }

    /// Advances one grid point. Returns `false` once the run is complete.
    pub fn step<S, O>(&mut self, system: &S, observer: &mut O) -> Result<bool>
    where
        S: DynamicalSystem + ?Sized,
        O: StepObserver + ?Sized,
    {
        if self.is_done() {
            return Ok(false);
        }
        let k = self.steps_completed + 1;
        let t = self.t0 + k as f64 * self.step;

        // predict
        let predicted = self.y + self.step * self.history.weighted_sum(&PREDICTOR);
        self.history.push(system.apply(t, predicted)?);

        // correct
        let corrected = self.y + self.step * self.history.weighted_sum(&CORRECTOR);
        self.history.replace_newest(system.apply(t, corrected)?);

        self.t = t;
        self.y = corrected;
        self.steps_completed = k;
        observer.on_step(self.index_offset + k, t, corrected);
        Ok(true)
    }

    /// Runs at most `max_steps` steps; returns how many were taken.
    pub fn run<S, O>(&mut self, system: &S, observer: &mut O, max_steps: usize) -> Result<usize>
    where
        S: DynamicalSystem + ?Sized,
        O: StepObserver + ?Sized,
    {
        let mut taken = 0;
        while taken < max_steps && self.step(system, observer)? {
            taken += 1;
        }
        Ok(taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rotation {
        omega: f64,
    }

    impl DynamicalSystem for Rotation {
        fn apply(&self, _t: f64, y: SpinVector) -> Result<SpinVector> {
            Ok(SpinVector::new(-self.omega * y.y, self.omega * y.x))
        }
    }

    fn value(i: usize) -> SpinVector {
        SpinVector::new(i as f64, -(i as f64))
    }

    #[test]
    fn history_window_is_fifo() {
        let mut window = HistoryWindow::new();
        assert!(window.is_empty());
        assert_eq!(window.newest(), None);
        for i in 0..14 {
            window.push(value(i));
        }
        assert!(window.is_full());
        assert_eq!(window.len(), ADAMS_ORDER);
        assert_eq!(window.get(0), Some(value(2)));
        assert_eq!(window.newest(), Some(value(13)));
        assert_eq!(window.get(ADAMS_ORDER), None);

        window.replace_newest(value(99));
        assert_eq!(window.get(ADAMS_ORDER - 1), Some(value(99)));
        assert_eq!(window.get(ADAMS_ORDER - 2), Some(value(12)));
        let collected: Vec<_> = window.iter().collect();
        assert_eq!(collected.len(), ADAMS_ORDER);
        assert_eq!(collected[0], value(2));
    }

    #[test]
    fn constant_history_extrapolates_linearly() {
        let mut window = HistoryWindow::new();
        for _ in 0..ADAMS_ORDER {
            window.push(SpinVector::new(2.0, -1.0));
        }
        let sum = window.weighted_sum(&PREDICTOR);
        assert!((sum.x - 2.0).abs() < 1e-9);
        assert!((sum.y + 1.0).abs() < 1e-9);
    }

    #[test]
    fn incomplete_history_is_rejected() {
        let mut window = HistoryWindow::new();
        window.push(SpinVector::ZERO);
        let err = AdamsIntegrator::new(0.0, SpinVector::ZERO, 1.0, 10.0, window)
            .expect_err("incomplete");
        assert!(format!("{err}").contains("1 of 12"));
    }

    #[test]
    fn short_span_cannot_be_bootstrapped() {
        let system = Rotation { omega: 0.01 };
        let mut observer = |_: usize, _: f64, _: SpinVector| {};
        let err = AdamsIntegrator::bootstrap(
            &system,
            0.0,
            SpinVector::new(1.0, 0.0),
            -1.0,
            -5.0,
            2000,
            &mut observer,
        )
        .expect_err("short span");
        assert!(format!("{err}").contains("start-up steps"));
    }

    #[test]
    fn predictor_corrector_tracks_rotation() {
        let omega = 0.01;
        let system = Rotation { omega };
        let mut indices = Vec::new();
        let mut observer = |index: usize, _t: f64, _y: SpinVector| indices.push(index);

        let mut adams = AdamsIntegrator::bootstrap(
            &system,
            0.0,
            SpinVector::new(1.0, 0.0),
            1.0,
            -600.5,
            2000,
            &mut observer,
        )
        .expect("bootstrap");
        assert_eq!(adams.t(), -11.0);
        assert_eq!(adams.total_steps(), 589);

        while adams.step(&system, &mut observer).expect("step") {
            // the newest derivative is always re-evaluated at the corrected state
            let expected = system.apply(adams.t(), adams.y()).expect("apply");
            assert_eq!(adams.history().newest(), Some(expected));
        }

        assert!(adams.is_done());
        assert_eq!(adams.t(), -600.0);
        let angle = omega * adams.t();
        assert!((adams.y().x - angle.cos()).abs() < 1e-9);
        assert!((adams.y().y - angle.sin()).abs() < 1e-9);

        assert_eq!(indices.len(), ADAMS_ORDER + 589);
        assert!(indices.iter().enumerate().all(|(i, &index)| i == index));
    }

    #[test]
    fn run_respects_the_batch_limit() {
        let system = Rotation { omega: 0.02 };
        let mut observer = |_: usize, _: f64, _: SpinVector| {};
        let mut adams = AdamsIntegrator::bootstrap(
            &system,
            0.0,
            SpinVector::new(0.0, 1.0),
            2.0,
            100.0,
            2000,
            &mut observer,
        )
        .expect("bootstrap");
        assert_eq!(adams.total_steps(), 39);
        assert_eq!(adams.run(&system, &mut observer, 10).expect("run"), 10);
        assert_eq!(adams.steps_completed(), 10);
        assert_eq!(adams.run(&system, &mut observer, 100).expect("run"), 29);
        assert!(adams.is_done());
        assert_eq!(adams.run(&system, &mut observer, 5).expect("run"), 0);
    }
}
