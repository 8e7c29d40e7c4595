//! Stepped precession run: bootstrap on construction, then multistep batches.

use log::info;
use serde::Serialize;
use std::sync::Arc;

use crate::config::{IntegratorSettings, PrecessionConstants};
use crate::error::{PrecessionError, Result};
use crate::interpolation::ElementInterpolator;
use crate::kernel::PrecessionKernel;
use crate::series::OrbitalSeries;
use crate::solvers::AdamsIntegrator;
use crate::traits::StepObserver;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunProgress {
    pub done: bool,
    pub steps_completed: usize,
    pub total_steps: usize,
    pub records: usize,
    /// Age of the current state in Myr.
    pub age_myr: f64,
}

/// Owns one integration from the present back (or forward) to the
/// configured age.
///
/// The caller drives it with [`PrecessionRunner::run_steps`]; stopping the
/// calls cancels the run between two completed steps.
pub struct PrecessionRunner<O: StepObserver> {
    kernel: PrecessionKernel,
    integrator: AdamsIntegrator,
    observer: O,
}

impl<O: StepObserver> PrecessionRunner<O> {
    pub fn new(
        series: Arc<OrbitalSeries>,
        settings: IntegratorSettings,
        mut observer: O,
    ) -> Result<Self> {
        settings.validate()?;

        let end_time = settings.end_time_years();
        let (lower, upper) = series.bounds();
        for time in [0.0, end_time] {
            if !series.contains(time) {
                return Err(PrecessionError::OutOfBounds { time, lower, upper });
            }
        }

        let constants = PrecessionConstants::from_settings(settings.fgam, settings.cmar);
        constants.log_diagnostics();

        let interpolator = ElementInterpolator::new(series, settings.interpolation);
        let kernel = PrecessionKernel::new(constants, interpolator);

        info!(
            "starting precession run to {} Myr (step {} yr, fgam {}, cmar {})",
            settings.start_myr, settings.step_years, settings.fgam, settings.cmar
        );
        let integrator = AdamsIntegrator::bootstrap(
            &kernel,
            0.0,
            constants.initial_spin,
            settings.signed_step(),
            end_time,
            settings.bootstrap_max_steps,
            &mut observer,
        )?;

        Ok(Self {
            kernel,
            integrator,
            observer,
        })
    }

    /// Advances at most `batch_size` multistep steps.
    pub fn run_steps(&mut self, batch_size: usize) -> Result<RunProgress> {
        let was_done = self.integrator.is_done();
        self.integrator
            .run(&self.kernel, &mut self.observer, batch_size)?;
        if !was_done && self.integrator.is_done() {
            info!(
                "precession run finished at t = {} yr after {} steps",
                self.integrator.t(),
                self.integrator.steps_completed()
            );
        }
        Ok(self.progress())
    }

    pub fn is_done(&self) -> bool {
        self.integrator.is_done()
    }

    pub fn progress(&self) -> RunProgress {
        RunProgress {
            done: self.integrator.is_done(),
            steps_completed: self.integrator.steps_completed(),
            total_steps: self.integrator.total_steps(),
            records: self.observer.recorded(),
            age_myr: -self.integrator.t() * 1e-6,
        }
    }

    pub fn kernel(&self) -> &PrecessionKernel {
        &self.kernel
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }
}

/// Runs a whole integration and hands the observer back.
pub fn integrate_precession<O: StepObserver>(
    series: Arc<OrbitalSeries>,
    settings: IntegratorSettings,
    observer: O,
) -> Result<O> {
    let mut runner = PrecessionRunner::new(series, settings, observer)?;
    while !runner.is_done() {
        runner.run_steps(usize::MAX)?;
    }
    Ok(runner.into_observer())
}
