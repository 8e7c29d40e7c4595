use crate::error::Result;
use crate::spin::SpinVector;

/// Represents the spin-axis flow dy/dt = f(t, y).
pub trait DynamicalSystem {
    /// Evaluates the vector field.
    /// t: current time (years)
    /// y: current spin state
    /// Returns dy/dt, or an error when the driving data cannot be sampled at `t`.
    fn apply(&self, t: f64, y: SpinVector) -> Result<SpinVector>;
}

impl<S: DynamicalSystem + ?Sized> DynamicalSystem for &S {
    fn apply(&self, t: f64, y: SpinVector) -> Result<SpinVector> {
        (**self).apply(t, y)
    }
}

/// Receives every accepted step of an integration, in order.
pub trait StepObserver {
    /// index: running count of accepted grid points (the initial value is 0)
    /// t: time of the grid point (years)
    /// y: state at that time
    fn on_step(&mut self, index: usize, t: f64, y: SpinVector);

    /// Records kept so far, for progress reports.
    fn recorded(&self) -> usize {
        0
    }
}

impl<F: FnMut(usize, f64, SpinVector)> StepObserver for F {
    fn on_step(&mut self, index: usize, t: f64, y: SpinVector) {
        self(index, t, y)
    }
}
