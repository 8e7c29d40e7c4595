//! Numerical integrators for the spin-axis equation.
//!
//! - **Dopri8**: embedded Runge-Kutta 8(7) with adaptive steps, used to start
//!   the multistep method.
//! - **AdamsIntegrator**: fixed-step order-12 predictor–corrector that carries
//!   the run.

pub mod adams;
pub mod coefficients;
pub mod dopri8;

pub use adams::{AdamsIntegrator, HistoryWindow};
pub use dopri8::{Dopri8, Dopri8Settings, StepStatus};
