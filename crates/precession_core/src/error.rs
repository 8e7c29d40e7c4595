//! Error types shared by every stage of the precession pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PrecessionError>;

/// Failures that abort a precession run.
///
/// Every variant describes a malformed input table, an infeasible
/// configuration or a numerical breakdown. None of them is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrecessionError {
    #[error("Orbital series has {len} samples; at least {required} are required.")]
    SeriesTooShort { len: usize, required: usize },

    #[error("Orbital series time is not strictly monotonic at sample {index}.")]
    NonMonotonicTime { index: usize },

    #[error("Orbital series spacing is not uniform at sample {index} (expected {expected}, got {actual}).")]
    NonUniformSpacing {
        index: usize,
        expected: f64,
        actual: f64,
    },

    #[error("Orbital series contains a non-finite value at sample {index}.")]
    NonFiniteSample { index: usize },

    #[error("Element table column {column} has {actual} values, expected {expected}.")]
    ColumnLengthMismatch {
        column: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Element table must have {expected} columns, got {actual}.")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("Query time {time} is outside the orbital series bounds [{lower}, {upper}].")]
    OutOfBounds { time: f64, lower: f64, upper: f64 },

    #[error("Derivative series for {column} has {actual} values, expected {expected}.")]
    DerivativeLengthMismatch {
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate abscissa {abscissa} in interpolation window.")]
    DuplicateAbscissa { abscissa: f64 },

    #[error("Rational interpolant has a pole near query time {time}.")]
    InterpolationPole { time: f64 },

    #[error("Finite-difference stencil needs {required} samples, got {len}. Use more data or lower the accuracy order.")]
    InsufficientSamples { len: usize, required: usize },

    #[error("Invalid finite-difference order: {0}")]
    InvalidStencil(String),

    #[error("Kepler solver failed to converge in {iterations} iterations (M = {mean_anomaly}, e = {eccentricity}).")]
    KeplerNonConvergence {
        iterations: usize,
        mean_anomaly: f64,
        eccentricity: f64,
    },

    #[error("Adaptive integrator exceeded {max_steps} attempts before reaching t = {target} (stuck at t = {time}).")]
    StepLimitExceeded {
        max_steps: usize,
        time: f64,
        target: f64,
    },

    #[error("Adaptive step size {step} no longer advances t = {time}.")]
    StepSizeUnderflow { time: f64, step: f64 },

    #[error("Invalid integrator settings: {0}")]
    InvalidSettings(String),

    #[error("Malformed element table at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
}
