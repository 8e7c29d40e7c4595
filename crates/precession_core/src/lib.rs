//! The `precession_core` crate integrates the Earth's spin axis over
//! millions of years, driven by a tabulated orbital solution.
//!
//! Key components:
//! - **Series**: `OrbitalSeries` (immutable element table), the text
//!   `table` parser with frame alignment and finite-difference element rates.
//! - **Kernel**: `PrecessionKernel`, the precession equation on top of the
//!   windowed `ElementInterpolator` (Neville, or rational on request).
//! - **Solvers**: `Dopri8` (adaptive RK 8(7) start-up) and `AdamsIntegrator`
//!   (order-12 predictor–corrector).
//! - **Runs**: `PrecessionRunner` for batched runs, `SampleSink` for
//!   decimated records and `climate` for derived climate columns.
pub mod climate;
pub mod config;
pub mod error;
pub mod finite_difference;
pub mod frames;
pub mod integration;
pub mod interpolation;
pub mod kepler;
pub mod kernel;
pub mod series;
pub mod sink;
pub mod solvers;
pub mod spin;
pub mod table;
pub mod traits;

pub use climate::{climate_records, predicted_precession_rates, ClimateRecord, PrecessionRate};
pub use config::{IntegratorSettings, PrecessionConstants};
pub use error::{PrecessionError, Result};
pub use integration::{integrate_precession, PrecessionRunner, RunProgress};
pub use interpolation::{ElementInterpolator, InterpolationScheme};
pub use kernel::PrecessionKernel;
pub use series::{ElementSet, OrbitalSample, OrbitalSeries};
pub use sink::{SampleRecord, SampleSink};
pub use spin::SpinVector;
pub use table::{parse_element_table, AstroSolution, ElementRecord, OrbitalSeriesBuilder};
pub use traits::{DynamicalSystem, StepObserver};
