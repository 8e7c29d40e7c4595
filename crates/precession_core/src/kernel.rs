//! Right-hand side of the spin-axis precession equation (Laskar et al. 1993,
//! corrected for tidal dissipation).

use crate::config::PrecessionConstants;
use crate::error::Result;
use crate::interpolation::ElementInterpolator;
use crate::series::ElementSet;
use crate::spin::SpinVector;
use crate::traits::DynamicalSystem;

/// Precession rate `R'(ε)` in radians per year at time `t` (years).
///
/// `solar_factor` is the eccentricity-dependent solar torque term
/// `(1 - e²)^(-3/2) / 2` minus its secular correction.
pub fn precession_rate(
    constants: &PrecessionConstants,
    t: f64,
    cos_eps: f64,
    sin_eps: f64,
    solar_factor: f64,
) -> f64 {
    let cor1 = 1.0 + constants.ak1 * t;
    let cor2 = 1.0 + 2.0 * constants.ak2 * t;
    let x = cos_eps;
    cor1 * (cor2
        * (constants.cp1 * x
            + constants.cp2 * (2.0 * x * x - 1.0) / sin_eps
            + cor2 * constants.cp3 * (6.0 * x * x - 1.0))
        + constants.cp4 * solar_factor * x)
}

/// Solar torque factor for an orbit with the given `(k, h)`.
pub fn solar_factor(k: f64, h: f64) -> f64 {
    (1.0 - k * k - h * h).powf(-1.5) / 2.0 - 0.522e-6
}

/// Time derivative of the spin state for the given orbital elements.
pub fn derivative(
    constants: &PrecessionConstants,
    t: f64,
    elements: &ElementSet,
    spin: SpinVector,
) -> SpinVector {
    let sin_sq = spin.norm_squared();
    let cos_eps = (1.0 - sin_sq).sqrt();
    let sin_eps = sin_sq.sqrt();

    let rate = precession_rate(
        constants,
        t,
        cos_eps,
        sin_eps,
        solar_factor(elements.k, elements.h),
    );

    let (q, p) = (elements.q, elements.p);
    let cc = q * elements.dp - p * elements.dq;
    let dd = 2.0 / (1.0 - p * p - q * q).sqrt();
    let a = dd * (elements.dq + p * cc);
    let b = dd * (elements.dp - q * cc);

    let coef = rate - 2.0 * cc - constants.apg;

    SpinVector::new(
        -spin.y * coef + a * cos_eps,
        spin.x * coef - b * cos_eps,
    )
}

/// The precession equation driven by an interpolated orbital series.
#[derive(Debug, Clone)]
pub struct PrecessionKernel {
    constants: PrecessionConstants,
    interpolator: ElementInterpolator,
}

impl PrecessionKernel {
    pub fn new(constants: PrecessionConstants, interpolator: ElementInterpolator) -> Self {
        Self {
            constants,
            interpolator,
        }
    }

    pub fn constants(&self) -> &PrecessionConstants {
        &self.constants
    }

    pub fn interpolator(&self) -> &ElementInterpolator {
        &self.interpolator
    }
}

impl DynamicalSystem for PrecessionKernel {
    fn apply(&self, t: f64, y: SpinVector) -> Result<SpinVector> {
        let elements = self.interpolator.sample(t)?;
        Ok(derivative(&self.constants, t, &elements, y))
    }
}
