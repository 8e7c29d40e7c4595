//! Run settings and the physical constants derived from them.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{PrecessionError, Result};
use crate::interpolation::InterpolationScheme;
use crate::spin::SpinVector;

/// Arcseconds per radian.
pub const ARCSEC_PER_RADIAN: f64 = 206264.80624709;

/// Obliquity at J2000 (23°26'21.448").
pub fn reference_obliquity() -> f64 {
    (23.0 * 3600.0 + 26.0 * 60.0 + 21.448) / ARCSEC_PER_RADIAN
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorSettings {
    /// Dynamical ellipticity scale factor.
    pub fgam: f64,
    /// Tidal dissipation scale factor.
    pub cmar: f64,
    /// Age to integrate to, in Myr (negative for the past).
    pub start_myr: f64,
    /// Magnitude of the multistep step, in years.
    pub step_years: f64,
    /// Record every n-th accepted step.
    pub decimation: usize,
    /// Attempt limit for each adaptive bootstrap sub-step.
    pub bootstrap_max_steps: usize,
    pub interpolation: InterpolationScheme,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            fgam: 1.0,
            cmar: 1.0,
            start_myr: -25.0,
            step_years: 200.0,
            decimation: 5,
            bootstrap_max_steps: 2000,
            interpolation: InterpolationScheme::Polynomial,
        }
    }
}

impl IntegratorSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.fgam.is_finite() || self.fgam <= 0.0 {
            return Err(PrecessionError::InvalidSettings(format!(
                "fgam must be positive, got {}",
                self.fgam
            )));
        }
        if !(0.0..=2.0).contains(&self.cmar) {
            return Err(PrecessionError::InvalidSettings(format!(
                "cmar must lie in [0, 2], got {}",
                self.cmar
            )));
        }
        if !self.start_myr.is_finite() || self.start_myr == 0.0 {
            return Err(PrecessionError::InvalidSettings(format!(
                "start age must be a non-zero number of Myr, got {}",
                self.start_myr
            )));
        }
        if !self.step_years.is_finite() || self.step_years <= 0.0 {
            return Err(PrecessionError::InvalidSettings(format!(
                "step must be a positive number of years, got {}",
                self.step_years
            )));
        }
        if self.decimation == 0 {
            return Err(PrecessionError::InvalidSettings(
                "decimation must be at least 1".to_string(),
            ));
        }
        if self.bootstrap_max_steps == 0 {
            return Err(PrecessionError::InvalidSettings(
                "bootstrap step limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// End of the integration in years.
    pub fn end_time_years(&self) -> f64 {
        self.start_myr * 1e6
    }

    /// Step signed in the direction of integration.
    pub fn signed_step(&self) -> f64 {
        self.step_years.copysign(self.start_myr)
    }
}

/// Precession and tidal constants of the Earth–Moon–Sun system
/// (Laskar et al. 1993, with the IERS 2000 precession constant).
///
/// Rates are in radians per year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrecessionConstants {
    /// Earth angular velocity.
    pub angular_velocity: f64,
    /// Precession of right ascension.
    pub right_ascension_rate: f64,
    /// Dynamical ellipticity fitted to the observed precession.
    pub ellipticity: f64,
    pub cp1: f64,
    pub cp2: f64,
    pub cp3: f64,
    pub cp4: f64,
    /// Tidal drift of the Earth rotation (per year).
    pub ak1: f64,
    /// Tidal drift of the lunar mean motion (per year).
    pub ak2: f64,
    /// Geodesic precession.
    pub apg: f64,
    pub initial_spin: SpinVector,
    /// Lunar and solar contributions to the precession constant (arcsec/yr),
    /// before the fgam scaling.
    pub rfl0: f64,
    pub rfl1: f64,
    pub rfl3: f64,
    pub rfs: f64,
}

impl PrecessionConstants {
    pub fn from_settings(fgam: f64, cmar: f64) -> Self {
        let cmar0 = -4.6e-18;

        let rm0 = 496303.3e-6;
        let rm1 = -20.7e-6;
        let rm2 = -0.1e-6;
        let rm3 = 3020.2e-6;
        let rs0 = 500209.034508230784e-6;
        let rs2 = 0.2e-6;

        let rdsc = ARCSEC_PER_RADIAN;
        let eps0 = reference_obliquity();

        let gk = 0.01720209895 * 365.25;
        let taml = 1.0 / 27068736.47;
        let tamt = 1.0 / 332946.0;
        let tams = 1.0;
        let al: f64 = 384747.981 / 1.495978701e8;
        let a_sun: f64 = 1.00000101778;

        let om = 474659981.59713733 / rdsc;
        let amn = -190.771235 * 365.25 / rdsc;
        let aml = 17325593.437360 / rdsc;
        let bp0 = 101803910e-15;
        let apuai = 5029.0966 / rdsc / 100.0;
        let app = apuai + 2.0 * bp0 / eps0.tan();
        let apg = 1.92 / rdsc / 100.0;
        let apls = app + apg;

        let rkl = 3.0 * gk * gk * taml / al.powi(3) / om;
        let rks = 3.0 * gk * gk * tams / a_sun.powi(3) / om;
        let lunar_ratio = taml / (taml + tamt) * aml * aml / amn / om;

        let cos_eps = eps0.cos();
        let xl0 = (rm0 - rm2 / 2.0) * cos_eps;
        let xl1 = rm1 * (2.0 * eps0).cos() / eps0.sin();
        let xl3 = -rm3 * lunar_ratio * (6.0 * cos_eps * cos_eps - 1.0);
        let xs = (rs0 - rs2 / 2.0) * cos_eps;

        // quadratic for the ellipticity matching the observed precession
        let aa = rkl * xl3;
        let bb = rkl * (xl0 + xl1) + rks * xs;
        let cc = -apls;
        let eld = (-bb + (bb * bb - 4.0 * aa * cc).sqrt()) / 2.0 / aa;

        let ak2 = cmar0 * 86400.0 * 365.25 * cmar;

        Self {
            angular_velocity: om,
            right_ascension_rate: app,
            ellipticity: eld,
            cp1: rkl * eld * (rm0 - rm2 / 2.0) * fgam,
            cp2: rkl * eld * rm1 * fgam,
            cp3: -rkl * eld * eld * rm3 * lunar_ratio * fgam * fgam,
            cp4: rks * eld * fgam,
            ak1: 51.0 * ak2 * aml / om,
            ak2,
            apg,
            initial_spin: SpinVector::new(eps0.sin(), 0.0),
            rfl0: rkl * eld * xl0 * rdsc,
            rfl1: rkl * eld * xl1 * rdsc,
            rfl3: rkl * eld * eld * xl3 * rdsc,
            rfs: rks * eld * xs * rdsc,
        }
    }

    /// Writes the derived constants to the `debug` log.
    pub fn log_diagnostics(&self) {
        let rdsc = ARCSEC_PER_RADIAN;
        debug!("Earth angular velocity: {}", self.angular_velocity * rdsc);
        debug!(
            "precession of right ascension: {}",
            self.right_ascension_rate * rdsc * 100.0
        );
        debug!("eld:  {:24.20}", self.ellipticity);
        debug!("rfl0: {:24.20}", self.rfl0);
        debug!("rfl1: {:24.20}", self.rfl1);
        debug!("rfl3: {:24.20}", self.rfl3);
        debug!("rfs:  {:24.20}", self.rfs);
        debug!(
            "rfl0+rfl1+rfl3+rfs: {:24.20}",
            self.rfl0 + self.rfl1 + self.rfl3 + self.rfs
        );
        debug!(
            "cp1..cp4 (arcsec/yr): {:.20} {:.20} {:.20} {:.20}",
            self.cp1 * rdsc,
            self.cp2 * rdsc,
            self.cp3 * rdsc,
            self.cp4 * rdsc
        );
        debug!("ak1: {:.20e} ak2: {:.20e}", self.ak1, self.ak2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = IntegratorSettings::default();
        settings.validate().expect("valid");
        assert_eq!(settings.end_time_years(), -25e6);
        assert_eq!(settings.signed_step(), -200.0);
    }

    #[test]
    fn rejects_out_of_range_settings() {
        let base = IntegratorSettings::default();
        assert_err_contains(
            IntegratorSettings { cmar: 2.5, ..base }.validate(),
            "cmar",
        );
        assert_err_contains(
            IntegratorSettings { fgam: 0.0, ..base }.validate(),
            "fgam",
        );
        assert_err_contains(
            IntegratorSettings { step_years: -5.0, ..base }.validate(),
            "step",
        );
        assert_err_contains(
            IntegratorSettings { decimation: 0, ..base }.validate(),
            "decimation",
        );
        assert_err_contains(
            IntegratorSettings { start_myr: 0.0, ..base }.validate(),
            "start age",
        );
    }

    #[test]
    fn nominal_constants_match_published_values() {
        let constants = PrecessionConstants::from_settings(1.0, 1.0);
        let rdsc = ARCSEC_PER_RADIAN;
        assert!((reference_obliquity() - 0.40909280422234157).abs() < 1e-15);
        assert!((constants.angular_velocity - 2301.2165295349987).abs() < 1e-9);
        assert!((constants.cp1 * rdsc - 37.52660322621579).abs() < 1e-6);
        assert!((constants.cp2 * rdsc + 0.0015651731683509).abs() < 1e-9);
        assert!((constants.cp3 * rdsc - 0.0000826029283161).abs() < 1e-10);
        assert!((constants.cp4 * rdsc - 34.81861759592058).abs() < 1e-6);
        assert!((constants.initial_spin.obliquity() - reference_obliquity()).abs() < 1e-15);
    }

    #[test]
    fn fgam_scales_precession_constants() {
        let nominal = PrecessionConstants::from_settings(1.0, 1.0);
        let scaled = PrecessionConstants::from_settings(1.1, 0.5);
        assert!((scaled.cp1 / nominal.cp1 - 1.1).abs() < 1e-12);
        assert!((scaled.cp3 / nominal.cp3 - 1.21).abs() < 1e-12);
        assert!((scaled.ak2 / nominal.ak2 - 0.5).abs() < 1e-12);
        assert_eq!(scaled.apg, nominal.apg);
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: IntegratorSettings =
            serde_json::from_str(r#"{"start_myr": -2.0, "interpolation": "rational"}"#)
                .expect("settings");
        assert_eq!(settings.start_myr, -2.0);
        assert_eq!(settings.step_years, 200.0);
        assert_eq!(settings.interpolation, InterpolationScheme::Rational);
        assert_eq!(
            IntegratorSettings::default().interpolation,
            InterpolationScheme::Polynomial
        );
    }
}
