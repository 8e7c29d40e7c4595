//! Climate-facing quantities derived from a finished run.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::config::{PrecessionConstants, ARCSEC_PER_RADIAN};
use crate::error::{PrecessionError, Result};
use crate::interpolation::ElementInterpolator;
use crate::kernel::precession_rate;
use crate::sink::SampleRecord;

/// Obliquity used for the reference precession-rate curve (rad).
pub const REFERENCE_RATE_OBLIQUITY: f64 = 0.40666;

/// Mean solar torque factor used for the reference curve.
pub const REFERENCE_SOLAR_FACTOR: f64 = 0.5007;

pub const CLIMATE_TABLE_HEADER: &str =
    "Age(Ma)\tEccentricity\tObliquity(radians)\tClimatic Precession\tPiBar\tPsi\tVarPi\tPrecAngle";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateRecord {
    pub age_myr: f64,
    pub eccentricity: f64,
    pub obliquity: f64,
    /// `e·sin(ψ + ϖ)`.
    pub climatic_precession: f64,
    /// `ϖ + ψ` reduced to `[0, 2π)`.
    pub pibar: f64,
    pub psi: f64,
    pub varpi: f64,
    /// `ψ + ϖ`, unreduced.
    pub precession_angle: f64,
}

impl ClimateRecord {
    pub fn new(sample: &SampleRecord, k: f64, h: f64) -> Self {
        let eccentricity = k.hypot(h);
        let varpi = h.atan2(k);
        let psi = sample.precession_angle;
        let precession_angle = psi + varpi;
        Self {
            age_myr: sample.age_myr,
            eccentricity,
            obliquity: sample.obliquity,
            climatic_precession: eccentricity * precession_angle.sin(),
            pibar: precession_angle.rem_euclid(TAU),
            psi,
            varpi,
            precession_angle,
        }
    }
}

/// Pairs every sample with the orbit interpolated at its own time.
pub fn climate_records(
    interpolator: &ElementInterpolator,
    samples: &[SampleRecord],
) -> Result<Vec<ClimateRecord>> {
    samples
        .iter()
        .map(|sample| {
            let elements = interpolator.sample(sample.time_years)?;
            Ok(ClimateRecord::new(sample, elements.k, elements.h))
        })
        .collect()
}

/// Tab-separated table with one row per record.
pub fn format_climate_table(records: &[ClimateRecord]) -> String {
    let mut out = String::with_capacity((records.len() + 1) * 160);
    out.push_str(CLIMATE_TABLE_HEADER);
    out.push('\n');
    for record in records {
        out.push_str(&signed_field(record.age_myr, 8, 4));
        for value in [
            record.eccentricity,
            record.obliquity,
            record.climatic_precession,
            record.pibar,
            record.psi,
            record.varpi,
            record.precession_angle,
        ] {
            out.push('\t');
            out.push_str(&signed_field(value, 17, 15));
        }
        out.push('\n');
    }
    out
}

/// Fixed-point field with a blank in place of the sign for non-negative values.
fn signed_field(value: f64, width: usize, precision: usize) -> String {
    let body = format!("{:.*}", precision, value.abs());
    let sign = if value.is_sign_negative() && value != 0.0 {
        '-'
    } else {
        ' '
    };
    format!("{:>width$}", format!("{sign}{body}"), width = width)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrecessionRate {
    pub time_years: f64,
    pub arcsec_per_year: f64,
}

/// Model precession rate at fixed obliquity from the present to `oldest_years`.
pub fn predicted_precession_rates(
    constants: &PrecessionConstants,
    oldest_years: f64,
    step_years: f64,
) -> Result<Vec<PrecessionRate>> {
    if !oldest_years.is_finite() {
        return Err(PrecessionError::InvalidSettings(format!(
            "oldest time must be finite, got {}",
            oldest_years
        )));
    }
    if !step_years.is_finite() || step_years == 0.0 {
        return Err(PrecessionError::InvalidSettings(format!(
            "rate grid step must be finite and non-zero, got {}",
            step_years
        )));
    }
    let step = step_years.abs().copysign(oldest_years);
    let count = (oldest_years / step + 1e-9).floor() as usize + 1;

    let cos_eps = REFERENCE_RATE_OBLIQUITY.cos();
    let sin_eps = REFERENCE_RATE_OBLIQUITY.sin();
    Ok((0..count)
        .map(|i| {
            let time_years = i as f64 * step;
            let rate = precession_rate(
                constants,
                time_years,
                cos_eps,
                sin_eps,
                REFERENCE_SOLAR_FACTOR,
            );
            PrecessionRate {
                time_years,
                arcsec_per_year: rate * ARCSEC_PER_RADIAN,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::InterpolationScheme;
    use crate::series::{ElementSet, OrbitalSample, OrbitalSeries};
    use std::sync::Arc;

    fn circular_orbit_series(k: f64, h: f64) -> ElementInterpolator {
        let samples = (0..20)
            .map(|i| OrbitalSample {
                time_years: -1000.0 * i as f64,
                elements: ElementSet {
                    k,
                    h,
                    ..ElementSet::default()
                },
            })
            .collect();
        let series = Arc::new(OrbitalSeries::new(samples, -1000.0).expect("series"));
        ElementInterpolator::new(series, InterpolationScheme::Polynomial)
    }

    fn sample(time_years: f64, psi: f64) -> SampleRecord {
        SampleRecord {
            age_myr: -time_years * 1e-6,
            time_years,
            obliquity: 0.4,
            precession_angle: psi,
        }
    }

    #[test]
    fn derived_columns_are_consistent() {
        let interpolator = circular_orbit_series(0.03, -0.04);
        let samples = [sample(0.0, 1.0), sample(-2500.0, -3.0)];
        let records = climate_records(&interpolator, &samples).expect("climate");
        assert_eq!(records.len(), 2);
        for (record, sample) in records.iter().zip(&samples) {
            assert!((record.eccentricity - 0.05).abs() < 1e-12);
            assert!((record.varpi - (-0.04_f64).atan2(0.03)).abs() < 1e-12);
            assert_eq!(record.psi, sample.precession_angle);
            assert!((record.precession_angle - (record.psi + record.varpi)).abs() < 1e-15);
            assert!(
                (record.climatic_precession - 0.05 * record.precession_angle.sin()).abs() < 1e-12
            );
            assert!((0.0..TAU).contains(&record.pibar));
            assert!((record.pibar.sin() - record.precession_angle.sin()).abs() < 1e-12);
            assert_eq!(record.age_myr, sample.age_myr);
        }
    }

    #[test]
    fn samples_outside_the_series_are_errors() {
        let interpolator = circular_orbit_series(0.01, 0.0);
        let err = climate_records(&interpolator, &[sample(-1.0e6, 0.0)]).expect_err("bounds");
        assert!(matches!(err, PrecessionError::OutOfBounds { .. }));
    }

    #[test]
    fn table_has_header_and_fixed_width_fields() {
        let record = ClimateRecord::new(&sample(-1.25e6, 0.5), 0.0, 0.02);
        let table = format_climate_table(&[record]);
        let mut lines = table.lines();
        assert_eq!(lines.next(), Some(CLIMATE_TABLE_HEADER));
        let fields: Vec<&str> = lines.next().expect("row").split('\t').collect();
        assert_eq!(fields.len(), 8);
        assert_eq!(fields[0], "  1.2500");
        assert_eq!(fields[1], " 0.020000000000000");
        assert!(lines.next().is_none());
        assert_eq!(signed_field(-0.5, 8, 4), " -0.5000");
    }

    #[test]
    fn reference_rate_curve_matches_published_constants() {
        let constants = PrecessionConstants::from_settings(1.0, 1.0);
        let rates = predicted_precession_rates(&constants, -50.0e6, 500_000.0).expect("rates");
        assert_eq!(rates.len(), 101);
        assert_eq!(rates[0].time_years, 0.0);
        assert_eq!(rates[100].time_years, -50.0e6);

        let (c, s) = (REFERENCE_RATE_OBLIQUITY.cos(), REFERENCE_RATE_OBLIQUITY.sin());
        let expected = 37.52660322621579 * c - 0.0015651731683509 * (2.0 * c * c - 1.0) / s
            + 0.0000826029283161 * (6.0 * c * c - 1.0)
            + 34.81861759592058 * REFERENCE_SOLAR_FACTOR * c;
        assert!((rates[0].arcsec_per_year - expected).abs() < 1e-5);
        // tidal slowing: faster precession in the past
        assert!(rates[100].arcsec_per_year > rates[0].arcsec_per_year);
    }

    #[test]
    fn zero_rate_step_is_rejected() {
        let constants = PrecessionConstants::from_settings(1.0, 1.0);
        assert!(predicted_precession_rates(&constants, -1.0e6, 0.0).is_err());
    }
}
