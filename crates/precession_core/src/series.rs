//! The immutable orbital-element table that drives the precession equation.

use serde::{Deserialize, Serialize};

use crate::error::{PrecessionError, Result};

/// Number of interpolated scalars per sample (k, h, q, p and their rates).
pub const ELEMENT_COUNT: usize = 8;

/// Columns of a precomputed table: time in kyr followed by the elements.
pub const TABLE_COLUMNS: usize = ELEMENT_COUNT + 1;

/// Smallest series that still fills one interpolation window.
pub const MIN_SERIES_LEN: usize = 8;

/// Quasi-equinoctial elements of the Earth orbit and their time derivatives
/// (per year).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementSet {
    pub k: f64,
    pub h: f64,
    pub q: f64,
    pub p: f64,
    pub dk: f64,
    pub dh: f64,
    pub dq: f64,
    pub dp: f64,
}

impl ElementSet {
    pub fn from_array(values: [f64; ELEMENT_COUNT]) -> Self {
        let [k, h, q, p, dk, dh, dq, dp] = values;
        Self {
            k,
            h,
            q,
            p,
            dk,
            dh,
            dq,
            dp,
        }
    }

    pub fn to_array(&self) -> [f64; ELEMENT_COUNT] {
        [
            self.k, self.h, self.q, self.p, self.dk, self.dh, self.dq, self.dp,
        ]
    }

    pub fn eccentricity(&self) -> f64 {
        self.k.hypot(self.h)
    }

    /// Longitude of perihelion `ϖ = atan2(h, k)`.
    pub fn longitude_of_perihelion(&self) -> f64 {
        self.h.atan2(self.k)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalSample {
    pub time_years: f64,
    #[serde(flatten)]
    pub elements: ElementSet,
}

/// Strictly time-ordered orbital samples with their nominal spacing.
///
/// The direction (ascending or descending in time) is fixed by the data.
/// Construct once and share read-only; nothing mutates it after validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrbitalSeries {
    samples: Vec<OrbitalSample>,
    step_years: f64,
}

impl OrbitalSeries {
    pub fn new(samples: Vec<OrbitalSample>, step_years: f64) -> Result<Self> {
        if samples.len() < MIN_SERIES_LEN {
            return Err(PrecessionError::SeriesTooShort {
                len: samples.len(),
                required: MIN_SERIES_LEN,
            });
        }

        for (index, sample) in samples.iter().enumerate() {
            let finite = sample.time_years.is_finite()
                && sample.elements.to_array().iter().all(|v| v.is_finite());
            if !finite {
                return Err(PrecessionError::NonFiniteSample { index });
            }
        }

        let direction = (samples[1].time_years - samples[0].time_years).signum();
        for (index, pair) in samples.windows(2).enumerate() {
            let delta = pair[1].time_years - pair[0].time_years;
            if delta == 0.0 || delta.signum() != direction {
                return Err(PrecessionError::NonMonotonicTime { index: index + 1 });
            }
        }

        if !step_years.is_finite() || step_years == 0.0 || step_years.signum() != direction {
            return Err(PrecessionError::InvalidSettings(format!(
                "series step {} does not match the direction of its time column",
                step_years
            )));
        }

        Ok(Self {
            samples,
            step_years,
        })
    }

    /// Builds a series from a precomputed column-major table
    /// `[t (kyr), k, h, q, p, dk, dh, dq, dp]`.
    pub fn from_table(columns: &[Vec<f64>]) -> Result<Self> {
        if columns.len() != TABLE_COLUMNS {
            return Err(PrecessionError::ColumnCountMismatch {
                expected: TABLE_COLUMNS,
                actual: columns.len(),
            });
        }
        let len = columns[0].len();
        for (column, values) in columns.iter().enumerate().skip(1) {
            if values.len() != len {
                return Err(PrecessionError::ColumnLengthMismatch {
                    column,
                    expected: len,
                    actual: values.len(),
                });
            }
        }

        let samples: Vec<OrbitalSample> = (0..len)
            .map(|i| {
                let mut values = [0.0; ELEMENT_COUNT];
                for (slot, column) in values.iter_mut().zip(&columns[1..]) {
                    *slot = column[i];
                }
                OrbitalSample {
                    time_years: columns[0][i] * 1000.0,
                    elements: ElementSet::from_array(values),
                }
            })
            .collect();

        let step_years = match samples.as_slice() {
            [first, second, ..] => second.time_years - first.time_years,
            _ => 0.0,
        };
        Self::new(samples, step_years)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[OrbitalSample] {
        &self.samples
    }

    pub fn step_years(&self) -> f64 {
        self.step_years
    }

    pub fn first_time(&self) -> f64 {
        self.samples[0].time_years
    }

    pub fn last_time(&self) -> f64 {
        self.samples[self.samples.len() - 1].time_years
    }

    /// `(min, max)` of the covered time span.
    pub fn bounds(&self) -> (f64, f64) {
        let (a, b) = (self.first_time(), self.last_time());
        (a.min(b), a.max(b))
    }

    pub fn contains(&self, time_years: f64) -> bool {
        let (lower, upper) = self.bounds();
        time_years >= lower && time_years <= upper
    }

    pub fn time(&self, index: usize) -> f64 {
        self.samples[index].time_years
    }

    pub fn elements(&self, index: usize) -> &ElementSet {
        &self.samples[index].elements
    }

    /// Column-major export in the layout accepted by [`OrbitalSeries::from_table`].
    pub fn to_table(&self) -> Vec<Vec<f64>> {
        let mut columns = vec![Vec::with_capacity(self.len()); TABLE_COLUMNS];
        for sample in &self.samples {
            columns[0].push(sample.time_years / 1000.0);
            for (column, value) in columns[1..].iter_mut().zip(sample.elements.to_array()) {
                column.push(value);
            }
        }
        columns
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

    fn descending_samples(len: usize) -> Vec<OrbitalSample> {
        (0..len)
            .map(|i| OrbitalSample {
                time_years: -1000.0 * i as f64,
                elements: ElementSet {
                    k: 0.01,
                    h: 0.002 * i as f64,
                    ..ElementSet::default()
                },
            })
            .collect()
    }

    #[test]
    fn five_sample_series_is_rejected() {
        assert_err_contains(
            OrbitalSeries::new(descending_samples(5), -1000.0),
            "at least 8 are required",
        );
    }

    #[test]
    fn rejects_non_monotonic_time() {
        let mut samples = descending_samples(10);
        samples[6].time_years = samples[4].time_years;
        let err = OrbitalSeries::new(samples, -1000.0).expect_err("non-monotonic");
        assert_eq!(err, PrecessionError::NonMonotonicTime { index: 6 });
    }

    #[test]
    fn rejects_non_finite_values() {
        let mut samples = descending_samples(10);
        samples[3].elements.dq = f64::NAN;
        assert_err_contains(OrbitalSeries::new(samples, -1000.0), "sample 3");
    }

    #[test]
    fn rejects_step_against_time_direction() {
        assert_err_contains(
            OrbitalSeries::new(descending_samples(10), 1000.0),
            "direction",
        );
    }

    #[test]
    fn bounds_cover_descending_series() {
        let series = OrbitalSeries::new(descending_samples(10), -1000.0).expect("series");
        assert_eq!(series.bounds(), (-9000.0, 0.0));
        assert!(series.contains(-4500.0));
        assert!(!series.contains(10.0));
        assert!(!series.contains(-9000.5));
    }

    #[test]
    fn table_import_converts_kyr_to_years() {
        let series = OrbitalSeries::new(descending_samples(12), -1000.0).expect("series");
        let table = series.to_table();
        assert_eq!(table.len(), TABLE_COLUMNS);
        assert_eq!(table[0][2], -2.0);

        let imported = OrbitalSeries::from_table(&table).expect("import");
        assert_eq!(imported.step_years(), -1000.0);
        assert_eq!(imported.time(3), -3000.0);
        assert_eq!(imported.elements(5), series.elements(5));
    }

    #[test]
    fn table_import_checks_shape() {
        let table = vec![vec![0.0; 10]; 5];
        assert_err_contains(OrbitalSeries::from_table(&table), "must have 9 columns");

        let mut table = vec![vec![0.0; 10]; TABLE_COLUMNS];
        table[4].pop();
        let err = OrbitalSeries::from_table(&table).expect_err("ragged");
        assert_eq!(
            err,
            PrecessionError::ColumnLengthMismatch {
                column: 4,
                expected: 10,
                actual: 9
            }
        );
    }
}
