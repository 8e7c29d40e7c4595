//! Raw astronomical solution tables and their conversion into an
//! [`OrbitalSeries`].

use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PrecessionError, Result};
use crate::finite_difference::FiniteDifference;
use crate::frames::{EquinoctialElements, ReferenceFrame};
use crate::series::{ElementSet, OrbitalSample, OrbitalSeries, MIN_SERIES_LEN};

/// Extra table span kept on both sides of the integration window (kyr).
pub const WINDOW_MARGIN_KYR: f64 = 200.0;

/// Accuracy order of the element-rate stencil.
pub const RATE_ACCURACY_ORDER: usize = 20;

/// Published orbital solutions with a known table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AstroSolution {
    La1993,
    La2010a,
    La2010b,
    La2010c,
    La2010d,
    ZB2017e,
    ZB2018a,
}

impl AstroSolution {
    pub const ALL: [AstroSolution; 7] = [
        AstroSolution::La1993,
        AstroSolution::La2010a,
        AstroSolution::La2010b,
        AstroSolution::La2010c,
        AstroSolution::La2010d,
        AstroSolution::ZB2017e,
        AstroSolution::ZB2018a,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AstroSolution::La1993 => "La1993",
            AstroSolution::La2010a => "La2010a",
            AstroSolution::La2010b => "La2010b",
            AstroSolution::La2010c => "La2010c",
            AstroSolution::La2010d => "La2010d",
            AstroSolution::ZB2017e => "ZB2017e",
            AstroSolution::ZB2018a => "ZB2018a",
        }
    }

    /// Leading columns read from each line: `t, k, h, q, p` for La1993,
    /// `t, a, l, k, h, q, p` otherwise.
    pub fn columns(self) -> usize {
        match self {
            AstroSolution::La1993 => 5,
            _ => 7,
        }
    }

    /// Plane the tabulated elements refer to, if it is not the ecliptic
    /// and equinox of J2000.
    pub fn frame(self) -> Option<ReferenceFrame> {
        match self {
            AstroSolution::La1993 => None,
            AstroSolution::La2010a
            | AstroSolution::La2010b
            | AstroSolution::La2010c
            | AstroSolution::La2010d => Some(ReferenceFrame::invariable_plane()),
            AstroSolution::ZB2017e | AstroSolution::ZB2018a => Some(ReferenceFrame::solar_plane()),
        }
    }
}

impl fmt::Display for AstroSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AstroSolution {
    type Err = PrecessionError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        AstroSolution::ALL
            .into_iter()
            .find(|solution| solution.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                PrecessionError::InvalidSettings(format!(
                    "unknown astronomical solution '{}'; expected one of {}",
                    trimmed,
                    AstroSolution::ALL.map(AstroSolution::name).join(", ")
                ))
            })
    }
}

/// One parsed table line.
///
/// La1993 does not tabulate `a` and `l`; they are left at 1 AU and 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub time_kyr: f64,
    pub elements: EquinoctialElements,
}

/// Parses a whitespace-separated solution table.
///
/// Fortran `D` exponents are accepted. Blank lines are skipped and columns
/// beyond the solution's layout are ignored.
pub fn parse_element_table(text: &str, solution: AstroSolution) -> Result<Vec<ElementRecord>> {
    let columns = solution.columns();
    let mut records = Vec::new();
    let mut values = Vec::with_capacity(columns);

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        values.clear();
        for token in line.split_whitespace().take(columns) {
            let value = parse_number(token).ok_or_else(|| PrecessionError::MalformedRecord {
                line: line_no,
                reason: format!("'{}' is not a number", token),
            })?;
            values.push(value);
        }
        if values.len() < columns {
            return Err(PrecessionError::MalformedRecord {
                line: line_no,
                reason: format!(
                    "{} expects {} columns, found {}",
                    solution,
                    columns,
                    values.len()
                ),
            });
        }

        let elements = match solution {
            AstroSolution::La1993 => EquinoctialElements {
                semi_major_axis: 1.0,
                mean_longitude: 0.0,
                k: values[1],
                h: values[2],
                q: values[3],
                p: values[4],
            },
            _ => EquinoctialElements {
                semi_major_axis: values[1],
                mean_longitude: values[2],
                k: values[3],
                h: values[4],
                q: values[5],
                p: values[6],
            },
        };
        records.push(ElementRecord {
            time_kyr: values[0],
            elements,
        });
    }
    Ok(records)
}

fn parse_number(token: &str) -> Option<f64> {
    let value = if token.contains(['D', 'd']) {
        token.replace(['D', 'd'], "E").parse::<f64>()
    } else {
        token.parse::<f64>()
    };
    value.ok()
}

/// Turns parsed records into the series the integrator consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalSeriesBuilder {
    solution: AstroSolution,
    start_myr: f64,
    end_myr: f64,
    margin_kyr: f64,
}

impl OrbitalSeriesBuilder {
    /// Keeps the whole table until a window is set.
    pub fn new(solution: AstroSolution) -> Self {
        Self {
            solution,
            start_myr: f64::NEG_INFINITY,
            end_myr: f64::INFINITY,
            margin_kyr: WINDOW_MARGIN_KYR,
        }
    }

    /// Restricts the series to `[start, end]` Myr plus the margin.
    pub fn window(mut self, start_myr: f64, end_myr: f64) -> Self {
        self.start_myr = start_myr.min(end_myr);
        self.end_myr = start_myr.max(end_myr);
        self
    }

    pub fn margin_kyr(mut self, margin_kyr: f64) -> Self {
        self.margin_kyr = margin_kyr.abs();
        self
    }

    pub fn solution(&self) -> AstroSolution {
        self.solution
    }

    pub fn build(&self, records: &[ElementRecord]) -> Result<OrbitalSeries> {
        let lower = self.start_myr * 1000.0 - self.margin_kyr;
        let upper = self.end_myr * 1000.0 + self.margin_kyr;
        let kept: Vec<&ElementRecord> = records
            .iter()
            .filter(|record| record.time_kyr >= lower && record.time_kyr <= upper)
            .collect();
        if kept.len() < MIN_SERIES_LEN {
            return Err(PrecessionError::SeriesTooShort {
                len: kept.len(),
                required: MIN_SERIES_LEN,
            });
        }

        let spacing_kyr = kept[1].time_kyr - kept[0].time_kyr;
        for (index, pair) in kept.windows(2).enumerate() {
            let actual = pair[1].time_kyr - pair[0].time_kyr;
            if (actual - spacing_kyr).abs() > 1e-9 * spacing_kyr.abs() {
                return Err(PrecessionError::NonUniformSpacing {
                    index: index + 1,
                    expected: spacing_kyr,
                    actual,
                });
            }
        }

        let aligned = match self.solution.frame() {
            Some(frame) => kept
                .iter()
                .map(|record| frame.rotate(&record.elements))
                .collect::<Result<Vec<_>>>()?,
            None => kept.iter().map(|record| record.elements).collect(),
        };

        let step_years = spacing_kyr * 1000.0;
        let stencil = FiniteDifference::new(1, RATE_ACCURACY_ORDER)?;
        let expected = stencil.output_len(aligned.len());
        let column = |name: &'static str,
                      select: fn(&EquinoctialElements) -> f64|
         -> Result<Vec<f64>> {
            let values: Vec<f64> = aligned.iter().map(select).collect();
            let rates = stencil.differentiate(&values, step_years)?;
            if rates.len() != expected {
                return Err(PrecessionError::DerivativeLengthMismatch {
                    column: name,
                    expected,
                    actual: rates.len(),
                });
            }
            Ok(rates)
        };
        let dk = column("k", |e: &EquinoctialElements| e.k)?;
        let dh = column("h", |e: &EquinoctialElements| e.h)?;
        let dq = column("q", |e: &EquinoctialElements| e.q)?;
        let dp = column("p", |e: &EquinoctialElements| e.p)?;

        let samples = (0..expected)
            .map(|i| OrbitalSample {
                time_years: kept[i].time_kyr * 1000.0,
                elements: ElementSet {
                    k: aligned[i].k,
                    h: aligned[i].h,
                    q: aligned[i].q,
                    p: aligned[i].p,
                    dk: dk[i],
                    dh: dh[i],
                    dq: dq[i],
                    dp: dp[i],
                },
            })
            .collect();

        info!(
            "{} table: kept {} of {} rows, {} samples after differentiation",
            self.solution,
            kept.len(),
            records.len(),
            expected
        );
        OrbitalSeries::new(samples, step_years)
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

    fn la93_text(rows: usize) -> String {
        (0..rows)
            .map(|i| {
                let t = -(i as f64);
                format!(
                    "{:.1} {:.12} {:.12} 0.0 0.0\n",
                    t,
                    0.01 + 2.0e-5 * t,
                    0.02 - 1.0e-5 * t
                )
            })
            .collect()
    }

    #[test]
    fn parses_fortran_exponents_and_skips_blank_lines() {
        let text = "  0.0  0.1D-01 -0.2d-1 0.5E-2 1.0e-3 99\n\n -1.0 1 2 3 4\n";
        let records = parse_element_table(text, AstroSolution::La1993).expect("parse");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].time_kyr, 0.0);
        assert!((records[0].elements.k - 0.01).abs() < 1e-15);
        assert!((records[0].elements.h + 0.02).abs() < 1e-15);
        assert!((records[0].elements.p - 0.001).abs() < 1e-15);
        assert_eq!(records[1].time_kyr, -1.0);
        assert_eq!(records[1].elements.q, 3.0);
    }

    #[test]
    fn seven_column_layout_reads_axis_and_longitude() {
        let text = "-2.0 1.00000102 4.5 0.016 -0.003 0.0001 0.00002\n";
        let records = parse_element_table(text, AstroSolution::ZB2018a).expect("parse");
        let elements = records[0].elements;
        assert_eq!(elements.semi_major_axis, 1.00000102);
        assert_eq!(elements.mean_longitude, 4.5);
        assert_eq!(elements.k, 0.016);
        assert_eq!(elements.p, 0.00002);
    }

    #[test]
    fn malformed_lines_name_the_line() {
        let short = "0.0 0.1 0.2 0.3 0.4\n\n-1.0 0.1 0.2\n";
        assert_err_contains(
            parse_element_table(short, AstroSolution::La1993),
            "line 3: La1993 expects 5 columns, found 3",
        );
        let garbage = "0.0 0.1 x 0.3 0.4\n";
        assert_err_contains(
            parse_element_table(garbage, AstroSolution::La1993),
            "line 1: 'x' is not a number",
        );
    }

    #[test]
    fn solution_names_round_trip() {
        for solution in AstroSolution::ALL {
            assert_eq!(solution.name().parse::<AstroSolution>(), Ok(solution));
        }
        assert_eq!("la2010b".parse::<AstroSolution>(), Ok(AstroSolution::La2010b));
        assert_err_contains("La2004".parse::<AstroSolution>(), "unknown astronomical solution");
        assert_eq!(AstroSolution::La1993.columns(), 5);
        assert!(AstroSolution::La1993.frame().is_none());
        assert_eq!(
            AstroSolution::ZB2017e.frame(),
            Some(ReferenceFrame::solar_plane())
        );
    }

    #[test]
    fn builder_windows_and_differentiates() {
        let records = parse_element_table(&la93_text(401), AstroSolution::La1993).expect("parse");
        let series = OrbitalSeriesBuilder::new(AstroSolution::La1993)
            .window(-0.05, 0.0)
            .build(&records)
            .expect("series");

        // [-250, 200] kyr keeps 251 rows; the stencil drops 21
        assert_eq!(series.len(), 230);
        assert_eq!(series.step_years(), -1000.0);
        assert_eq!(series.first_time(), 0.0);
        assert_eq!(series.last_time(), -229_000.0);
        for i in [0, 1, 100, 229] {
            let elements = series.elements(i);
            assert!((elements.dk - 2.0e-8).abs() < 1e-14, "dk at {i}");
            assert!((elements.dh + 1.0e-8).abs() < 1e-14, "dh at {i}");
            assert_eq!(elements.dq, 0.0);
        }
    }

    #[test]
    fn builder_rejects_gaps() {
        let mut records =
            parse_element_table(&la93_text(40), AstroSolution::La1993).expect("parse");
        records.remove(10);
        let err = OrbitalSeriesBuilder::new(AstroSolution::La1993)
            .build(&records)
            .expect_err("gap");
        assert!(matches!(
            err,
            PrecessionError::NonUniformSpacing { index: 10, .. }
        ));
    }

    #[test]
    fn builder_needs_enough_rows_for_the_stencil() {
        let records = parse_element_table(&la93_text(15), AstroSolution::La1993).expect("parse");
        assert_err_contains(
            OrbitalSeriesBuilder::new(AstroSolution::La1993).build(&records),
            "needs 22 samples",
        );
        assert_err_contains(
            OrbitalSeriesBuilder::new(AstroSolution::La1993)
                .window(-10.0, -9.0)
                .build(&records),
            "at least 8 are required",
        );
    }

    #[test]
    fn invariable_plane_tables_are_rotated_to_the_ecliptic() {
        let text: String = (0..40)
            .map(|i| format!("{}.0 1.0 {} 0.0167 0.0 0.0 0.0\n", -i, 1.0 + 0.01 * i as f64))
            .collect();
        let records = parse_element_table(&text, AstroSolution::La2010a).expect("parse");
        let series = OrbitalSeriesBuilder::new(AstroSolution::La2010a)
            .build(&records)
            .expect("series");
        let tilt = (ReferenceFrame::invariable_plane().inclination / 2.0).sin();
        for i in 0..series.len() {
            let elements = series.elements(i);
            assert!((elements.eccentricity() - 0.0167).abs() < 1e-10);
            // orbit in the invariable plane appears tilted by that plane's inclination
            assert!((elements.q.hypot(elements.p) - tilt).abs() < 1e-10);
            assert!(elements.dq.abs() < 1e-13 && elements.dp.abs() < 1e-13);
        }
    }
}
