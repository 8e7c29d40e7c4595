//! Windowed interpolation of the orbital series at arbitrary times.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{PrecessionError, Result};
use crate::series::{ElementSet, OrbitalSeries, ELEMENT_COUNT};

/// Samples used per interpolation.
pub const WINDOW_LEN: usize = 8;

const HALF_WINDOW: usize = WINDOW_LEN / 2;

/// Keeps the rational `d` table away from an exact zero.
const TINY: f64 = 1.0e-25;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationScheme {
    /// Polynomial through all window points (Neville).
    #[default]
    Polynomial,
    /// Diagonal rational function (Bulirsch–Stoer). Can meet a pole between
    /// distinct abscissas, e.g. at a symmetric zero crossing.
    Rational,
}

/// Diagonal rational interpolation of `(xa, ya)` at `x`.
pub fn rational<const N: usize>(xa: &[f64; N], ya: &[f64; N], x: f64) -> Result<f64> {
    let mut c = [0.0; N];
    let mut d = [0.0; N];
    let mut ns = 0;
    let mut nearest = (x - xa[0]).abs();

    for i in 0..N {
        let distance = (x - xa[i]).abs();
        if distance == 0.0 {
            return Ok(ya[i]);
        }
        if distance < nearest {
            ns = i;
            nearest = distance;
        }
        c[i] = ya[i];
        d[i] = ya[i] + TINY;
    }

    let mut y = ya[ns];
    for m in 1..N {
        for i in 0..(N - m) {
            if xa[i] == xa[i + m] {
                return Err(PrecessionError::DuplicateAbscissa { abscissa: xa[i] });
            }
            let w = c[i + 1] - d[i];
            let h = xa[i + m] - x;
            let t = (xa[i] - x) * d[i] / h;
            let denom = t - c[i + 1];
            if denom == 0.0 {
                // both differences vanished: the column is exhausted
                if w == 0.0 {
                    d[i] = 0.0;
                    c[i] = 0.0;
                    continue;
                }
                return Err(PrecessionError::InterpolationPole { time: x });
            }
            let dd = w / denom;
            d[i] = c[i + 1] * dd;
            c[i] = t * dd;
        }
        y += next_correction(&c, &d, &mut ns, N - m);
    }
    Ok(y)
}

/// Polynomial interpolation of `(xa, ya)` at `x` (Neville).
pub fn polynomial<const N: usize>(xa: &[f64; N], ya: &[f64; N], x: f64) -> Result<f64> {
    let mut c = *ya;
    let mut d = *ya;
    let mut ns = 0;
    let mut nearest = (x - xa[0]).abs();

    for i in 0..N {
        let distance = (x - xa[i]).abs();
        if distance == 0.0 {
            return Ok(ya[i]);
        }
        if distance < nearest {
            ns = i;
            nearest = distance;
        }
    }

    let mut y = ya[ns];
    for m in 1..N {
        for i in 0..(N - m) {
            let ho = xa[i] - x;
            let hp = xa[i + m] - x;
            let w = c[i + 1] - d[i];
            let den = ho - hp;
            if den == 0.0 {
                return Err(PrecessionError::DuplicateAbscissa { abscissa: xa[i] });
            }
            let den = w / den;
            d[i] = hp * den;
            c[i] = ho * den;
        }
        y += next_correction(&c, &d, &mut ns, N - m);
    }
    Ok(y)
}

/// Picks the tableau path that stays centred on the nearest node.
fn next_correction(c: &[f64], d: &[f64], ns: &mut usize, remaining: usize) -> f64 {
    if 2 * *ns < remaining {
        c[*ns]
    } else {
        *ns -= 1;
        d[*ns]
    }
}

/// Samples all eight element columns of a shared series.
#[derive(Debug, Clone)]
pub struct ElementInterpolator {
    series: Arc<OrbitalSeries>,
    scheme: InterpolationScheme,
}

impl ElementInterpolator {
    pub fn new(series: Arc<OrbitalSeries>, scheme: InterpolationScheme) -> Self {
        Self { series, scheme }
    }

    pub fn series(&self) -> &Arc<OrbitalSeries> {
        &self.series
    }

    pub fn scheme(&self) -> InterpolationScheme {
        self.scheme
    }

    /// First index of the window used for `time`.
    pub fn window_start(&self, time: f64) -> Result<usize> {
        let series = &*self.series;
        if !series.contains(time) || !time.is_finite() {
            let (lower, upper) = series.bounds();
            return Err(PrecessionError::OutOfBounds { time, lower, upper });
        }

        let last = series.len() - 1;
        let first_time = series.first_time();
        let span = series.last_time() - first_time;
        let estimate = (last as f64 * (time - first_time) / span).floor();
        let mut ctrl = (estimate.max(0.0) as usize).min(last);

        // walk to the bracketing node when spacing is uneven
        let direction = span.signum();
        while ctrl < last && (time - series.time(ctrl + 1)) * direction >= 0.0 {
            ctrl += 1;
        }
        while ctrl > 0 && (time - series.time(ctrl)) * direction < 0.0 {
            ctrl -= 1;
        }

        let mut start = ctrl.saturating_sub(HALF_WINDOW);
        if start + WINDOW_LEN - 1 > last {
            start = last + 1 - WINDOW_LEN;
        }
        Ok(start)
    }

    /// Interpolated elements and rates at `time`.
    pub fn sample(&self, time: f64) -> Result<ElementSet> {
        let start = self.window_start(time)?;
        let series = &*self.series;

        let mut xa = [0.0; WINDOW_LEN];
        let mut rows = [[0.0; ELEMENT_COUNT]; WINDOW_LEN];
        for j in 0..WINDOW_LEN {
            xa[j] = series.time(start + j);
            rows[j] = series.elements(start + j).to_array();
        }

        let mut values = [0.0; ELEMENT_COUNT];
        for (component, value) in values.iter_mut().enumerate() {
            let mut ya = [0.0; WINDOW_LEN];
            for j in 0..WINDOW_LEN {
                ya[j] = rows[j][component];
            }
            *value = match self.scheme {
                InterpolationScheme::Rational => rational(&xa, &ya, time)?,
                InterpolationScheme::Polynomial => polynomial(&xa, &ya, time)?,
            };
        }
        Ok(ElementSet::from_array(values))
    }
}
