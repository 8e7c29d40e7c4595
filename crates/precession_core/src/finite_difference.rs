//! Arbitrary-order finite-difference derivatives of uniformly sampled series.
//!
//! Stencil weights come from the closed form of the m-th derivative of the
//! Lagrange basis on `n = m + O` equally spaced nodes: each weight is an
//! elementary symmetric product ("sigma") of node offsets divided by
//! factorials and `h^m`. A single central row is reused for every interior
//! position, so applying the operator is linear in the series length.

use crate::error::{PrecessionError, Result};

/// Largest supported `m + O`. Beyond this the off-centre weights lose all
/// significance in double precision.
pub const MAX_STENCIL_NODES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiniteDifference {
    derivative_order: usize,
    accuracy_order: usize,
}

impl FiniteDifference {
    pub fn new(derivative_order: usize, accuracy_order: usize) -> Result<Self> {
        if derivative_order == 0 {
            return Err(PrecessionError::InvalidStencil(
                "derivative order must be at least 1".to_string(),
            ));
        }
        if accuracy_order == 0 {
            return Err(PrecessionError::InvalidStencil(
                "accuracy order must be at least 1".to_string(),
            ));
        }
        if derivative_order + accuracy_order > MAX_STENCIL_NODES {
            return Err(PrecessionError::InvalidStencil(format!(
                "derivative order {} plus accuracy order {} exceeds {} nodes",
                derivative_order, accuracy_order, MAX_STENCIL_NODES
            )));
        }
        Ok(Self {
            derivative_order,
            accuracy_order,
        })
    }

    pub fn derivative_order(&self) -> usize {
        self.derivative_order
    }

    pub fn accuracy_order(&self) -> usize {
        self.accuracy_order
    }

    /// Number of nodes of the base stencil (`m + O`).
    pub fn nodes(&self) -> usize {
        self.derivative_order + self.accuracy_order
    }

    /// Even derivatives with an odd accuracy order need one extra node so the
    /// biased rows keep the accuracy of the central one.
    fn is_widened(&self) -> bool {
        self.derivative_order % 2 == 0 && self.accuracy_order % 2 != 0
    }

    /// Width of the assembled stencil.
    pub fn stencil_width(&self) -> usize {
        if self.is_widened() {
            self.nodes() + 1
        } else {
            self.nodes()
        }
    }

    /// Minimum series length accepted by [`FiniteDifference::differentiate`].
    pub fn required_samples(&self) -> usize {
        self.stencil_width().max(self.nodes() + 1)
    }

    /// Length of the derivative series produced for `len` input samples.
    pub fn output_len(&self, len: usize) -> usize {
        len.saturating_sub(self.nodes())
    }

    /// Square `n × n` weight matrix; row `i` differentiates at node `i`.
    pub fn coefficients(&self, h: f64) -> Vec<Vec<f64>> {
        let m = self.derivative_order;
        let n = self.nodes();
        let degree = n - m - 1;
        let scale = factorial(m) / h.powi(m as i32);

        let mut result = vec![vec![0.0; n]; n];
        let mut offsets = Vec::with_capacity(n - 1);
        for i in 0..n {
            for l in 0..n {
                offsets.clear();
                offsets.extend(
                    (0..n)
                        .filter(|&r| r != l)
                        .map(|r| r as f64 - i as f64),
                );
                let sigma = elementary_symmetric(&offsets, degree);
                // (-1)^(l - m - 1) with 1-based l
                let sign = if (l + 1 + m + 1) % 2 == 0 { 1.0 } else { -1.0 };
                let denom = factorial(l) * factorial(n - 1 - l);
                result[i][l] = sign * sigma * scale / denom;
            }
        }
        result
    }

    /// Assembled `width × width` stencil; row `r` differentiates at position
    /// `r` of a window of `width` consecutive samples.
    pub fn stencil_rows(&self, h: f64) -> Vec<Vec<f64>> {
        let c = self.coefficients(h);
        if !self.is_widened() {
            return c;
        }

        let width = self.stencil_width();
        let mid = width / 2;
        let mut rows = Vec::with_capacity(width);
        for r in 0..width {
            let mut row = Vec::with_capacity(width);
            if r < mid {
                row.extend_from_slice(&c[r]);
                row.push(0.0);
            } else {
                row.push(0.0);
                row.extend_from_slice(&c[r - 1]);
            }
            rows.push(row);
        }
        rows
    }

    fn central_row_index(&self) -> usize {
        let width = self.stencil_width();
        if width % 2 == 0 {
            width / 2 - 1
        } else {
            (width + 1) / 2 - 1
        }
    }

    /// Differentiates `f` sampled with signed spacing `h`.
    ///
    /// The start of the series is reflection padded with `2 f[0] - f[n - t]`;
    /// the result has [`FiniteDifference::output_len`] values aligned with
    /// the leading samples of `f`.
    pub fn differentiate(&self, f: &[f64], h: f64) -> Result<Vec<f64>> {
        let len = f.len();
        let required = self.required_samples();
        if len < required {
            return Err(PrecessionError::InsufficientSamples { len, required });
        }
        if !h.is_finite() || h == 0.0 {
            return Err(PrecessionError::InvalidStencil(format!(
                "sample spacing must be finite and non-zero, got {}",
                h
            )));
        }

        let n = self.nodes();
        let width = self.stencil_width();
        let centre = self.central_row_index();
        let rows = self.stencil_rows(h);

        let mut padded = Vec::with_capacity(len);
        padded.extend((0..n).map(|t| 2.0 * f[0] - f[n - t]));
        padded.extend_from_slice(&f[..len - n]);

        let mut result = vec![0.0; len];

        // forward
        for r in 0..centre {
            result[r] = dot(&rows[r], &padded[..width]);
        }

        // central
        let central = &rows[centre];
        for i in 0..=(len - width) {
            result[i + centre] = dot(central, &padded[i..i + width]);
        }

        // backward
        let tail = &padded[len - width..];
        for r in (centre + 1)..width {
            result[len - width + r] = dot(&rows[r], tail);
        }

        Ok(result.split_off(n))
    }
}

fn dot(weights: &[f64], values: &[f64]) -> f64 {
    weights.iter().zip(values).map(|(w, v)| w * v).sum()
}

/// Elementary symmetric polynomial of the given degree.
fn elementary_symmetric(values: &[f64], degree: usize) -> f64 {
    let mut sums = vec![0.0; degree + 1];
    sums[0] = 1.0;
    for (count, &v) in values.iter().enumerate() {
        let top = (count + 1).min(degree);
        for j in (1..=top).rev() {
            sums[j] += sums[j - 1] * v;
        }
    }
    sums[degree]
}

fn factorial(n: usize) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}
