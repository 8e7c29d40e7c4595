use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Two-component state of the spin axis.
///
/// `x = sin(ε)·cos(ψ)` and `y = sin(ε)·sin(ψ)` where ε is the obliquity and
/// ψ the precession angle. The same type carries the time derivative of the
/// state, so integrator arithmetic stays component-free at the call sites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpinVector {
    pub x: f64,
    pub y: f64,
}

impl SpinVector {
    pub const ZERO: SpinVector = SpinVector { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Builds the state for a given obliquity and precession angle (radians).
    pub fn from_angles(obliquity: f64, precession_angle: f64) -> Self {
        let sin_eps = obliquity.sin();
        Self {
            x: sin_eps * precession_angle.cos(),
            y: sin_eps * precession_angle.sin(),
        }
    }

    pub fn norm_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// `sin(ε)`.
    pub fn norm(self) -> f64 {
        self.norm_squared().sqrt()
    }

    pub fn obliquity(self) -> f64 {
        self.norm().asin()
    }

    pub fn precession_angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Component-wise absolute value.
    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs())
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl From<[f64; 2]> for SpinVector {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl Add for SpinVector {
    type Output = SpinVector;

    fn add(self, rhs: SpinVector) -> SpinVector {
        SpinVector::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for SpinVector {
    fn add_assign(&mut self, rhs: SpinVector) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for SpinVector {
    type Output = SpinVector;

    fn sub(self, rhs: SpinVector) -> SpinVector {
        SpinVector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for SpinVector {
    fn sub_assign(&mut self, rhs: SpinVector) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Neg for SpinVector {
    type Output = SpinVector;

    fn neg(self) -> SpinVector {
        SpinVector::new(-self.x, -self.y)
    }
}

impl Mul<f64> for SpinVector {
    type Output = SpinVector;

    fn mul(self, rhs: f64) -> SpinVector {
        SpinVector::new(self.x * rhs, self.y * rhs)
    }
}

impl Mul<SpinVector> for f64 {
    type Output = SpinVector;

    fn mul(self, rhs: SpinVector) -> SpinVector {
        SpinVector::new(self * rhs.x, self * rhs.y)
    }
}

impl Div<f64> for SpinVector {
    type Output = SpinVector;

    fn div(self, rhs: f64) -> SpinVector {
        SpinVector::new(self.x / rhs, self.y / rhs)
    }
}
