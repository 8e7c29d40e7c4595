//! Quasi-equinoctial elements and rotations between reference planes.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

use crate::error::Result;
use crate::kepler::{CartesianState, KeplerianElements, ASTRONOMICAL_UNIT, GM_SUN};

/// Element set of a raw solution table: semi-major axis (AU), mean
/// longitude (rad) and the quasi-equinoctial pairs
/// `(k, h) = e·(cos ϖ, sin ϖ)`, `(q, p) = sin(i/2)·(cos Ω, sin Ω)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquinoctialElements {
    pub semi_major_axis: f64,
    pub mean_longitude: f64,
    pub k: f64,
    pub h: f64,
    pub q: f64,
    pub p: f64,
}

impl EquinoctialElements {
    pub fn eccentricity(&self) -> f64 {
        self.k.hypot(self.h)
    }

    pub fn longitude_of_periapsis(&self) -> f64 {
        self.h.atan2(self.k)
    }

    pub fn longitude_of_node(&self) -> f64 {
        self.p.atan2(self.q)
    }

    pub fn inclination(&self) -> f64 {
        2.0 * self.q.hypot(self.p).min(1.0).asin()
    }

    /// Classical elements with the semi-major axis converted to metres.
    pub fn to_keplerian(&self) -> KeplerianElements {
        let varpi = self.longitude_of_periapsis();
        let node = self.longitude_of_node();
        KeplerianElements {
            semi_major_axis: self.semi_major_axis * ASTRONOMICAL_UNIT,
            eccentricity: self.eccentricity(),
            inclination: self.inclination(),
            longitude_of_node: node,
            argument_of_periapsis: varpi - node,
            mean_anomaly: self.mean_longitude - varpi,
        }
    }

    /// Inverse of [`EquinoctialElements::to_keplerian`].
    pub fn from_keplerian(elements: &KeplerianElements) -> Self {
        let node = elements.longitude_of_node.rem_euclid(TAU);
        let varpi = elements.longitude_of_periapsis();
        let half_sin = (elements.inclination / 2.0).sin();
        Self {
            semi_major_axis: elements.semi_major_axis / ASTRONOMICAL_UNIT,
            mean_longitude: (elements.mean_anomaly + varpi).rem_euclid(TAU),
            k: elements.eccentricity * varpi.cos(),
            h: elements.eccentricity * varpi.sin(),
            q: half_sin * node.cos(),
            p: half_sin * node.sin(),
        }
    }
}

/// Orientation of a source plane relative to the target frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFrame {
    /// Ascending node of the source plane at the reference epoch (rad).
    pub node: f64,
    /// Inclination of the source plane (rad).
    pub inclination: f64,
    /// Rotation about the pole back to the target equinox (rad).
    pub reference_angle: f64,
}

impl ReferenceFrame {
    /// Invariable plane of the solar system (INPOP10a orientation).
    pub fn invariable_plane() -> Self {
        Self {
            node: -1.3257524502535283,
            inclination: 0.02755113997947439,
            reference_angle: 107.58237116_f64.to_radians(),
        }
    }

    /// Solar equator.
    pub fn solar_plane() -> Self {
        Self {
            node: (-179.9992488761977_f64).to_radians(),
            inclination: 7.150307688039328_f64.to_radians(),
            reference_angle: 75.594_f64.to_radians(),
        }
    }

    /// Combined rotation from the source plane into the target frame.
    pub fn rotation(&self) -> Matrix3<f64> {
        plane_rotation(-self.reference_angle, 0.0)
            * full_rotation(self.node + PI, -self.inclination, 0.0)
    }

    /// Re-expresses `elements` in the target frame.
    pub fn rotate(&self, elements: &EquinoctialElements) -> Result<EquinoctialElements> {
        let state = elements.to_keplerian().to_cartesian(GM_SUN)?;
        let rotation = self.rotation();
        let rotated = CartesianState {
            position: rotation * state.position,
            velocity: rotation * state.velocity,
        };
        Ok(EquinoctialElements::from_keplerian(
            &rotated.to_keplerian(GM_SUN),
        ))
    }
}

/// Rotation by node angle `omega` about the pole followed by tilt `theta`
/// about the new x axis.
#[rustfmt::skip]
pub fn plane_rotation(omega: f64, theta: f64) -> Matrix3<f64> {
    let (so, co) = omega.sin_cos();
    let (st, ct) = theta.sin_cos();
    Matrix3::new(
        co, so, 0.0,
        -so * ct, co * ct, st,
        so * st, -co * st, ct,
    )
}

/// 3-1-3 Euler rotation `(omega, theta, phi)`.
#[rustfmt::skip]
pub fn full_rotation(omega: f64, theta: f64, phi: f64) -> Matrix3<f64> {
    let (so, co) = omega.sin_cos();
    let (st, ct) = theta.sin_cos();
    let (sp, cp) = phi.sin_cos();
    Matrix3::new(
        cp * co - sp * so * ct, cp * so + sp * ct * co, sp * st,
        -sp * co - cp * so * ct, -sp * so + cp * co * ct, cp * st,
        so * st, -co * st, ct,
    )
}
