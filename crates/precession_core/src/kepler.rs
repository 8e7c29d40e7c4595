//! Classical Keplerian elements and their Cartesian state vectors.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

use crate::error::{PrecessionError, Result};

/// Heliocentric gravitational parameter (m³/s²).
pub const GM_SUN: f64 = 1.32712440018e20;

/// Astronomical unit (m).
pub const ASTRONOMICAL_UNIT: f64 = 1.495_978_707_00e11;

const KEPLER_TOLERANCE: f64 = 1e-15;
const KEPLER_MAX_ITERATIONS: usize = 64;

/// Orbit described by classical elements. Angles in radians, semi-major
/// axis in the same length unit as the state vectors it converts to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeplerianElements {
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    pub longitude_of_node: f64,
    pub argument_of_periapsis: f64,
    pub mean_anomaly: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianState {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

/// Solves `E - e sin E = M` for the eccentric anomaly by Newton iteration.
pub fn eccentric_anomaly(mean_anomaly: f64, eccentricity: f64) -> Result<f64> {
    let mut anomaly = mean_anomaly + eccentricity * mean_anomaly.sin();
    for _ in 0..KEPLER_MAX_ITERATIONS {
        let residual = anomaly - eccentricity * anomaly.sin() - mean_anomaly;
        let slope = 1.0 - eccentricity * anomaly.cos();
        let delta = residual / slope;
        anomaly -= delta;
        if !anomaly.is_finite() {
            break;
        }
        if delta.abs() <= KEPLER_TOLERANCE * anomaly.abs().max(1.0) {
            return Ok(anomaly);
        }
    }
    Err(PrecessionError::KeplerNonConvergence {
        iterations: KEPLER_MAX_ITERATIONS,
        mean_anomaly,
        eccentricity,
    })
}

impl KeplerianElements {
    pub fn true_anomaly(&self) -> Result<f64> {
        let e = self.eccentricity;
        let anomaly = eccentric_anomaly(self.mean_anomaly, e)?;
        Ok(2.0 * ((1.0 + e).sqrt() * (anomaly / 2.0).sin())
            .atan2((1.0 - e).sqrt() * (anomaly / 2.0).cos()))
    }

    /// Longitude of periapsis `ϖ = Ω + ω`.
    pub fn longitude_of_periapsis(&self) -> f64 {
        self.longitude_of_node + self.argument_of_periapsis
    }

    /// Position and velocity for gravitational parameter `mu`.
    pub fn to_cartesian(&self, mu: f64) -> Result<CartesianState> {
        let a = self.semi_major_axis;
        let e = self.eccentricity;
        let anomaly = eccentric_anomaly(self.mean_anomaly, e)?;
        let nu = self.true_anomaly()?;
        let rc = a * (1.0 - e * anomaly.cos());
        let speed = (mu * a).sqrt() / rc;

        let ox = rc * nu.cos();
        let oy = rc * nu.sin();
        let odx = -speed * anomaly.sin();
        let ody = speed * (1.0 - e * e).sqrt() * anomaly.cos();

        let (sw, cw) = self.argument_of_periapsis.sin_cos();
        let (so, co) = self.longitude_of_node.sin_cos();
        let (si, ci) = self.inclination.sin_cos();

        let to_inertial = |u: f64, v: f64| {
            Vector3::new(
                u * (cw * co - sw * ci * so) - v * (sw * co + cw * ci * so),
                u * (cw * so + sw * ci * co) + v * (-sw * so + cw * ci * co),
                u * (sw * si) + v * (cw * si),
            )
        };

        Ok(CartesianState {
            position: to_inertial(ox, oy),
            velocity: to_inertial(odx, ody),
        })
    }
}

impl CartesianState {
    /// Osculating elements for gravitational parameter `mu`.
    ///
    /// Angles come back in `[0, 2π)` except the mean anomaly, which follows
    /// the eccentric anomaly in `(-π, π]`. An equatorial orbit measures its
    /// periapsis from the x axis; a circular one puts it at the node.
    pub fn to_keplerian(&self, mu: f64) -> KeplerianElements {
        let pos = self.position;
        let vel = self.velocity;
        let momentum = pos.cross(&vel);
        let pole = momentum.normalize();
        let r = pos.norm();
        let v = vel.norm();

        let eccentricity_vector = vel.cross(&momentum) / mu - pos / r;
        let e = eccentricity_vector.norm();

        let node = Vector3::new(-momentum.y, momentum.x, 0.0);
        let node = if node.norm() > 0.0 { node } else { Vector3::x() };
        let periapsis = if e > 0.0 { eccentricity_vector } else { node };

        let inclination = momentum.xy().norm().atan2(momentum.z);
        let longitude_of_node = node.y.atan2(node.x).rem_euclid(TAU);
        let argument_of_periapsis = signed_angle(&node, &periapsis, &pole).rem_euclid(TAU);
        let nu = signed_angle(&periapsis, &pos, &pole);

        let anomaly = ((1.0 - e * e).sqrt() * nu.sin()).atan2(e + nu.cos());

        KeplerianElements {
            semi_major_axis: 1.0 / (2.0 / r - v * v / mu),
            eccentricity: e,
            inclination,
            longitude_of_node,
            argument_of_periapsis,
            mean_anomaly: anomaly - e * anomaly.sin(),
        }
    }
}

/// Angle from `from` to `to` about `axis`, in `(-π, π]`.
fn signed_angle(from: &Vector3<f64>, to: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    from.cross(to).dot(axis).atan2(from.dot(to))
}

/// Wraps an angle into `(-π, π]`.
pub fn wrap_pi(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}
