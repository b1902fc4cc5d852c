//! Robot chassis geometry and the kinematic coupling matrix.
//!
//! The coupling matrix R is a fixed 8×3 linear map from robot-frame body
//! velocity `[vx, vy, ω]` to the wheel/roller contact space:
//!
//! ```text
//! rows 0–3: wheel angular velocity (rad/s), one row per wheel
//!           [ sin θi / (r sin θi),  -cos θi / (r sin θi),  (-di sin θi - si cos θi) / (r sin θi) ]
//! rows 4–7: roller contact-point tangential velocity (m/s)
//!           [ 0,  1 / sin θi,  si / sin θi ]
//! ```
//!
//! where `r` is the wheel radius, `θi` the roller angle of wheel i, and
//! `si`/`di` the signed forward/sideways axle offsets. R depends only on
//! geometry: it is built once at startup and passed by reference to every
//! consumer, never rebuilt per call.

use nalgebra::{SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// 8×3 matrix over the wheel/roller contact space.
pub type Matrix8x3 = SMatrix<f64, 8, 3>;

/// 8-vector over the wheel/roller contact space (wheels first, rollers last).
pub type Vector8 = SVector<f64, 8>;

/// Wheel order used throughout the workspace: front-left, front-right,
/// back-left, back-right.
pub const NUM_WHEELS: usize = 4;

// ---------------------------------------------------------------------------
// RobotGeometry
// ---------------------------------------------------------------------------

/// Physical constants of the chassis. Not tunable: these are measured off
/// the robot, not fitted from telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotGeometry {
    /// Forward half-axle distance from chassis center to each axle (m).
    pub forward_axis: f64,
    /// Sideways half-axle distance from chassis center to each wheel (m).
    pub sideways_axis: f64,
    /// Wheel radius (m).
    pub wheel_radius: f64,
    /// Roller contact angle per wheel (rad), in fl/fr/bl/br order.
    pub roller_angles: [f64; NUM_WHEELS],
}

impl Default for RobotGeometry {
    /// Measured constants of the reference robot: standard mecanum layout
    /// with ±45° rollers in an X pattern.
    fn default() -> Self {
        use std::f64::consts::FRAC_PI_4;
        Self {
            forward_axis: 0.115,
            sideways_axis: 0.1325,
            wheel_radius: 0.048,
            roller_angles: [FRAC_PI_4, -FRAC_PI_4, -FRAC_PI_4, FRAC_PI_4],
        }
    }
}

impl RobotGeometry {
    /// Signed forward offsets per wheel: positive for the front axle.
    #[must_use]
    pub fn forward_offsets(&self) -> [f64; NUM_WHEELS] {
        let s = self.forward_axis;
        [s, s, -s, -s]
    }

    /// Signed sideways offsets per wheel: positive for the left side.
    #[must_use]
    pub fn sideways_offsets(&self) -> [f64; NUM_WHEELS] {
        let d = self.sideways_axis;
        [d, -d, d, -d]
    }
}

// ---------------------------------------------------------------------------
// CouplingMatrix
// ---------------------------------------------------------------------------

/// The fixed 8×3 kinematic coupling matrix R.
///
/// Multiplying by a robot-frame velocity yields the 8-vector of wheel
/// angular velocities (rows 0–3) and roller contact-point velocities
/// (rows 4–7).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CouplingMatrix {
    matrix: Matrix8x3,
}

impl CouplingMatrix {
    /// Build R from chassis geometry.
    ///
    /// # Errors
    ///
    /// Every row divides by `sin θi`, so a roller angle of 0 or π is a hard
    /// precondition violation and returns
    /// [`GeometryError::DegenerateRollerAngle`] rather than producing an
    /// unbounded matrix.
    pub fn from_geometry(geometry: &RobotGeometry) -> Result<Self, GeometryError> {
        if !geometry.wheel_radius.is_finite() {
            return Err(GeometryError::NonFinite {
                field: "wheel_radius",
                value: geometry.wheel_radius,
            });
        }
        if geometry.wheel_radius <= 0.0 {
            return Err(GeometryError::NonPositive {
                field: "wheel_radius",
                value: geometry.wheel_radius,
            });
        }
        if !geometry.forward_axis.is_finite() {
            return Err(GeometryError::NonFinite {
                field: "forward_axis",
                value: geometry.forward_axis,
            });
        }
        if !geometry.sideways_axis.is_finite() {
            return Err(GeometryError::NonFinite {
                field: "sideways_axis",
                value: geometry.sideways_axis,
            });
        }

        let s = geometry.forward_offsets();
        let d = geometry.sideways_offsets();
        let r = geometry.wheel_radius;

        let mut matrix = Matrix8x3::zeros();
        for i in 0..NUM_WHEELS {
            let theta = geometry.roller_angles[i];
            // NaN fails no comparison, so it must be caught before the
            // sin-magnitude check below.
            if !theta.is_finite() {
                return Err(GeometryError::NonFinite {
                    field: "roller_angle",
                    value: theta,
                });
            }
            let (sin_t, cos_t) = theta.sin_cos();
            if sin_t.abs() < 1e-9 {
                return Err(GeometryError::DegenerateRollerAngle {
                    wheel: i,
                    angle: theta,
                });
            }

            // Wheel angular velocity row.
            let denom = r * sin_t;
            matrix[(i, 0)] = sin_t / denom;
            matrix[(i, 1)] = -cos_t / denom;
            matrix[(i, 2)] = (-d[i] * sin_t - s[i] * cos_t) / denom;

            // Roller contact-point velocity row.
            matrix[(NUM_WHEELS + i, 0)] = 0.0;
            matrix[(NUM_WHEELS + i, 1)] = 1.0 / sin_t;
            matrix[(NUM_WHEELS + i, 2)] = s[i] / sin_t;
        }

        Ok(Self { matrix })
    }

    /// The underlying 8×3 matrix.
    #[must_use]
    pub const fn matrix(&self) -> &Matrix8x3 {
        &self.matrix
    }

    /// Map a robot-frame velocity `[vx, vy, ω]` into wheel/roller space.
    #[must_use]
    pub fn contact_velocities(&self, robot_frame_velocity: &Vector3<f64>) -> Vector8 {
        self.matrix * robot_frame_velocity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
