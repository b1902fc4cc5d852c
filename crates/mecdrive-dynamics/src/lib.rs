//! Continuous-time dynamics of a four-wheel mecanum drivetrain.
//!
//! Given the robot's current pose, velocity, commanded motor powers, and
//! battery voltage, compute the resulting world-frame acceleration,
//! accounting for DC-motor electrical behavior, smooth wheel/roller
//! friction, and the kinematic coupling of the mecanum geometry.
//!
//! # Pipeline
//!
//! ```text
//! RobotState → rotation → wheel/roller velocities → net torque
//!            → effective inertia H, coupling K → solve H·a = F_a − K·v
//! ```
//!
//! # Quick Start
//!
//! ```
//! use mecdrive_core::prelude::*;
//! use mecdrive_dynamics::prelude::*;
//!
//! let geometry = RobotGeometry::default();
//! let r = CouplingMatrix::from_geometry(&geometry).unwrap();
//! let params = DriveParameters::default();
//!
//! let accel = acceleration(&r, &params, &RobotState::at_rest()).unwrap();
//! assert!(accel.norm() < 1e-12);
//! ```

pub mod model;
pub mod params;
pub mod torque;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::model::{acceleration, continuous_dynamics, DynamicsError};
    pub use crate::params::{DriveParameters, RawDriveParameters, NUM_PARAMETERS, PARAM_NAMES};
    pub use crate::torque::{net_torque, smooth_sign, DEFAULT_FRICTION_STEEPNESS};
}
