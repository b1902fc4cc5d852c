//! Core value types and kinematics for a four-wheel mecanum drivetrain.
//!
//! This crate holds everything that is fixed by the robot itself rather
//! than fitted from data: the chassis geometry, the 8×3 kinematic coupling
//! matrix derived from it, the heading rotation transform, and the plain
//! value records (`RobotCommand`, `RobotState`, ...) passed between the
//! dynamics model and the simulator.
//!
//! # Frames
//!
//! Positions and velocities in [`RobotState`] are world-frame; the coupling
//! matrix operates on robot-frame velocity, so consumers rotate through
//! [`rotation::rotation_matrix`] first.

pub mod error;
pub mod geometry;
pub mod rotation;
pub mod types;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::error::{GeometryError, ParameterError};
    pub use crate::geometry::{CouplingMatrix, RobotGeometry, Matrix8x3, Vector8};
    pub use crate::rotation::{rotation_matrix, rotation_matrix_derivative};
    pub use crate::types::{ObjectiveWeights, RobotCommand, RobotState, RobotStateTarget};
}
