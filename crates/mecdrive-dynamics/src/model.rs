//! Acceleration solver: the centerpiece of the dynamics model.
//!
//! Assembles the effective inertia seen at the chassis (rigid body plus
//! wheel/roller inertia reflected through the coupling matrix into the
//! world frame), the Coriolis-like coupling from the rotating frame, and
//! the generalized force from the torque model, then solves a 3×3 linear
//! system for world-frame acceleration:
//!
//! ```text
//! H = M_r + Rot·Rᵀ·M_w·R·Rotᵀ
//! K = Rot·Rᵀ·M_w·R·RotDotᵀ
//! F_a = Rot·Rᵀ·τ_net
//! H·a = F_a − K·v
//! ```
//!
//! The system is solved by LU decomposition rather than inverting H. H is
//! well-conditioned for physically valid masses; a singular H or a
//! non-finite result is surfaced as [`DynamicsError`] so optimizers can
//! tell a broken simulation apart from a valid large loss.

use nalgebra::{SVector, Vector3};
use thiserror::Error;

use mecdrive_core::geometry::CouplingMatrix;
use mecdrive_core::rotation::{rotation_matrix, rotation_matrix_derivative};
use mecdrive_core::types::RobotState;

use crate::params::DriveParameters;
use crate::torque::net_torque;

/// Numerical failures of the acceleration solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DynamicsError {
    #[error("effective inertia matrix is singular")]
    SingularInertia,

    #[error("acceleration is not finite")]
    NonFinite,
}

/// World-frame acceleration `[ax, ay, α]` for the given state and
/// parameters.
///
/// Pure function of its inputs; no side effects.
///
/// # Errors
///
/// [`DynamicsError::SingularInertia`] when the effective inertia cannot be
/// solved (physically invalid masses), [`DynamicsError::NonFinite`] when
/// the inputs produce a NaN or infinite result.
pub fn acceleration(
    r: &CouplingMatrix,
    params: &DriveParameters,
    state: &RobotState,
) -> Result<Vector3<f64>, DynamicsError> {
    let rot = rotation_matrix(state.angle());
    let rot_dot = rotation_matrix_derivative(state.angle(), state.vangle());

    // World velocity → robot frame → wheel/roller contact space.
    let robot_frame_velocity = rot.transpose() * state.velocity;
    let wheel_roller_velocity = r.contact_velocities(&robot_frame_velocity);

    let tau = net_torque(
        &wheel_roller_velocity,
        &state.command,
        params.battery_voltage(),
        params.motor_constant(),
        params.armature_resistance(),
        params.dynamic_friction(),
        params.friction_steepness(),
    );

    // Wheel/roller inertia reflected to the robot frame: Rᵀ·M_w·R (3×3).
    let reflected = r.matrix().transpose() * params.wheel_roller_inertia() * r.matrix();

    // Rotation is orthogonal, so Rot⁻¹ = Rotᵀ.
    let h = params.robot_inertia() + rot * reflected * rot.transpose();
    let k = rot * reflected * rot_dot.transpose();
    let f_a = rot * r.matrix().transpose() * tau;

    let rhs = f_a - k * state.velocity;
    let accel = h.lu().solve(&rhs).ok_or(DynamicsError::SingularInertia)?;
    if !accel.iter().all(|a| a.is_finite()) {
        return Err(DynamicsError::NonFinite);
    }
    Ok(accel)
}

/// First-order ODE right-hand side `[velocity; acceleration]` for external
/// integrators.
///
/// # Errors
///
/// Propagates [`acceleration`] failures.
pub fn continuous_dynamics(
    r: &CouplingMatrix,
    params: &DriveParameters,
    state: &RobotState,
) -> Result<SVector<f64, 6>, DynamicsError> {
    let accel = acceleration(r, params, state)?;
    let mut rhs = SVector::<f64, 6>::zeros();
    rhs.fixed_rows_mut::<3>(0).copy_from(&state.velocity);
    rhs.fixed_rows_mut::<3>(3).copy_from(&accel);
    Ok(rhs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
