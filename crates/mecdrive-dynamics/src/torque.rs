//! Electromechanical torque model: DC-motor back-EMF plus smooth friction.
//!
//! # Physics
//!
//! Applied torque per powered wheel (armature circuit):
//! `T = (V·power − ω·k_t) / R_a`
//!
//! Friction per wheel/roller channel, opposing that channel's own velocity:
//! `T_f = (2 / (1 + exp(−k·v)) − 1) · c`
//!
//! The sigmoid is a smooth stand-in for `sign(v)·c` Coulomb friction. It is
//! odd, saturates at ±c, and is differentiable everywhere, which
//! gradient-based parameter fitting requires. Rollers are unpowered: their
//! applied torque is exactly zero and only friction acts on them.

use nalgebra::Vector4;

use mecdrive_core::geometry::Vector8;
use mecdrive_core::types::RobotCommand;

/// Default steepness `k` of the sigmoid friction law.
///
/// Inherited from the recorded-data fits; kept configurable on
/// [`DriveParameters`](crate::params::DriveParameters) rather than
/// hard-coded.
pub const DEFAULT_FRICTION_STEEPNESS: f64 = 10.0;

/// Smooth odd approximation of `sign(velocity)`.
///
/// `2 / (1 + exp(−k·v)) − 1`; ranges over (−1, 1) and is exactly zero at
/// `v = 0`.
#[must_use]
pub fn smooth_sign(velocity: f64, steepness: f64) -> f64 {
    2.0 / (1.0 + (-steepness * velocity).exp()) - 1.0
}

/// Armature-circuit torque for the four powered wheels.
///
/// `(voltage·power − ω·motor_constant) / armature_resistance` per wheel:
/// the back-EMF term opposes the applied voltage as the wheel spins up.
#[must_use]
pub fn applied_torque(
    wheel_velocity: &Vector4<f64>,
    command: &RobotCommand,
    voltage: f64,
    motor_constant: f64,
    armature_resistance: f64,
) -> Vector4<f64> {
    let powers = Vector4::from(command.to_array());
    (voltage * powers - wheel_velocity * motor_constant) / armature_resistance
}

/// Net torque over the 8-dimensional wheel/roller space.
///
/// Wheels (channels 0–3) receive applied torque minus friction; rollers
/// (channels 4–7) are friction-only.
#[must_use]
pub fn net_torque(
    wheel_roller_velocity: &Vector8,
    command: &RobotCommand,
    voltage: f64,
    motor_constant: f64,
    armature_resistance: f64,
    dynamic_friction: &Vector8,
    friction_steepness: f64,
) -> Vector8 {
    let wheel_velocity = wheel_roller_velocity.fixed_rows::<4>(0).into_owned();
    let applied = applied_torque(
        &wheel_velocity,
        command,
        voltage,
        motor_constant,
        armature_resistance,
    );

    let mut net = Vector8::zeros();
    for i in 0..8 {
        let drive = if i < 4 { applied[i] } else { 0.0 };
        let friction = smooth_sign(wheel_roller_velocity[i], friction_steepness) * dynamic_friction[i];
        net[i] = drive - friction;
    }
    net
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
