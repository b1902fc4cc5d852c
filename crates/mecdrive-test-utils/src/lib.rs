//! Synthetic telemetry builders for integration tests.
//!
//! [`synthetic_series`] integrates the dynamics model itself and records
//! the result as a [`DataSeries`], producing a recording whose "measured"
//! columns exactly equal the simulator's own Euler-integrated output for
//! the generating parameters. Against those parameters the objective is
//! exactly zero, which anchors the round-trip consistency tests.

use nalgebra::Vector3;

use mecdrive_core::geometry::{CouplingMatrix, RobotGeometry};
use mecdrive_core::rotation::rotation_matrix;
use mecdrive_core::types::{RobotCommand, RobotState};
use mecdrive_dynamics::model::{acceleration, DynamicsError};
use mecdrive_dynamics::params::DriveParameters;
use mecdrive_sim::series::{DataSeries, RawDataSeries};

/// Coupling matrix for the default chassis geometry.
///
/// # Panics
///
/// The default geometry is valid; construction cannot fail.
#[must_use]
pub fn default_coupling() -> CouplingMatrix {
    CouplingMatrix::from_geometry(&RobotGeometry::default())
        .expect("default geometry is non-degenerate")
}

/// The nominal fitted parameters of the reference robot.
#[must_use]
pub fn nominal_parameters() -> DriveParameters {
    DriveParameters::default()
}

/// Generate a synthetic recording by integrating the model from rest at
/// the origin.
///
/// The command for step `i` comes from `command_at(i)`; battery voltage is
/// constant. Starting from rest makes the robot and world frames coincide
/// on the first row, so the simulator's seeding reproduces this trajectory
/// bit-for-bit.
///
/// # Errors
///
/// Propagates acceleration-solve failures for degenerate parameters.
pub fn synthetic_series(
    r: &CouplingMatrix,
    params: &DriveParameters,
    len: usize,
    dt: f64,
    voltage: f64,
    mut command_at: impl FnMut(usize) -> RobotCommand,
) -> Result<DataSeries, DynamicsError> {
    let params = params.with_battery_voltage(voltage);

    let mut position = vec![Vector3::zeros(); len];
    let mut velocity = vec![Vector3::zeros(); len];
    let commands: Vec<RobotCommand> = (0..len).map(&mut command_at).collect();

    for i in 1..len {
        let state = RobotState::new(commands[i - 1], position[i - 1], velocity[i - 1]);
        let accel = acceleration(r, &params, &state)?;
        position[i] = position[i - 1] + velocity[i - 1] * dt;
        velocity[i] = velocity[i - 1] + accel * dt;
    }

    // Report velocities in the robot frame, matching the capture pipeline.
    let velocity_robot: Vec<Vector3<f64>> = position
        .iter()
        .zip(&velocity)
        .map(|(pose, v)| rotation_matrix(pose[2]).transpose() * v)
        .collect();

    let series = DataSeries::from_columns(RawDataSeries {
        name: "synthetic".into(),
        time: (0..len).map(|i| i as f64 * dt).collect(),
        x_position: position.iter().map(|p| p[0]).collect(),
        y_position: position.iter().map(|p| p[1]).collect(),
        angle: position.iter().map(|p| p[2]).collect(),
        x_velocity: velocity_robot.iter().map(|v| v[0]).collect(),
        y_velocity: velocity_robot.iter().map(|v| v[1]).collect(),
        angular_velocity: velocity_robot.iter().map(|v| v[2]).collect(),
        fl: commands.iter().map(RobotCommand::fl).collect(),
        fr: commands.iter().map(RobotCommand::fr).collect(),
        bl: commands.iter().map(RobotCommand::bl).collect(),
        br: commands.iter().map(RobotCommand::br).collect(),
        battery_voltage: vec![voltage; len],
    })
    .expect("generated columns have equal length");

    Ok(series)
}

/// A command closure holding every motor at the same power.
#[must_use]
pub fn constant_command(power: f64) -> impl FnMut(usize) -> RobotCommand {
    move |_| RobotCommand::new(power, power, power, power)
}

/// A command closure alternating forward and spin phases, exercising both
/// translational and rotational dynamics.
#[must_use]
pub fn mixed_command(phase_len: usize) -> impl FnMut(usize) -> RobotCommand {
    move |i| {
        if (i / phase_len) % 2 == 0 {
            RobotCommand::new(0.6, 0.6, 0.6, 0.6)
        } else {
            RobotCommand::new(0.4, -0.4, 0.4, -0.4)
        }
    }
}
