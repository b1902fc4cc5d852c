//! Forward-Euler trajectory integration over a recorded run.
//!
//! At each step the *previous* row's commanded powers and battery voltage
//! drive the dynamics model, then
//! `position += velocity·Δt; velocity += acceleration·Δt`. The integration
//! is seeded from the first *measured* row, anchoring the simulated and
//! measured trajectories at a common start so later divergence reflects
//! model error, not a bad initial condition.
//!
//! Explicit Euler at the recording's raw timestep accumulates error for
//! stiff parameter regions explored during search. That is a known
//! accuracy limitation inherited from the recording pipeline, not guarded
//! against here; a diverging integration is detected and surfaced as
//! [`SimulationError::Diverged`].
//!
//! The recordings start from rest, where the robot frame and world frame
//! velocity coincide, so the measured (robot-frame) first row seeds the
//! world-frame state directly.

use nalgebra::Vector3;
use thiserror::Error;

use mecdrive_core::geometry::CouplingMatrix;
use mecdrive_core::rotation::rotation_matrix;
use mecdrive_core::types::RobotState;
use mecdrive_dynamics::model::{acceleration, DynamicsError};
use mecdrive_dynamics::params::DriveParameters;

use crate::series::DataSeries;

/// Errors from integrating a recorded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("series too short to integrate: {len} rows (need at least 2)")]
    TooShort { len: usize },

    #[error("dynamics error: {0}")]
    Dynamics(#[from] DynamicsError),

    #[error("simulation diverged: non-finite state at step {step}")]
    Diverged { step: usize },
}

// ---------------------------------------------------------------------------
// SimulatedTrajectory
// ---------------------------------------------------------------------------

/// The simulated counterpart of one recorded run.
///
/// All traces have the series' length except `acceleration`, which has one
/// fewer entry (no step is taken after the last row). Raw arrays are
/// exposed for comparison and external plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedTrajectory {
    /// Elapsed time, copied from the recording.
    pub time: Vec<f64>,
    /// Simulated world-frame pose `[x, y, ψ]` per step.
    pub position: Vec<Vector3<f64>>,
    /// Simulated world-frame velocity `[vx, vy, ω]` per step.
    pub velocity_world: Vec<Vector3<f64>>,
    /// Simulated velocity rotated into the robot frame, the frame the
    /// measurements are reported in.
    pub velocity_robot: Vec<Vector3<f64>>,
    /// World-frame acceleration applied at each step.
    pub acceleration: Vec<Vector3<f64>>,
}

impl SimulatedTrajectory {
    /// Sum of squared robot-frame velocity error (x, y, angular) against
    /// the measured columns, over the whole trajectory.
    #[must_use]
    pub fn velocity_loss(&self, series: &DataSeries) -> f64 {
        let (meas_x, meas_y, meas_omega) = series.measured_velocity_columns();
        self.velocity_robot
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let ex = v[0] - meas_x[i];
                let ey = v[1] - meas_y[i];
                let eo = v[2] - meas_omega[i];
                ex * ex + ey * ey + eo * eo
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// simulate
// ---------------------------------------------------------------------------

/// Forward-integrate the dynamics model over a recorded run.
///
/// # Errors
///
/// [`SimulationError::TooShort`] for fewer than two rows (no step to
/// take), [`SimulationError::Dynamics`] when the acceleration solve fails,
/// [`SimulationError::Diverged`] when the integrated state stops being
/// finite.
pub fn simulate(
    r: &CouplingMatrix,
    params: &DriveParameters,
    series: &DataSeries,
) -> Result<SimulatedTrajectory, SimulationError> {
    let n = series.len();
    let Some(dt) = series.dt() else {
        return Err(SimulationError::TooShort { len: n });
    };

    let mut position = Vec::with_capacity(n);
    let mut velocity_world = Vec::with_capacity(n);
    let mut accelerations = Vec::with_capacity(n - 1);

    position.push(series.measured_position(0));
    velocity_world.push(series.measured_velocity(0));

    for i in 1..n {
        // The previous row's command and voltage produced this step's
        // acceleration.
        let step_params = params.with_battery_voltage(series.battery_voltage_at(i - 1));
        let state = RobotState::new(
            series.command_at(i - 1),
            position[i - 1],
            velocity_world[i - 1],
        );

        let accel = acceleration(r, &step_params, &state)?;
        let next_position = position[i - 1] + velocity_world[i - 1] * dt;
        let next_velocity = velocity_world[i - 1] + accel * dt;

        if !(next_position.iter().all(|v| v.is_finite())
            && next_velocity.iter().all(|v| v.is_finite()))
        {
            return Err(SimulationError::Diverged { step: i });
        }

        accelerations.push(accel);
        position.push(next_position);
        velocity_world.push(next_velocity);
    }

    let velocity_robot = position
        .iter()
        .zip(&velocity_world)
        .map(|(pose, v)| rotation_matrix(pose[2]).transpose() * v)
        .collect();

    Ok(SimulatedTrajectory {
        time: series.time().to_vec(),
        position,
        velocity_world,
        velocity_robot,
        acceleration: accelerations,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mecdrive_core::geometry::RobotGeometry;

    use crate::series::{DataSeries, RawDataSeries};

    fn coupling() -> CouplingMatrix {
        CouplingMatrix::from_geometry(&RobotGeometry::default()).unwrap()
    }

    fn resting_series(len: usize) -> DataSeries {
        DataSeries::from_columns(RawDataSeries {
            name: "rest".into(),
            time: (0..len).map(|i| i as f64 * 0.01).collect(),
            x_position: vec![0.0; len],
            y_position: vec![0.0; len],
            angle: vec![0.0; len],
            x_velocity: vec![0.0; len],
            y_velocity: vec![0.0; len],
            angular_velocity: vec![0.0; len],
            fl: vec![0.0; len],
            fr: vec![0.0; len],
            bl: vec![0.0; len],
            br: vec![0.0; len],
            battery_voltage: vec![12.0; len],
        })
        .unwrap()
    }

    #[test]
    fn single_row_series_fails_explicitly() {
        let err = simulate(&coupling(), &DriveParameters::default(), &resting_series(1))
            .unwrap_err();
        assert_eq!(err, SimulationError::TooShort { len: 1 });
    }

    #[test]
    fn resting_robot_stays_at_rest() {
        let series = resting_series(20);
        let trajectory = simulate(&coupling(), &DriveParameters::default(), &series).unwrap();

        assert_eq!(trajectory.position.len(), 20);
        assert_eq!(trajectory.acceleration.len(), 19);
        for v in &trajectory.velocity_world {
            assert_relative_eq!(v.norm(), 0.0, epsilon = 1e-12);
        }
        assert_relative_eq!(trajectory.velocity_loss(&series), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn seeded_from_first_measured_row() {
        let len = 5;
        let mut raw = RawDataSeries {
            name: "seeded".into(),
            time: (0..len).map(|i| i as f64 * 0.01).collect(),
            x_position: vec![1.0; len],
            y_position: vec![-2.0; len],
            angle: vec![0.3; len],
            x_velocity: vec![0.0; len],
            y_velocity: vec![0.0; len],
            angular_velocity: vec![0.0; len],
            fl: vec![0.0; len],
            fr: vec![0.0; len],
            bl: vec![0.0; len],
            br: vec![0.0; len],
            battery_voltage: vec![12.0; len],
        };
        raw.x_position[0] = 1.5;
        let series = DataSeries::from_columns(raw).unwrap();

        let trajectory = simulate(&coupling(), &DriveParameters::default(), &series).unwrap();
        assert_relative_eq!(trajectory.position[0][0], 1.5);
        assert_relative_eq!(trajectory.position[0][1], -2.0);
        assert_relative_eq!(trajectory.position[0][2], 0.3);
    }

    #[test]
    fn powered_series_moves_the_robot() {
        let len = 50;
        let series = DataSeries::from_columns(RawDataSeries {
            name: "forward".into(),
            time: (0..len).map(|i| i as f64 * 0.01).collect(),
            x_position: vec![0.0; len],
            y_position: vec![0.0; len],
            angle: vec![0.0; len],
            x_velocity: vec![0.0; len],
            y_velocity: vec![0.0; len],
            angular_velocity: vec![0.0; len],
            fl: vec![0.5; len],
            fr: vec![0.5; len],
            bl: vec![0.5; len],
            br: vec![0.5; len],
            battery_voltage: vec![12.0; len],
        })
        .unwrap();

        let trajectory = simulate(&coupling(), &DriveParameters::default(), &series).unwrap();
        let last = trajectory.position.last().unwrap();
        assert!(last[0] > 0.01, "expected forward travel, got {last}");
        // Loss is positive: the measured columns claim the robot never moved.
        assert!(trajectory.velocity_loss(&series) > 0.0);
    }

    #[test]
    fn diverged_integration_is_surfaced() {
        // An absurd motor constant with nonzero initial speed drives the
        // velocity to overflow within a few Euler steps.
        let len = 100;
        let mut raw = RawDataSeries {
            name: "stiff".into(),
            time: (0..len).map(|i| i as f64 * 0.01).collect(),
            x_position: vec![0.0; len],
            y_position: vec![0.0; len],
            angle: vec![0.0; len],
            x_velocity: vec![0.0; len],
            y_velocity: vec![0.0; len],
            angular_velocity: vec![0.0; len],
            fl: vec![1.0; len],
            fr: vec![1.0; len],
            bl: vec![1.0; len],
            br: vec![1.0; len],
            battery_voltage: vec![12.0; len],
        };
        raw.x_velocity[0] = 1.0;
        let series = DataSeries::from_columns(raw).unwrap();

        let params = DriveParameters::default()
            .with_motor_constant(1e12)
            .with_robot_mass(1e-6)
            .with_robot_moment(1e-6);
        let result = simulate(&coupling(), &params, &series);
        assert!(
            matches!(
                result,
                Err(SimulationError::Diverged { .. }) | Err(SimulationError::Dynamics(_))
            ),
            "expected an explicit failure, got {result:?}"
        );
    }
}
