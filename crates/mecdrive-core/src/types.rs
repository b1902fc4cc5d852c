//! Plain value records exchanged between the simulator and the dynamics
//! model.
//!
//! All types here are immutable value types passed by copy. Flat-array
//! round-trips (`to_array`/`from_array`) use stable, order-significant
//! layouts for interop with external optimizers that operate on flat
//! numeric vectors.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::ParameterError;

// ---------------------------------------------------------------------------
// RobotCommand
// ---------------------------------------------------------------------------

/// Commanded motor powers in fl/fr/bl/br order.
///
/// Each power is nominally constrained to `[-1, 1]`. The constraint is not
/// enforced here: callers validate before constructing a command.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RobotCommand {
    powers: [f64; 4],
}

impl RobotCommand {
    pub const NUM_PARAMETERS: usize = 4;

    /// Command from per-motor powers.
    #[must_use]
    pub const fn new(fl: f64, fr: f64, bl: f64, br: f64) -> Self {
        Self {
            powers: [fl, fr, bl, br],
        }
    }

    /// All four motors at zero power.
    #[must_use]
    pub const fn zero() -> Self {
        Self { powers: [0.0; 4] }
    }

    /// Front-left motor power.
    #[must_use]
    pub const fn fl(&self) -> f64 {
        self.powers[0]
    }

    /// Front-right motor power.
    #[must_use]
    pub const fn fr(&self) -> f64 {
        self.powers[1]
    }

    /// Back-left motor power.
    #[must_use]
    pub const fn bl(&self) -> f64 {
        self.powers[2]
    }

    /// Back-right motor power.
    #[must_use]
    pub const fn br(&self) -> f64 {
        self.powers[3]
    }

    /// All four powers in fl/fr/bl/br order.
    #[must_use]
    pub const fn powers(&self) -> &[f64; 4] {
        &self.powers
    }

    /// Whether every power lies inside the nominal `[-1, 1]` range.
    #[must_use]
    pub fn is_within_limits(&self) -> bool {
        self.powers.iter().all(|p| (-1.0..=1.0).contains(p))
    }

    #[must_use]
    pub const fn to_array(&self) -> [f64; 4] {
        self.powers
    }

    #[must_use]
    pub const fn from_array(powers: [f64; 4]) -> Self {
        Self { powers }
    }
}

// ---------------------------------------------------------------------------
// RobotState
// ---------------------------------------------------------------------------

/// One instant of robot motion.
///
/// `position` is world-frame `[x, y, ψ]` (meters, meters, radians) and
/// `velocity` is world-frame `[vx, vy, ω]`. `command` is the motor command
/// applied at this instant, i.e. the one producing the *next* acceleration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    pub command: RobotCommand,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl RobotState {
    pub const NUM_PARAMETERS: usize = 10;

    #[must_use]
    pub const fn new(command: RobotCommand, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self {
            command,
            position,
            velocity,
        }
    }

    /// Robot at rest at the world origin with zero command.
    #[must_use]
    pub fn at_rest() -> Self {
        Self {
            command: RobotCommand::zero(),
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
        }
    }

    #[must_use]
    pub fn x(&self) -> f64 {
        self.position[0]
    }

    #[must_use]
    pub fn y(&self) -> f64 {
        self.position[1]
    }

    /// World-frame heading (rad).
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.position[2]
    }

    #[must_use]
    pub fn vx(&self) -> f64 {
        self.velocity[0]
    }

    #[must_use]
    pub fn vy(&self) -> f64 {
        self.velocity[1]
    }

    /// World-frame angular velocity (rad/s).
    #[must_use]
    pub fn vangle(&self) -> f64 {
        self.velocity[2]
    }

    /// Flat layout: `[powers(4), position(3), velocity(3)]`.
    #[must_use]
    pub fn to_array(&self) -> [f64; Self::NUM_PARAMETERS] {
        let p = self.command.to_array();
        [
            p[0],
            p[1],
            p[2],
            p[3],
            self.position[0],
            self.position[1],
            self.position[2],
            self.velocity[0],
            self.velocity[1],
            self.velocity[2],
        ]
    }

    #[must_use]
    pub fn from_array(array: [f64; Self::NUM_PARAMETERS]) -> Self {
        Self {
            command: RobotCommand::from_array([array[0], array[1], array[2], array[3]]),
            position: Vector3::new(array[4], array[5], array[6]),
            velocity: Vector3::new(array[7], array[8], array[9]),
        }
    }
}

// ---------------------------------------------------------------------------
// RobotStateTarget
// ---------------------------------------------------------------------------

/// Desired pose and velocity, used only as an optimization target.
///
/// Zero velocity is the typical target at a waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotStateTarget {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl RobotStateTarget {
    pub const NUM_PARAMETERS: usize = 6;

    #[must_use]
    pub const fn new(position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self { position, velocity }
    }

    /// Target pose with zero desired velocity.
    #[must_use]
    pub fn stationary(position: Vector3<f64>) -> Self {
        Self {
            position,
            velocity: Vector3::zeros(),
        }
    }

    /// Flat layout: `[position(3), velocity(3)]`.
    #[must_use]
    pub fn to_array(&self) -> [f64; Self::NUM_PARAMETERS] {
        [
            self.position[0],
            self.position[1],
            self.position[2],
            self.velocity[0],
            self.velocity[1],
            self.velocity[2],
        ]
    }

    #[must_use]
    pub fn from_array(array: [f64; Self::NUM_PARAMETERS]) -> Self {
        Self {
            position: Vector3::new(array[0], array[1], array[2]),
            velocity: Vector3::new(array[3], array[4], array[5]),
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectiveWeights
// ---------------------------------------------------------------------------

/// Per-channel weights combining squared errors into one scalar objective.
///
/// Layout: 4 motor-power penalty weights, 3 position-error weights,
/// 3 velocity-error weights.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub motor: [f64; 4],
    pub position: [f64; 3],
    pub velocity: [f64; 3],
}

impl ObjectiveWeights {
    pub const NUM_PARAMETERS: usize = 10;

    #[must_use]
    pub const fn new(motor: [f64; 4], position: [f64; 3], velocity: [f64; 3]) -> Self {
        Self {
            motor,
            position,
            velocity,
        }
    }

    /// Weighted sum of squared motor powers and squared pose/velocity error
    /// against `target`.
    #[must_use]
    pub fn evaluate(&self, state: &RobotState, target: &RobotStateTarget) -> f64 {
        let motor: f64 = self
            .motor
            .iter()
            .zip(state.command.powers())
            .map(|(w, p)| w * p * p)
            .sum();

        let position_error = target.position - state.position;
        let velocity_error = target.velocity - state.velocity;
        let position: f64 = (0..3)
            .map(|i| self.position[i] * position_error[i] * position_error[i])
            .sum();
        let velocity: f64 = (0..3)
            .map(|i| self.velocity[i] * velocity_error[i] * velocity_error[i])
            .sum();

        motor + position + velocity
    }

    /// Flat layout: `[motor(4), position(3), velocity(3)]`.
    #[must_use]
    pub fn to_array(&self) -> [f64; Self::NUM_PARAMETERS] {
        [
            self.motor[0],
            self.motor[1],
            self.motor[2],
            self.motor[3],
            self.position[0],
            self.position[1],
            self.position[2],
            self.velocity[0],
            self.velocity[1],
            self.velocity[2],
        ]
    }

    #[must_use]
    pub fn from_array(array: [f64; Self::NUM_PARAMETERS]) -> Self {
        Self {
            motor: [array[0], array[1], array[2], array[3]],
            position: [array[4], array[5], array[6]],
            velocity: [array[7], array[8], array[9]],
        }
    }

    /// Parse from an arbitrary slice, rejecting wrong lengths.
    pub fn from_slice(values: &[f64]) -> Result<Self, ParameterError> {
        if values.len() != Self::NUM_PARAMETERS {
            return Err(ParameterError::ArrayLength {
                expected: Self::NUM_PARAMETERS,
                got: values.len(),
            });
        }
        let mut array = [0.0; Self::NUM_PARAMETERS];
        array.copy_from_slice(values);
        Ok(Self::from_array(array))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn command_accessors_match_order() {
        let cmd = RobotCommand::new(0.1, 0.2, 0.3, 0.4);
        assert_eq!(cmd.fl(), 0.1);
        assert_eq!(cmd.fr(), 0.2);
        assert_eq!(cmd.bl(), 0.3);
        assert_eq!(cmd.br(), 0.4);
    }

    #[test]
    fn command_limit_check() {
        assert!(RobotCommand::new(1.0, -1.0, 0.0, 0.5).is_within_limits());
        assert!(!RobotCommand::new(1.1, 0.0, 0.0, 0.0).is_within_limits());
    }

    #[test]
    fn state_array_round_trip() {
        let state = RobotState::new(
            RobotCommand::new(0.1, -0.2, 0.3, -0.4),
            Vector3::new(1.0, 2.0, 0.5),
            Vector3::new(-0.3, 0.7, 1.1),
        );
        assert_eq!(RobotState::from_array(state.to_array()), state);
    }

    #[test]
    fn target_array_round_trip() {
        let target = RobotStateTarget::new(Vector3::new(1.0, -2.0, 0.3), Vector3::new(0.1, 0.2, -0.3));
        assert_eq!(RobotStateTarget::from_array(target.to_array()), target);
    }

    #[test]
    fn weights_array_round_trip() {
        let weights = ObjectiveWeights::new([1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0], [8.0, 9.0, 10.0]);
        assert_eq!(ObjectiveWeights::from_array(weights.to_array()), weights);
        assert_eq!(
            ObjectiveWeights::from_slice(&weights.to_array()).unwrap(),
            weights
        );
    }

    #[test]
    fn weights_from_short_slice_fails() {
        let err = ObjectiveWeights::from_slice(&[1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            ParameterError::ArrayLength {
                expected: 10,
                got: 2
            }
        );
    }

    #[test]
    fn objective_at_target_with_zero_command_is_zero() {
        let weights = ObjectiveWeights::new([1.0; 4], [1.0; 3], [1.0; 3]);
        let target = RobotStateTarget::stationary(Vector3::new(2.0, 3.0, 0.1));
        let state = RobotState::new(RobotCommand::zero(), target.position, Vector3::zeros());
        assert_relative_eq!(weights.evaluate(&state, &target), 0.0);
    }

    #[test]
    fn objective_weighs_each_channel() {
        let weights = ObjectiveWeights::new([0.0; 4], [2.0, 0.0, 0.0], [0.0, 0.0, 3.0]);
        let target = RobotStateTarget::stationary(Vector3::zeros());
        let state = RobotState::new(
            RobotCommand::new(1.0, 1.0, 1.0, 1.0), // motor weights are zero
            Vector3::new(0.5, 9.0, 0.0),           // only x is weighted
            Vector3::new(0.0, 9.0, 2.0),           // only ω is weighted
        );
        // 2·0.5² + 3·2² = 0.5 + 12
        assert_relative_eq!(weights.evaluate(&state, &target), 12.5);
    }
}
