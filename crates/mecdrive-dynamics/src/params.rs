//! Fitted physical parameters of the drivetrain.
//!
//! [`DriveParameters`] holds the 15 tunable scalars of the model plus
//! derived matrices that the acceleration solver consumes on every step:
//! the 3×3 diagonal rigid-body inertia `M_r`, the 8×8 diagonal wheel/roller
//! inertia `M_w`, and the 8-vector of per-channel friction coefficients.
//!
//! The struct is immutable after construction. Every `with_*` method
//! consumes the value and rebuilds the derived state, so the raw scalars
//! and the cached matrices can never disagree.
//!
//! The flat 15-element array layout (`to_array`/`from_array`) is a stable,
//! order-significant serialization used by external optimizers that work
//! on numeric vectors; [`PARAM_NAMES`] is the parallel name table.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use mecdrive_core::error::ParameterError;
use mecdrive_core::geometry::Vector8;

use crate::torque::DEFAULT_FRICTION_STEEPNESS;

/// Number of scalars in the flat parameter vector.
pub const NUM_PARAMETERS: usize = 15;

/// Names of the flat parameter vector entries, index-aligned with
/// [`DriveParameters::to_array`].
pub const PARAM_NAMES: [&str; NUM_PARAMETERS] = [
    "motor_constant",
    "armature_resistance",
    "robot_mass",
    "robot_moment",
    "wheel_moment",
    "roller_moment",
    "fl_wheel_friction",
    "fr_wheel_friction",
    "bl_wheel_friction",
    "br_wheel_friction",
    "fl_roller_friction",
    "fr_roller_friction",
    "bl_roller_friction",
    "br_roller_friction",
    "battery_voltage",
];

/// 8×8 diagonal wheel/roller inertia matrix type.
pub type Matrix8 = nalgebra::SMatrix<f64, 8, 8>;

// ---------------------------------------------------------------------------
// RawDriveParameters
// ---------------------------------------------------------------------------

/// Raw scalar form of [`DriveParameters`], used for (de)serialization.
///
/// Derived matrices are never serialized; they are rebuilt on conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDriveParameters {
    pub motor_constant: f64,
    pub armature_resistance: f64,
    pub robot_mass: f64,
    pub robot_moment: f64,
    pub wheel_moment: f64,
    pub roller_moment: f64,
    pub fl_wheel_friction: f64,
    pub fr_wheel_friction: f64,
    pub bl_wheel_friction: f64,
    pub br_wheel_friction: f64,
    pub fl_roller_friction: f64,
    pub fr_roller_friction: f64,
    pub bl_roller_friction: f64,
    pub br_roller_friction: f64,
    pub battery_voltage: f64,
    #[serde(default = "default_friction_steepness")]
    pub friction_steepness: f64,
}

const fn default_friction_steepness() -> f64 {
    DEFAULT_FRICTION_STEEPNESS
}

impl Default for RawDriveParameters {
    /// Nominal fitted values for the reference robot.
    fn default() -> Self {
        Self {
            motor_constant: 0.3,
            armature_resistance: 1.8,
            robot_mass: 13.35,
            robot_moment: 1.19,
            wheel_moment: 0.04,
            roller_moment: 0.002,
            fl_wheel_friction: 0.256,
            fr_wheel_friction: 0.256,
            bl_wheel_friction: 0.256,
            br_wheel_friction: 0.256,
            fl_roller_friction: 20.8,
            fr_roller_friction: 20.8,
            bl_roller_friction: 20.8,
            br_roller_friction: 20.8,
            battery_voltage: 12.0,
            friction_steepness: DEFAULT_FRICTION_STEEPNESS,
        }
    }
}

// ---------------------------------------------------------------------------
// DriveParameters
// ---------------------------------------------------------------------------

/// Tunable physical model of the drivetrain with cached derived matrices.
///
/// Construction is the only mutation point: `with_*` methods consume the
/// value and rebuild the derived state, so shared references can never
/// observe stale matrices. Each parameter-fitting task builds its own
/// instance — derived state is owned exclusively, never shared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDriveParameters", into = "RawDriveParameters")]
pub struct DriveParameters {
    raw: RawDriveParameters,
    m_r: Matrix3<f64>,
    m_w: Matrix8,
    dynamic_friction: Vector8,
}

impl Default for DriveParameters {
    fn default() -> Self {
        Self::new(RawDriveParameters::default())
    }
}

impl From<RawDriveParameters> for DriveParameters {
    fn from(raw: RawDriveParameters) -> Self {
        Self::new(raw)
    }
}

impl From<DriveParameters> for RawDriveParameters {
    fn from(params: DriveParameters) -> Self {
        params.raw
    }
}

impl DriveParameters {
    /// Build from raw scalars, computing the derived matrices.
    #[must_use]
    pub fn new(raw: RawDriveParameters) -> Self {
        let mut params = Self {
            raw,
            m_r: Matrix3::zeros(),
            m_w: Matrix8::zeros(),
            dynamic_friction: Vector8::zeros(),
        };
        params.rebuild();
        params
    }

    /// Recompute every derived field from the raw scalars. Called at every
    /// construction/`with_*` point; never exposed for in-place use.
    fn rebuild(&mut self) {
        let r = &self.raw;
        self.m_r = Matrix3::from_diagonal(&nalgebra::Vector3::new(
            r.robot_mass,
            r.robot_mass,
            r.robot_moment,
        ));
        self.m_w = Matrix8::from_diagonal(&Vector8::from_column_slice(&[
            r.wheel_moment,
            r.wheel_moment,
            r.wheel_moment,
            r.wheel_moment,
            r.roller_moment,
            r.roller_moment,
            r.roller_moment,
            r.roller_moment,
        ]));
        self.dynamic_friction = Vector8::from_column_slice(&[
            r.fl_wheel_friction,
            r.fr_wheel_friction,
            r.bl_wheel_friction,
            r.br_wheel_friction,
            r.fl_roller_friction,
            r.fr_roller_friction,
            r.bl_roller_friction,
            r.br_roller_friction,
        ]);
    }

    // -- raw scalar access --------------------------------------------------

    #[must_use]
    pub const fn raw(&self) -> &RawDriveParameters {
        &self.raw
    }

    #[must_use]
    pub const fn motor_constant(&self) -> f64 {
        self.raw.motor_constant
    }

    #[must_use]
    pub const fn armature_resistance(&self) -> f64 {
        self.raw.armature_resistance
    }

    #[must_use]
    pub const fn robot_mass(&self) -> f64 {
        self.raw.robot_mass
    }

    #[must_use]
    pub const fn robot_moment(&self) -> f64 {
        self.raw.robot_moment
    }

    #[must_use]
    pub const fn wheel_moment(&self) -> f64 {
        self.raw.wheel_moment
    }

    #[must_use]
    pub const fn roller_moment(&self) -> f64 {
        self.raw.roller_moment
    }

    #[must_use]
    pub const fn battery_voltage(&self) -> f64 {
        self.raw.battery_voltage
    }

    #[must_use]
    pub const fn friction_steepness(&self) -> f64 {
        self.raw.friction_steepness
    }

    // -- derived state ------------------------------------------------------

    /// 3×3 diagonal rigid-body mass/inertia matrix `diag(m, m, I)`.
    #[must_use]
    pub const fn robot_inertia(&self) -> &Matrix3<f64> {
        &self.m_r
    }

    /// 8×8 diagonal wheel/roller inertia matrix.
    #[must_use]
    pub const fn wheel_roller_inertia(&self) -> &Matrix8 {
        &self.m_w
    }

    /// Per-channel dynamic friction coefficients (wheels 0–3, rollers 4–7).
    #[must_use]
    pub const fn dynamic_friction(&self) -> &Vector8 {
        &self.dynamic_friction
    }

    // -- builders -----------------------------------------------------------

    #[must_use]
    pub fn with_motor_constant(mut self, value: f64) -> Self {
        self.raw.motor_constant = value;
        self.rebuild();
        self
    }

    #[must_use]
    pub fn with_armature_resistance(mut self, value: f64) -> Self {
        self.raw.armature_resistance = value;
        self.rebuild();
        self
    }

    #[must_use]
    pub fn with_robot_mass(mut self, value: f64) -> Self {
        self.raw.robot_mass = value;
        self.rebuild();
        self
    }

    #[must_use]
    pub fn with_robot_moment(mut self, value: f64) -> Self {
        self.raw.robot_moment = value;
        self.rebuild();
        self
    }

    #[must_use]
    pub fn with_wheel_moment(mut self, value: f64) -> Self {
        self.raw.wheel_moment = value;
        self.rebuild();
        self
    }

    #[must_use]
    pub fn with_roller_moment(mut self, value: f64) -> Self {
        self.raw.roller_moment = value;
        self.rebuild();
        self
    }

    /// Battery voltage is a measured input in practice; this stores the
    /// last-applied value. Derived matrices do not depend on it, but the
    /// rebuild is kept for uniformity.
    #[must_use]
    pub fn with_battery_voltage(mut self, value: f64) -> Self {
        self.raw.battery_voltage = value;
        self.rebuild();
        self
    }

    /// Sigmoid steepness of the smooth friction law (not part of the flat
    /// 15-vector).
    #[must_use]
    pub fn with_friction_steepness(mut self, value: f64) -> Self {
        self.raw.friction_steepness = value;
        self.rebuild();
        self
    }

    /// Set all four wheel friction coefficients to one value.
    #[must_use]
    pub fn with_uniform_wheel_friction(mut self, value: f64) -> Self {
        self.raw.fl_wheel_friction = value;
        self.raw.fr_wheel_friction = value;
        self.raw.bl_wheel_friction = value;
        self.raw.br_wheel_friction = value;
        self.rebuild();
        self
    }

    /// Set all four roller friction coefficients to one value.
    #[must_use]
    pub fn with_uniform_roller_friction(mut self, value: f64) -> Self {
        self.raw.fl_roller_friction = value;
        self.raw.fr_roller_friction = value;
        self.raw.bl_roller_friction = value;
        self.raw.br_roller_friction = value;
        self.rebuild();
        self
    }

    // -- uniform-friction accessors ------------------------------------------

    /// Whether wheel and roller frictions are each uniform across wheels.
    #[must_use]
    pub fn is_uniform_friction(&self) -> bool {
        let r = &self.raw;
        r.fl_wheel_friction == r.fr_wheel_friction
            && r.fr_wheel_friction == r.bl_wheel_friction
            && r.bl_wheel_friction == r.br_wheel_friction
            && r.fl_roller_friction == r.fr_roller_friction
            && r.fr_roller_friction == r.bl_roller_friction
            && r.bl_roller_friction == r.br_roller_friction
    }

    /// The single wheel friction coefficient, when uniform.
    ///
    /// # Errors
    ///
    /// [`ParameterError::NonUniformFriction`] when per-wheel values differ.
    pub fn uniform_wheel_friction(&self) -> Result<f64, ParameterError> {
        if self.is_uniform_friction() {
            Ok(self.raw.fl_wheel_friction)
        } else {
            Err(ParameterError::NonUniformFriction)
        }
    }

    /// The single roller friction coefficient, when uniform.
    ///
    /// # Errors
    ///
    /// [`ParameterError::NonUniformFriction`] when per-wheel values differ.
    pub fn uniform_roller_friction(&self) -> Result<f64, ParameterError> {
        if self.is_uniform_friction() {
            Ok(self.raw.fl_roller_friction)
        } else {
            Err(ParameterError::NonUniformFriction)
        }
    }

    // -- flat-vector interop -------------------------------------------------

    /// Stable order-significant serialization, index-aligned with
    /// [`PARAM_NAMES`].
    #[must_use]
    pub const fn to_array(&self) -> [f64; NUM_PARAMETERS] {
        let r = &self.raw;
        [
            r.motor_constant,
            r.armature_resistance,
            r.robot_mass,
            r.robot_moment,
            r.wheel_moment,
            r.roller_moment,
            r.fl_wheel_friction,
            r.fr_wheel_friction,
            r.bl_wheel_friction,
            r.br_wheel_friction,
            r.fl_roller_friction,
            r.fr_roller_friction,
            r.bl_roller_friction,
            r.br_roller_friction,
            r.battery_voltage,
        ]
    }

    /// Rebuild from the flat layout. The friction steepness is not part of
    /// the vector and takes its default.
    #[must_use]
    pub fn from_array(array: [f64; NUM_PARAMETERS]) -> Self {
        Self::new(RawDriveParameters {
            motor_constant: array[0],
            armature_resistance: array[1],
            robot_mass: array[2],
            robot_moment: array[3],
            wheel_moment: array[4],
            roller_moment: array[5],
            fl_wheel_friction: array[6],
            fr_wheel_friction: array[7],
            bl_wheel_friction: array[8],
            br_wheel_friction: array[9],
            fl_roller_friction: array[10],
            fr_roller_friction: array[11],
            bl_roller_friction: array[12],
            br_roller_friction: array[13],
            battery_voltage: array[14],
            friction_steepness: DEFAULT_FRICTION_STEEPNESS,
        })
    }

    /// Parse from an arbitrary slice, rejecting wrong lengths.
    pub fn from_slice(values: &[f64]) -> Result<Self, ParameterError> {
        if values.len() != NUM_PARAMETERS {
            return Err(ParameterError::ArrayLength {
                expected: NUM_PARAMETERS,
                got: values.len(),
            });
        }
        let mut array = [0.0; NUM_PARAMETERS];
        array.copy_from_slice(values);
        Ok(Self::from_array(array))
    }

    /// Read one scalar by flat-vector index.
    ///
    /// # Errors
    ///
    /// [`ParameterError::ArrayLength`] for an out-of-range index.
    pub fn parameter(&self, index: usize) -> Result<f64, ParameterError> {
        self.to_array()
            .get(index)
            .copied()
            .ok_or(ParameterError::ArrayLength {
                expected: NUM_PARAMETERS,
                got: index,
            })
    }

    /// New parameters with one scalar replaced by flat-vector index,
    /// preserving the friction steepness. This is the perturbation
    /// primitive used by finite-difference gradients and search drivers.
    pub fn with_parameter(&self, index: usize, value: f64) -> Result<Self, ParameterError> {
        let mut raw = self.raw;
        match index {
            0 => raw.motor_constant = value,
            1 => raw.armature_resistance = value,
            2 => raw.robot_mass = value,
            3 => raw.robot_moment = value,
            4 => raw.wheel_moment = value,
            5 => raw.roller_moment = value,
            6 => raw.fl_wheel_friction = value,
            7 => raw.fr_wheel_friction = value,
            8 => raw.bl_wheel_friction = value,
            9 => raw.br_wheel_friction = value,
            10 => raw.fl_roller_friction = value,
            11 => raw.fr_roller_friction = value,
            12 => raw.bl_roller_friction = value,
            13 => raw.br_roller_friction = value,
            14 => raw.battery_voltage = value,
            _ => {
                return Err(ParameterError::ArrayLength {
                    expected: NUM_PARAMETERS,
                    got: index,
                })
            }
        }
        Ok(Self::new(raw))
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
    fn derived_matrices_match_raw_scalars() {
        let params = DriveParameters::default();
        let m_r = params.robot_inertia();
        assert_relative_eq!(m_r[(0, 0)], 13.35);
        assert_relative_eq!(m_r[(1, 1)], 13.35);
        assert_relative_eq!(m_r[(2, 2)], 1.19);
        assert_relative_eq!(m_r[(0, 1)], 0.0);

        let m_w = params.wheel_roller_inertia();
        for i in 0..4 {
            assert_relative_eq!(m_w[(i, i)], 0.04);
            assert_relative_eq!(m_w[(4 + i, 4 + i)], 0.002);
        }

        let friction = params.dynamic_friction();
        for i in 0..4 {
            assert_relative_eq!(friction[i], 0.256);
            assert_relative_eq!(friction[4 + i], 20.8);
        }
    }

    #[test]
    fn builders_rebuild_derived_state() {
        let params = DriveParameters::default()
            .with_robot_mass(10.0)
            .with_uniform_roller_friction(5.0);
        assert_relative_eq!(params.robot_inertia()[(0, 0)], 10.0);
        assert_relative_eq!(params.dynamic_friction()[7], 5.0);
    }

    #[test]
    fn array_round_trip_preserves_every_field() {
        let params = DriveParameters::from_array([
            0.31, 1.7, 13.0, 1.2, 0.041, 0.0021, 0.1, 0.2, 0.3, 0.4, 10.0, 11.0, 12.0, 13.0, 12.5,
        ]);
        let round_tripped = DriveParameters::from_array(params.to_array());
        assert_eq!(round_tripped, params);
        assert_eq!(round_tripped.to_array(), params.to_array());
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let err = DriveParameters::from_slice(&[1.0; 14]).unwrap_err();
        assert_eq!(
            err,
            ParameterError::ArrayLength {
                expected: 15,
                got: 14
            }
        );
    }

    #[test]
    fn uniform_friction_accessors() {
        let params = DriveParameters::default();
        assert!(params.is_uniform_friction());
        assert_relative_eq!(params.uniform_wheel_friction().unwrap(), 0.256);
        assert_relative_eq!(params.uniform_roller_friction().unwrap(), 20.8);

        let uneven = params.with_parameter(6, 0.9).unwrap();
        assert!(!uneven.is_uniform_friction());
        assert_eq!(
            uneven.uniform_wheel_friction().unwrap_err(),
            ParameterError::NonUniformFriction
        );
    }

    #[test]
    fn with_parameter_perturbs_one_index() {
        let base = DriveParameters::default();
        let perturbed = base.with_parameter(2, 14.0).unwrap();
        assert_relative_eq!(perturbed.robot_mass(), 14.0);
        assert_relative_eq!(perturbed.robot_inertia()[(0, 0)], 14.0);
        // Every other entry is untouched.
        for (i, (a, b)) in base
            .to_array()
            .iter()
            .zip(perturbed.to_array().iter())
            .enumerate()
        {
            if i != 2 {
                assert_relative_eq!(a, b);
            }
        }
    }

    #[test]
    fn with_parameter_preserves_steepness() {
        let base = DriveParameters::default().with_friction_steepness(7.0);
        let perturbed = base.with_parameter(0, 0.5).unwrap();
        assert_relative_eq!(perturbed.friction_steepness(), 7.0);
    }

    #[test]
    fn with_parameter_rejects_out_of_range_index() {
        let base = DriveParameters::default();
        assert!(base.with_parameter(NUM_PARAMETERS, 1.0).is_err());
    }

    #[test]
    fn param_names_align_with_array() {
        assert_eq!(PARAM_NAMES.len(), NUM_PARAMETERS);
        assert_eq!(PARAM_NAMES[0], "motor_constant");
        assert_eq!(PARAM_NAMES[14], "battery_voltage");
    }

    #[test]
    fn serde_round_trip_skips_derived_state() {
        let params = DriveParameters::default().with_robot_mass(11.0);
        let json = serde_json::to_string(&params).unwrap();
        assert!(!json.contains("m_r"));
        let back: DriveParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
