//! Recorded telemetry runs.
//!
//! A [`DataSeries`] is one motion-capture/telemetry recording at a uniform
//! timestep: commanded motor powers, battery voltage, and measured pose and
//! velocity per step. Positions are world-frame; measured velocities are
//! robot-frame (the frame the measurements are reported in, and the frame
//! the objective compares in).
//!
//! Columns must all have equal length; construction validates this and no
//! accessor re-checks. Parsing of the original capture format is an
//! external concern — recordings arrive here as JSON column files.

use std::path::Path;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mecdrive_core::types::RobotCommand;

/// Errors from loading or validating a recorded series.
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("recorded series is empty")]
    Empty,

    #[error("column length mismatch: {column} has {got} rows, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// DataSeries
// ---------------------------------------------------------------------------

/// One recorded run, column-oriented. Indexed `0..len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataSeries", into = "RawDataSeries")]
pub struct DataSeries {
    name: String,
    time: Vec<f64>,
    x_position: Vec<f64>,
    y_position: Vec<f64>,
    angle: Vec<f64>,
    x_velocity: Vec<f64>,
    y_velocity: Vec<f64>,
    angular_velocity: Vec<f64>,
    fl: Vec<f64>,
    fr: Vec<f64>,
    bl: Vec<f64>,
    br: Vec<f64>,
    battery_voltage: Vec<f64>,
}

/// Unvalidated column form used for (de)serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataSeries {
    #[serde(default)]
    pub name: String,
    pub time: Vec<f64>,
    pub x_position: Vec<f64>,
    pub y_position: Vec<f64>,
    pub angle: Vec<f64>,
    pub x_velocity: Vec<f64>,
    pub y_velocity: Vec<f64>,
    pub angular_velocity: Vec<f64>,
    pub fl: Vec<f64>,
    pub fr: Vec<f64>,
    pub bl: Vec<f64>,
    pub br: Vec<f64>,
    pub battery_voltage: Vec<f64>,
}

impl TryFrom<RawDataSeries> for DataSeries {
    type Error = SeriesError;

    fn try_from(raw: RawDataSeries) -> Result<Self, Self::Error> {
        Self::from_columns(raw)
    }
}

impl From<DataSeries> for RawDataSeries {
    fn from(series: DataSeries) -> Self {
        Self {
            name: series.name,
            time: series.time,
            x_position: series.x_position,
            y_position: series.y_position,
            angle: series.angle,
            x_velocity: series.x_velocity,
            y_velocity: series.y_velocity,
            angular_velocity: series.angular_velocity,
            fl: series.fl,
            fr: series.fr,
            bl: series.bl,
            br: series.br,
            battery_voltage: series.battery_voltage,
        }
    }
}

impl DataSeries {
    /// Validate column lengths and construct.
    ///
    /// # Errors
    ///
    /// [`SeriesError::Empty`] for zero rows,
    /// [`SeriesError::LengthMismatch`] when any column disagrees with the
    /// time column.
    pub fn from_columns(raw: RawDataSeries) -> Result<Self, SeriesError> {
        let expected = raw.time.len();
        if expected == 0 {
            return Err(SeriesError::Empty);
        }

        let columns: [(&'static str, usize); 11] = [
            ("x_position", raw.x_position.len()),
            ("y_position", raw.y_position.len()),
            ("angle", raw.angle.len()),
            ("x_velocity", raw.x_velocity.len()),
            ("y_velocity", raw.y_velocity.len()),
            ("angular_velocity", raw.angular_velocity.len()),
            ("fl", raw.fl.len()),
            ("fr", raw.fr.len()),
            ("bl", raw.bl.len()),
            ("br", raw.br.len()),
            ("battery_voltage", raw.battery_voltage.len()),
        ];
        for (column, got) in columns {
            if got != expected {
                return Err(SeriesError::LengthMismatch {
                    column,
                    expected,
                    got,
                });
            }
        }

        Ok(Self {
            name: raw.name,
            time: raw.time,
            x_position: raw.x_position,
            y_position: raw.y_position,
            angle: raw.angle,
            x_velocity: raw.x_velocity,
            y_velocity: raw.y_velocity,
            angular_velocity: raw.angular_velocity,
            fl: raw.fl,
            fr: raw.fr,
            bl: raw.bl,
            br: raw.br,
            battery_voltage: raw.battery_voltage,
        })
    }

    /// Load a series from a JSON column file. The name defaults to the
    /// file stem when the file does not carry one.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SeriesError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut series: Self = serde_json::from_str(&content)?;
        if series.name.is_empty() {
            if let Some(stem) = path.file_stem() {
                series.name = stem.to_string_lossy().into_owned();
            }
        }
        Ok(series)
    }

    /// Recording label (file stem by default).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of recorded steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Recording timestep, taken from the first two timestamps. The
    /// capture runs at a fixed rate, so this is constant across the run.
    /// Returns `None` for a single-row series.
    #[must_use]
    pub fn dt(&self) -> Option<f64> {
        (self.time.len() >= 2).then(|| self.time[1] - self.time[0])
    }

    /// Elapsed-time column.
    #[must_use]
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Commanded powers at step `i`.
    ///
    /// # Panics
    ///
    /// Panics when `i` is out of range, like slice indexing.
    #[must_use]
    pub fn command_at(&self, i: usize) -> RobotCommand {
        RobotCommand::new(self.fl[i], self.fr[i], self.bl[i], self.br[i])
    }

    /// Measured world-frame pose `[x, y, ψ]` at step `i`.
    #[must_use]
    pub fn measured_position(&self, i: usize) -> Vector3<f64> {
        Vector3::new(self.x_position[i], self.y_position[i], self.angle[i])
    }

    /// Measured robot-frame velocity `[vx, vy, ω]` at step `i`.
    #[must_use]
    pub fn measured_velocity(&self, i: usize) -> Vector3<f64> {
        Vector3::new(self.x_velocity[i], self.y_velocity[i], self.angular_velocity[i])
    }

    /// Battery voltage at step `i`.
    #[must_use]
    pub fn battery_voltage_at(&self, i: usize) -> f64 {
        self.battery_voltage[i]
    }

    /// Measured robot-frame velocity columns `(vx, vy, ω)`, for plotting
    /// and loss computation.
    #[must_use]
    pub fn measured_velocity_columns(&self) -> (&[f64], &[f64], &[f64]) {
        (&self.x_velocity, &self.y_velocity, &self.angular_velocity)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
