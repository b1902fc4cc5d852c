//! The scalar prediction-error objective.
//!
//! This is the sole boundary an external parameter-search driver consumes:
//! it supplies candidate [`DriveParameters`], the objective returns the
//! scalar to minimize. Numerical failures propagate as errors rather than
//! being flattened into an extreme-but-valid loss, so a driver can never
//! mistake a broken simulation for bad parameters.

use mecdrive_core::geometry::CouplingMatrix;
use mecdrive_dynamics::params::DriveParameters;

use crate::series::DataSeries;
use crate::trajectory::{simulate, SimulationError};

/// Prediction error of `params` against one recorded run: the sum of
/// squared robot-frame velocity error over the trajectory.
///
/// # Errors
///
/// Propagates [`simulate`] failures.
pub fn objective(
    r: &CouplingMatrix,
    params: &DriveParameters,
    series: &DataSeries,
) -> Result<f64, SimulationError> {
    Ok(simulate(r, params, series)?.velocity_loss(series))
}

/// Per-sample losses across a set of recorded runs, in input order.
///
/// # Errors
///
/// Fails on the first sample whose simulation fails.
pub fn objective_per_sample(
    r: &CouplingMatrix,
    params: &DriveParameters,
    samples: &[DataSeries],
) -> Result<Vec<f64>, SimulationError> {
    samples
        .iter()
        .map(|series| objective(r, params, series))
        .collect()
}

/// Aggregate fitting objective across recorded runs: the sum of squared
/// per-sample losses.
///
/// Squaring weighs badly-predicted runs more heavily than a plain sum, the
/// combination the search driver fits against. Use
/// [`objective_per_sample`] to combine differently.
///
/// # Errors
///
/// Fails on the first sample whose simulation fails.
pub fn aggregate_objective(
    r: &CouplingMatrix,
    params: &DriveParameters,
    samples: &[DataSeries],
) -> Result<f64, SimulationError> {
    Ok(objective_per_sample(r, params, samples)?
        .into_iter()
        .map(|loss| loss * loss)
        .sum())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
