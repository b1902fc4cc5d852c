//! Finite-difference gradients of the trajectory objective.
//!
//! The objective has no closed-form derivative with respect to the physical
//! parameters, so each partial is estimated by central differences:
//!
//! ```text
//! dL/dp_i ~ (L(p + h e_i) - L(p - h e_i)) / (2 h)
//! ```
//!
//! averaged over all telemetry samples. Partials for independent indices are
//! evaluated in parallel with rayon.

use mecdrive_core::geometry::CouplingMatrix;
use mecdrive_dynamics::params::{DriveParameters, NUM_PARAMETERS};
use mecdrive_sim::objective::objective;
use mecdrive_sim::series::DataSeries;
use rayon::prelude::*;

use crate::error::FitError;

/// Default step used for central differences.
pub const DEFAULT_GRAD_STEP: f64 = 1e-4;

/// Parameter indices tuned by default: everything except the battery
/// voltage, which is measured rather than estimated.
#[must_use]
pub fn default_tuned_indices() -> Vec<usize> {
    (0..NUM_PARAMETERS - 1).collect()
}

/// Central-difference partial derivative of the mean per-sample loss with
/// respect to the parameter at `index`.
pub fn partial_derivative(
    r: &CouplingMatrix,
    samples: &[DataSeries],
    base: &DriveParameters,
    index: usize,
    step: f64,
) -> Result<f64, FitError> {
    if samples.is_empty() {
        return Err(FitError::NoSamples);
    }
    let center = base.parameter(index)?;
    let minus = base.with_parameter(index, center - step)?;
    let plus = base.with_parameter(index, center + step)?;

    let diffs: Vec<f64> = samples
        .par_iter()
        .map(|series| {
            let lo = objective(r, &minus, series)?;
            let hi = objective(r, &plus, series)?;
            Ok((hi - lo) / (2.0 * step))
        })
        .collect::<Result<_, FitError>>()?;

    Ok(diffs.iter().sum::<f64>() / diffs.len() as f64)
}

/// Gradient of the mean per-sample loss over the given parameter indices.
///
/// The returned vector is index-aligned with `indices`.
pub fn gradient(
    r: &CouplingMatrix,
    samples: &[DataSeries],
    base: &DriveParameters,
    indices: &[usize],
    step: f64,
) -> Result<Vec<f64>, FitError> {
    if samples.is_empty() {
        return Err(FitError::NoSamples);
    }
    indices
        .par_iter()
        .map(|&index| partial_derivative(r, samples, base, index, step))
        .collect()
}
