//! Gradient descent over the trajectory objective.
//!
//! Walks the flat parameter vector downhill along finite-difference
//! gradients. Each epoch recomputes the full gradient over every telemetry
//! sample, applies one step, and records the post-step loss.

use mecdrive_core::geometry::CouplingMatrix;
use mecdrive_dynamics::params::DriveParameters;
use mecdrive_sim::objective::objective_per_sample;
use mecdrive_sim::series::DataSeries;

use crate::error::FitError;
use crate::gradient::{default_tuned_indices, gradient, DEFAULT_GRAD_STEP};

/// Default learning rate. Small, because the loss surface is steep along
/// the inertia parameters.
pub const DEFAULT_LEARNING_RATE: f64 = 1e-4;

/// Default number of epochs.
pub const DEFAULT_EPOCHS: usize = 100;

// ---------------------------------------------------------------------------
// GradientDescent
// ---------------------------------------------------------------------------

/// Configuration for a gradient descent run.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    /// Step size multiplied into the negative gradient each epoch.
    pub learning_rate: f64,
    /// Number of epochs to run.
    pub epochs: usize,
    /// Finite-difference step for gradient estimation.
    pub grad_step: f64,
    /// Flat parameter indices to tune; the rest stay fixed.
    pub tuned: Vec<usize>,
}

impl Default for GradientDescent {
    fn default() -> Self {
        Self {
            learning_rate: DEFAULT_LEARNING_RATE,
            epochs: DEFAULT_EPOCHS,
            grad_step: DEFAULT_GRAD_STEP,
            tuned: default_tuned_indices(),
        }
    }
}

/// Result of a gradient descent run.
#[derive(Debug, Clone)]
pub struct FitReport {
    /// Parameters after the final epoch.
    pub params: DriveParameters,
    /// Summed per-sample loss after each epoch.
    pub loss_history: Vec<f64>,
    /// Number of epochs actually run.
    pub epochs_run: usize,
}

impl FitReport {
    /// Loss after the final epoch, if any epoch ran.
    #[must_use]
    pub fn final_loss(&self) -> Option<f64> {
        self.loss_history.last().copied()
    }
}

impl GradientDescent {
    /// Override the learning rate.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Override the epoch count.
    #[must_use]
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Override the finite-difference step.
    #[must_use]
    pub fn with_grad_step(mut self, grad_step: f64) -> Self {
        self.grad_step = grad_step;
        self
    }

    /// Override the set of tuned parameter indices.
    #[must_use]
    pub fn with_tuned(mut self, tuned: Vec<usize>) -> Self {
        self.tuned = tuned;
        self
    }

    /// Run descent from `initial` against the telemetry in `samples`.
    ///
    /// Fails fast if the loss leaves the finite range instead of walking
    /// further into a divergent region.
    pub fn run(
        &self,
        r: &CouplingMatrix,
        samples: &[DataSeries],
        initial: &DriveParameters,
    ) -> Result<FitReport, FitError> {
        if samples.is_empty() {
            return Err(FitError::NoSamples);
        }

        let mut params = *initial;
        let mut loss_history = Vec::with_capacity(self.epochs);

        for epoch in 0..self.epochs {
            let g = gradient(r, samples, &params, &self.tuned, self.grad_step)?;
            for (&index, &partial) in self.tuned.iter().zip(&g) {
                let value = params.parameter(index)? - self.learning_rate * partial;
                params = params.with_parameter(index, value)?;
            }

            let loss: f64 = objective_per_sample(r, &params, samples)?.iter().sum();
            if !loss.is_finite() {
                return Err(FitError::DivergedLoss { epoch });
            }
            tracing::info!(epoch, loss, "descent epoch complete");
            loss_history.push(loss);
        }

        Ok(FitReport {
            params,
            epochs_run: loss_history.len(),
            loss_history,
        })
    }
}
