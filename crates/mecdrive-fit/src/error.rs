//! Error types for the fitting drivers.

use mecdrive_core::error::ParameterError;
use mecdrive_sim::trajectory::SimulationError;
use thiserror::Error;

/// Errors from gradient descent and random search.
#[derive(Debug, Error)]
pub enum FitError {
    /// No telemetry samples were provided.
    #[error("no telemetry samples provided")]
    NoSamples,

    /// A trajectory simulation failed while evaluating a candidate.
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),

    /// A parameter index or value was rejected.
    #[error("parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// The descent loss became non-finite.
    #[error("loss diverged at epoch {epoch}")]
    DivergedLoss {
        /// Epoch (0-based) at which the loss left the finite range.
        epoch: usize,
    },

    /// Every search trial failed to produce a finite loss.
    #[error("no successful trials out of {trials}")]
    NoSuccessfulTrial {
        /// Number of trials attempted.
        trials: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(FitError::NoSamples.to_string(), "no telemetry samples provided");
        assert_eq!(
            FitError::DivergedLoss { epoch: 7 }.to_string(),
            "loss diverged at epoch 7"
        );
        assert_eq!(
            FitError::NoSuccessfulTrial { trials: 32 }.to_string(),
            "no successful trials out of 32"
        );
    }
}
