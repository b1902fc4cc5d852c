//! TOML configuration for tuning runs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descent::{GradientDescent, DEFAULT_EPOCHS, DEFAULT_LEARNING_RATE};
use crate::gradient::{default_tuned_indices, DEFAULT_GRAD_STEP};
use crate::search::RandomSearch;

/// Errors from loading or validating a tuning configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_learning_rate() -> f64 {
    DEFAULT_LEARNING_RATE
}
const fn default_epochs() -> usize {
    DEFAULT_EPOCHS
}
const fn default_grad_step() -> f64 {
    DEFAULT_GRAD_STEP
}
const fn default_trials() -> usize {
    100
}
fn default_tuned() -> Vec<usize> {
    default_tuned_indices()
}

// ---------------------------------------------------------------------------
// TuneConfig
// ---------------------------------------------------------------------------

/// Tuning run configuration, loadable from TOML.
///
/// Every field has a default, so an empty file (or no file at all) yields a
/// usable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuneConfig {
    /// Gradient descent step size.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Number of descent epochs.
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Finite-difference step for gradient estimation.
    #[serde(default = "default_grad_step")]
    pub grad_step: f64,

    /// Flat parameter indices to tune during descent.
    #[serde(default = "default_tuned")]
    pub tuned: Vec<usize>,

    /// Number of random search trials.
    #[serde(default = "default_trials")]
    pub trials: usize,

    /// Root seed for random search.
    #[serde(default)]
    pub seed: u64,
}

impl Default for TuneConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            epochs: default_epochs(),
            grad_step: default_grad_step(),
            tuned: default_tuned(),
            trials: default_trials(),
            seed: 0,
        }
    }
}

impl TuneConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "learning_rate",
                message: format!("{} (must be positive and finite)", self.learning_rate),
            });
        }
        if !self.grad_step.is_finite() || self.grad_step <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "grad_step",
                message: format!("{} (must be positive and finite)", self.grad_step),
            });
        }
        if self.epochs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "epochs",
                message: "at least one epoch is required".into(),
            });
        }
        if self.trials == 0 {
            return Err(ConfigError::InvalidValue {
                field: "trials",
                message: "at least one trial is required".into(),
            });
        }
        if self.tuned.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tuned",
                message: "at least one parameter index is required".into(),
            });
        }
        if let Some(&index) = self
            .tuned
            .iter()
            .find(|&&i| i >= mecdrive_dynamics::params::NUM_PARAMETERS)
        {
            return Err(ConfigError::InvalidValue {
                field: "tuned",
                message: format!("index {index} out of range"),
            });
        }
        Ok(())
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Descent driver configured from this file.
    #[must_use]
    pub fn descent(&self) -> GradientDescent {
        GradientDescent::default()
            .with_learning_rate(self.learning_rate)
            .with_epochs(self.epochs)
            .with_grad_step(self.grad_step)
            .with_tuned(self.tuned.clone())
    }

    /// Search driver configured from this file.
    #[must_use]
    pub fn search(&self) -> RandomSearch {
        RandomSearch::default()
            .with_trials(self.trials)
            .with_seed(self.seed)
    }
}
