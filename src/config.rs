//! Settings of the learning operator.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration of [`BackpropagationOperator`](crate::backprop::BackpropagationOperator).
///
/// ```toml
/// learning_rate = 0.05
/// final_run_only = true
/// final_run_window = 1
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackpropConfig {
    /// Step size of the gradient descent. Zero turns learning into a no-op.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Only learn during the last generations of a run.
    #[serde(default)]
    pub final_run_only: bool,
    /// How many generations before the last one count as the final run.
    #[serde(default = "default_final_run_window")]
    pub final_run_window: u64,
}

fn default_learning_rate() -> f64 {
    0.01
}

fn default_final_run_window() -> u64 {
    1
}

impl Default for BackpropConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            final_run_only: false,
            final_run_window: default_final_run_window(),
        }
    }
}

impl BackpropConfig {
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Restrict learning to the generations within `window` of the last one.
    pub fn final_run_only(mut self, window: u64) -> Self {
        self.final_run_only = true;
        self.final_run_window = window;
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: BackpropConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate < 0. {
            return Err(Error::invalid_configuration(format!(
                "learning rate must be finite and not negative, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}
