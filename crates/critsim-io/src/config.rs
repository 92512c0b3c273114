//! Run configuration: hierarchical TOML, matching §6's shape.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("simulation_runs must be positive, got {0}")]
    NonPositiveRuns(i64),

    #[error("workers must be positive, got {0}")]
    NonPositiveWorkers(i64),

    #[error("confidence level {0} outside the open interval (0, 1)")]
    InvalidConfidenceLevel(f64),
}

fn default_simulation_runs() -> u64 {
    10_000
}

fn default_confidence_levels() -> Vec<f64> {
    vec![0.8, 0.9, 0.95]
}

/// A run's configuration, as loaded from a TOML file. `seed` and `workers`
/// are left `None` when absent so the caller can pick its own defaults
/// (a nondeterministic seed, the available parallelism) and report which
/// was used.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_simulation_runs")]
    pub simulation_runs: u64,
    pub seed: Option<u64>,
    pub workers: Option<u32>,
    #[serde(default = "default_confidence_levels")]
    pub confidence_levels: Vec<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulation_runs: default_simulation_runs(),
            seed: None,
            workers: None,
            confidence_levels: default_confidence_levels(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation_runs == 0 {
            return Err(ConfigError::NonPositiveRuns(0));
        }
        if let Some(w) = self.workers {
            if w == 0 {
                return Err(ConfigError::NonPositiveWorkers(0));
            }
        }
        for &c in &self.confidence_levels {
            if !(c > 0.0 && c < 1.0) {
                return Err(ConfigError::InvalidConfidenceLevel(c));
            }
        }
        Ok(())
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// The two-sided percentile pair `(50 - c/2*100, 50 + c/2*100)` for
    /// confidence level `c`, e.g. 0.9 -> (5, 95).
    pub fn interval_for(confidence: f64) -> (f64, f64) {
        let half = confidence / 2.0 * 100.0;
        (50.0 - half, 50.0 + half)
    }
}
