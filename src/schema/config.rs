//! Configuration types for experiments and the built-in synthetic objective.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::EvolutionConfig;

/// Top-level experiment configuration, as read by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Engine configuration.
    #[serde(default)]
    pub evolution: EvolutionConfig,
    /// Generator/mutator/evaluator settings.
    #[serde(default)]
    pub synthetic: SyntheticConfig,
    /// SQLite database shared with peer runs. In-memory store when absent.
    #[serde(default)]
    pub database: Option<PathBuf>,
    /// Train-step budget for the run.
    #[serde(default = "default_max_train_steps")]
    pub max_train_steps: u64,
    /// Wall-clock budget in seconds. Unlimited when absent.
    #[serde(default)]
    pub max_seconds: Option<f64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            evolution: EvolutionConfig::default(),
            synthetic: SyntheticConfig::default(),
            database: None,
            max_train_steps: default_max_train_steps(),
            max_seconds: None,
        }
    }
}

fn default_max_train_steps() -> u64 {
    10_000
}

impl ExperimentConfig {
    /// Validate every part of the experiment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.evolution.validate()?;
        self.synthetic.validate()?;
        if let Some(secs) = self.max_seconds
            && !(secs > 0.0 && secs.is_finite())
        {
            return Err(ConfigError::InvalidTimeBudget(secs));
        }
        Ok(())
    }
}

/// Settings for the built-in synthetic program objective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Instruction count bounds (inclusive) for the setup section.
    #[serde(default = "default_setup_size")]
    pub setup_size: (usize, usize),
    /// Instruction count bounds (inclusive) for the predict section.
    #[serde(default = "default_predict_size")]
    pub predict_size: (usize, usize),
    /// Instruction count bounds (inclusive) for the learn section.
    #[serde(default = "default_learn_size")]
    pub learn_size: (usize, usize),
    /// Number of addressable variables per kind.
    #[serde(default = "default_num_addresses")]
    pub num_addresses: u8,
    /// Desired share of each opcode category, in category order.
    #[serde(default = "default_target_mix")]
    pub target_mix: [f64; 5],
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            setup_size: default_setup_size(),
            predict_size: default_predict_size(),
            learn_size: default_learn_size(),
            num_addresses: default_num_addresses(),
            target_mix: default_target_mix(),
        }
    }
}

fn default_setup_size() -> (usize, usize) {
    (1, 10)
}
fn default_predict_size() -> (usize, usize) {
    (1, 20)
}
fn default_learn_size() -> (usize, usize) {
    (1, 20)
}
fn default_num_addresses() -> u8 {
    10
}
fn default_target_mix() -> [f64; 5] {
    [0.4, 0.1, 0.1, 0.3, 0.1]
}

impl SyntheticConfig {
    /// Validate bounds and the target mix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, bounds) in [
            ("setup", self.setup_size),
            ("predict", self.predict_size),
            ("learn", self.learn_size),
        ] {
            if bounds.0 > bounds.1 {
                return Err(ConfigError::InvalidBounds(format!(
                    "{} min ({}) > max ({})",
                    name, bounds.0, bounds.1
                )));
            }
        }
        if self.num_addresses == 0 {
            return Err(ConfigError::NoAddresses);
        }
        let total: f64 = self.target_mix.iter().sum();
        if self.target_mix.iter().any(|w| !w.is_finite() || *w < 0.0) || total <= 0.0 {
            return Err(ConfigError::InvalidTargetMix);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Evolution config validation failed: {0}")]
    Evolution(#[from] super::EvolutionConfigError),
    #[error("Invalid instruction bounds: {0}")]
    InvalidBounds(String),
    #[error("At least one address per kind is required")]
    NoAddresses,
    #[error("Target mix weights must be non-negative and not all zero")]
    InvalidTargetMix,
    #[error("Time budget must be a positive number of seconds, got {0}")]
    InvalidTimeBudget(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_experiment_valid() {
        assert!(ExperimentConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let config = SyntheticConfig {
            predict_size: (5, 2),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBounds(_))
        ));
    }

    #[test]
    fn test_rejects_zero_mix() {
        let config = SyntheticConfig {
            target_mix: [0.0; 5],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTargetMix)));
    }

    #[test]
    fn test_rejects_bad_time_budget() {
        let config = ExperimentConfig {
            max_seconds: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeBudget(_))
        ));
    }

    #[test]
    fn test_evolution_errors_propagate() {
        let mut config = ExperimentConfig::default();
        config.evolution.population_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Evolution(_))));
    }
}
