//! Evolution configuration types.
//!
//! This module provides types for configuring the regularized-evolution
//! engine: population and tournament sizes, the run mode (plain, hurdles,
//! quality-diversity, map-elites) and the cross-process migration protocol.

use serde::{Deserialize, Serialize};

/// Top-level configuration for a regularized-evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Number of population slots. Fixed for the engine's lifetime.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Number of slots sampled per tournament.
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// Report progress every this many evaluated individuals.
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
    /// Per-generation strategy.
    #[serde(default)]
    pub mode: RunMode,
    /// Cross-process migration settings.
    #[serde(default)]
    pub migration: MigrationConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            tournament_size: default_tournament_size(),
            progress_every: default_progress_every(),
            mode: RunMode::default(),
            migration: MigrationConfig::default(),
            random_seed: None,
        }
    }
}

fn default_population_size() -> usize {
    100
}
fn default_tournament_size() -> usize {
    10
}
fn default_progress_every() -> u64 {
    1000
}

/// Run mode, chosen once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum RunMode {
    /// Tournament selection on fitness, full evaluation only.
    #[default]
    Standard,
    /// Early evaluation gates full evaluation behind an adaptive hurdle.
    Hurdles,
    /// Tournament score is fitness plus a normalised structural diversity.
    QualityDiversity,
    /// Population is filtered through a map-elites archive each generation.
    MapElites {
        /// Cells per feature dimension: `[variables, operations]`.
        #[serde(default = "default_map_elites_grid")]
        grid: Vec<usize>,
    },
}

impl RunMode {
    /// Map-elites mode with the default grid.
    pub fn map_elites() -> Self {
        Self::MapElites {
            grid: default_map_elites_grid(),
        }
    }
}

fn default_map_elites_grid() -> Vec<usize> {
    vec![64, 256]
}

/// Number of phenotype features the archive is keyed on (variables, operations).
pub const MAP_ELITES_DIMENSIONS: usize = 2;

/// Migration protocol configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Per-generation probability of running an exchange.
    #[serde(default)]
    pub migrate_prob: f64,
    /// Identifies this instance among peers sharing one store.
    #[serde(default)]
    pub run_id: i64,
    /// Which local slots receive migrants.
    #[serde(default)]
    pub splice: SplicePolicy,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrate_prob: 0.0,
            run_id: 0,
            splice: SplicePolicy::default(),
        }
    }
}

/// Where fetched migrants are written into the local population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SplicePolicy {
    /// Slots `0..count`.
    #[default]
    ReplaceTopHalf,
    /// Slots `n/2..n/2 + count`.
    ReplaceBottomHalf,
    /// The `count` lowest-fitness slots (stable order).
    ReplaceWorst,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 1")]
    PopulationTooSmall,
    #[error("Tournament size must be at least 1")]
    TournamentTooSmall,
    #[error("Progress interval must be positive")]
    InvalidProgressInterval,
    #[error("Map-elites grid must have {expected} dimensions, got {actual}")]
    GridDimensions { expected: usize, actual: usize },
    #[error("Map-elites grid capacity must be positive: {0:?}")]
    EmptyGrid(Vec<usize>),
    #[error("Map-elites grid capacity overflows: {0:?}")]
    GridTooLarge(Vec<usize>),
    #[error("Migration probability must be within [0, 1], got {0}")]
    InvalidMigrationProbability(f64),
}

impl EvolutionConfig {
    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        if self.population_size == 0 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }

        if self.tournament_size == 0 {
            return Err(EvolutionConfigError::TournamentTooSmall);
        }

        if self.progress_every == 0 {
            return Err(EvolutionConfigError::InvalidProgressInterval);
        }

        if let RunMode::MapElites { grid } = &self.mode {
            validate_grid(grid)?;
        }

        let p = self.migration.migrate_prob;
        if !(0.0..=1.0).contains(&p) {
            return Err(EvolutionConfigError::InvalidMigrationProbability(p));
        }

        Ok(())
    }
}

/// Check a map-elites grid: right dimensionality and a non-zero capacity
/// that fits in `usize`.
pub fn validate_grid(grid: &[usize]) -> Result<(), EvolutionConfigError> {
    if grid.len() != MAP_ELITES_DIMENSIONS {
        return Err(EvolutionConfigError::GridDimensions {
            expected: MAP_ELITES_DIMENSIONS,
            actual: grid.len(),
        });
    }
    if grid.iter().any(|&d| d == 0) {
        return Err(EvolutionConfigError::EmptyGrid(grid.to_vec()));
    }
    if grid.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d)).is_none() {
        return Err(EvolutionConfigError::GridTooLarge(grid.to_vec()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = EvolutionConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_sizes() {
        let config = EvolutionConfig {
            population_size: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(EvolutionConfigError::PopulationTooSmall)
        );

        let config = EvolutionConfig {
            tournament_size: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(EvolutionConfigError::TournamentTooSmall)
        );
    }

    #[test]
    fn test_rejects_empty_grid() {
        let config = EvolutionConfig {
            mode: RunMode::MapElites { grid: vec![8, 0] },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::EmptyGrid(_))
        ));

        let config = EvolutionConfig {
            mode: RunMode::MapElites { grid: vec![8] },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::GridDimensions { actual: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_overflowing_grid() {
        let config = EvolutionConfig {
            mode: RunMode::MapElites { grid: vec![usize::MAX, 2] },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::GridTooLarge(_))
        ));
        assert!(validate_grid(&[usize::MAX, 1]).is_ok());
    }

    #[test]
    fn test_rejects_bad_migration_probability() {
        for p in [-0.1, 1.5, f64::NAN] {
            let config = EvolutionConfig {
                migration: MigrationConfig {
                    migrate_prob: p,
                    ..Default::default()
                },
                ..Default::default()
            };
            assert!(config.validate().is_err(), "accepted {}", p);
        }
    }

    #[test]
    fn test_serialization() {
        let config = EvolutionConfig {
            mode: RunMode::map_elites(),
            migration: MigrationConfig {
                migrate_prob: 0.25,
                run_id: 3,
                splice: SplicePolicy::ReplaceWorst,
            },
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EvolutionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.mode, config.mode);
        assert_eq!(parsed.migration, config.migration);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let parsed: EvolutionConfig =
            serde_json::from_str(r#"{"mode": {"type": "MapElites"}}"#).unwrap();
        assert_eq!(parsed.population_size, 100);
        assert_eq!(parsed.mode, RunMode::map_elites());
        assert_eq!(parsed.migration.splice, SplicePolicy::ReplaceTopHalf);
    }
}
