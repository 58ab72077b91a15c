//! Pipeline configuration.
//!
//! Every tunable of a run lives here and is passed into constructors; there
//! are no hidden constants. A JSON file may set any subset of the fields,
//! the rest take the defaults below.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use training::{
    AlsConfig, DuplicatePolicy, RefitScope, SearchConfig, SearchGrid, SplitFractions,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Latent ranks to try
    #[serde(default = "default_ranks")]
    pub ranks: Vec<usize>,

    /// Regularization strengths to try
    #[serde(default = "default_regularizations")]
    pub regularizations: Vec<f64>,

    #[serde(default)]
    pub split: SplitFractions,

    #[serde(default = "default_split_seed")]
    pub split_seed: u64,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Relative objective change that ends training early; 0 disables it
    #[serde(default)]
    pub tolerance: f64,

    /// Seed of the item-factor initialization
    #[serde(default = "default_als_seed")]
    pub als_seed: u64,

    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    #[serde(default)]
    pub refit_scope: RefitScope,

    /// Train grid points concurrently
    #[serde(default)]
    pub parallel_grid: bool,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Popularity floor for recommendations; `None` disables it
    #[serde(default = "default_min_rating_count")]
    pub min_rating_count: Option<u32>,

    /// Restrict recommendations to one category label
    #[serde(default)]
    pub category: Option<String>,
}

fn default_ranks() -> Vec<usize> {
    vec![2, 4, 8, 12, 16, 20, 24]
}

fn default_regularizations() -> Vec<f64> {
    vec![0.01, 0.05, 0.1, 0.15, 0.2, 0.3]
}

fn default_split_seed() -> u64 {
    12345
}

fn default_max_iterations() -> usize {
    10
}

fn default_als_seed() -> u64 {
    123
}

fn default_top_k() -> usize {
    25
}

fn default_min_rating_count() -> Option<u32> {
    Some(20)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ranks: default_ranks(),
            regularizations: default_regularizations(),
            split: SplitFractions::default(),
            split_seed: default_split_seed(),
            max_iterations: default_max_iterations(),
            tolerance: 0.0,
            als_seed: default_als_seed(),
            duplicate_policy: DuplicatePolicy::default(),
            refit_scope: RefitScope::default(),
            parallel_grid: false,
            top_k: default_top_k(),
            min_rating_count: default_min_rating_count(),
            category: None,
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file and validate it
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject anything the trainer or partitioner would refuse, before any
    /// work starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |e: training::TrainingError| ConfigError::Invalid(e.to_string());
        self.split.validate().map_err(invalid)?;
        self.grid().validate().map_err(invalid)?;
        self.als_config().validate().map_err(invalid)?;
        if matches!(&self.category, Some(c) if c.trim().is_empty()) {
            return Err(ConfigError::Invalid("category must not be blank".to_string()));
        }
        Ok(())
    }

    pub fn grid(&self) -> SearchGrid {
        SearchGrid::new(self.ranks.clone(), self.regularizations.clone())
    }

    pub fn als_config(&self) -> AlsConfig {
        AlsConfig {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            seed: self.als_seed,
            duplicate_policy: self.duplicate_policy,
        }
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            grid: self.grid(),
            refit_scope: self.refit_scope,
            parallel: self.parallel_grid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.grid().points().len(), 42);
        assert_eq!(config.min_rating_count, Some(20));
    }

    #[test]
    fn test_partial_override() {
        let config = PipelineConfig::from_json(
            r#"{
                "ranks": [4],
                "regularizations": [0.1, 0.2],
                "split": {"training": 0.8, "validation": 0.1, "testing": 0.1},
                "duplicate_policy": "last_wins",
                "refit_scope": "full_dataset",
                "min_rating_count": null,
                "category": "Comedy"
            }"#,
        )
        .unwrap();

        assert_eq!(config.ranks, vec![4]);
        assert_eq!(config.split.training, 0.8);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::LastWins);
        assert_eq!(config.refit_scope, RefitScope::FullDataset);
        assert_eq!(config.min_rating_count, None);
        assert_eq!(config.category.as_deref(), Some("Comedy"));
        assert_eq!(config.top_k, 25);
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        for json in [
            r#"{"ranks": []}"#,
            r#"{"ranks": [0]}"#,
            r#"{"regularizations": [-1.0]}"#,
            r#"{"split": {"training": 0.5, "validation": 0.1, "testing": 0.1}}"#,
            r#"{"max_iterations": 0}"#,
            r#"{"category": "  "}"#,
        ] {
            assert!(
                matches!(PipelineConfig::from_json(json), Err(ConfigError::Invalid(_))),
                "{}",
                json
            );
        }
        assert!(matches!(
            PipelineConfig::from_json(r#"{"rankz": [1]}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
