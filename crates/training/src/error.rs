//! Error types for partitioning, training and model selection.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrainingError {
    /// Split fractions, grid axes or trainer settings are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Training set is empty")]
    EmptyTrainingSet,

    /// Rank 0, negative or non-finite regularization, or normal equations
    /// that cannot be solved without regularization
    #[error("Invalid hyperparameters (rank {rank}, regularization {regularization}): {reason}")]
    InvalidHyperparameters {
        rank: usize,
        regularization: f64,
        reason: String,
    },

    /// Every grid point failed or produced an undefined validation RMSE
    #[error("No viable configuration among {trials} grid points")]
    NoViableConfiguration { trials: usize },

    #[error("Search cancelled after {completed} of {total} grid points")]
    Cancelled { completed: usize, total: usize },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, TrainingError>;
