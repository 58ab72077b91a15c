//! Model types: hyperparameters, factor matrices and the trained model.

use crate::error::{Result, TrainingError};
use chrono::{DateTime, Utc};
use data_loader::{MovieId, UserId};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Latent dimensionality and regularization strength of one model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub rank: usize,
    pub regularization: f64,
}

impl Hyperparameters {
    pub fn new(rank: usize, regularization: f64) -> Self {
        Self {
            rank,
            regularization,
        }
    }

    /// Rank must be at least 1 and regularization finite and non-negative
    pub fn validate(&self) -> Result<()> {
        if self.rank == 0 {
            return Err(self.invalid("rank must be at least 1"));
        }
        if !self.regularization.is_finite() || self.regularization < 0.0 {
            return Err(self.invalid("regularization must be finite and non-negative"));
        }
        Ok(())
    }

    pub(crate) fn invalid(&self, reason: impl Into<String>) -> TrainingError {
        TrainingError::InvalidHyperparameters {
            rank: self.rank,
            regularization: self.regularization,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rank {}, regularization {}", self.rank, self.regularization)
    }
}

/// Dense latent vectors keyed by entity id, all of length `rank`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorMatrix {
    rank: usize,
    vectors: BTreeMap<u32, Array1<f64>>,
}

impl FactorMatrix {
    pub fn new(rank: usize) -> Self {
        Self {
            rank,
            vectors: BTreeMap::new(),
        }
    }

    /// Insert or replace the vector of `id`; its length must equal the rank
    pub fn insert(&mut self, id: u32, vector: impl Into<Array1<f64>>) -> Result<()> {
        let vector = vector.into();
        if vector.len() != self.rank {
            return Err(TrainingError::InvalidConfiguration(format!(
                "factor vector for {} has length {} but rank is {}",
                id,
                vector.len(),
                self.rank
            )));
        }
        self.vectors.insert(id, vector);
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<ArrayView1<'_, f64>> {
        self.vectors.get(&id).map(|v| v.view())
    }

    pub fn contains(&self, id: u32) -> bool {
        self.vectors.contains_key(&id)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Entity ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.vectors.keys().copied()
    }

    fn check_rank(&self, expected: usize, side: &str) -> Result<()> {
        if self.rank != expected {
            return Err(TrainingError::InvalidConfiguration(format!(
                "{} factors have rank {} but the model rank is {}",
                side, self.rank, expected
            )));
        }
        if let Some((id, v)) = self.vectors.iter().find(|(_, v)| v.len() != expected) {
            return Err(TrainingError::InvalidConfiguration(format!(
                "{} vector {} has length {} but the model rank is {}",
                side,
                id,
                v.len(),
                expected
            )));
        }
        Ok(())
    }
}

/// How a training run ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Number of full user+item iterations performed
    pub iterations: usize,
    /// Regularized training objective after the last iteration
    pub objective: f64,
    pub seed: u64,
}

/// A trained factorization model.
///
/// Immutable once built: every accessor borrows, nothing mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    hyperparameters: Hyperparameters,
    user_factors: FactorMatrix,
    item_factors: FactorMatrix,
    trained_at: DateTime<Utc>,
    summary: TrainingSummary,
}

impl Model {
    /// Assemble a model from factor matrices, checking that both share the
    /// hyperparameters' rank.
    pub fn new(
        hyperparameters: Hyperparameters,
        user_factors: FactorMatrix,
        item_factors: FactorMatrix,
        trained_at: DateTime<Utc>,
        summary: TrainingSummary,
    ) -> Result<Self> {
        let model = Self {
            hyperparameters,
            user_factors,
            item_factors,
            trained_at,
            summary,
        };
        model.validate()?;
        Ok(model)
    }

    /// Check the rank invariant, e.g. after deserialization
    pub fn validate(&self) -> Result<()> {
        self.hyperparameters.validate()?;
        self.user_factors.check_rank(self.hyperparameters.rank, "user")?;
        self.item_factors.check_rank(self.hyperparameters.rank, "item")
    }

    /// Predicted rating, defined only when both vectors exist.
    ///
    /// The value may be non-finite; callers decide how to treat that.
    pub fn predict(&self, user_id: UserId, movie_id: MovieId) -> Option<f64> {
        let u = self.user_factors.get(user_id)?;
        let v = self.item_factors.get(movie_id)?;
        Some(u.dot(&v))
    }

    pub fn hyperparameters(&self) -> Hyperparameters {
        self.hyperparameters
    }

    pub fn rank(&self) -> usize {
        self.hyperparameters.rank
    }

    pub fn user_factors(&self) -> &FactorMatrix {
        &self.user_factors
    }

    pub fn item_factors(&self) -> &FactorMatrix {
        &self.item_factors
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn summary(&self) -> TrainingSummary {
        self.summary
    }
}
