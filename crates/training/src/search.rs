//! Grid search over (rank, regularization).
//!
//! ## Algorithm
//! 1. Enumerate the grid regularization-major, rank-minor
//! 2. For each point: train on the training set, evaluate on validation
//! 3. Fold each result into the running best (strictly lower RMSE wins)
//! 4. Evaluate the best model on the testing set
//! 5. Refit with the winning hyperparameters on the configured scope
//! 6. Evaluate the refit model on the testing set (reported only)
//!
//! A grid point that fails to train is recorded and the search moves on.
//! Points may be trained concurrently; results are still folded and logged
//! in grid order, so the outcome does not depend on scheduling.

use crate::als::AlsTrainer;
use crate::error::{Result, TrainingError};
use crate::evaluator::{EvaluationResult, evaluate, select_best};
use crate::model::{Hyperparameters, Model};
use crate::split::Partition;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Candidate values for each hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchGrid {
    pub ranks: Vec<usize>,
    pub regularizations: Vec<f64>,
}

impl SearchGrid {
    pub fn new(ranks: Vec<usize>, regularizations: Vec<f64>) -> Self {
        Self {
            ranks,
            regularizations,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ranks.is_empty() || self.regularizations.is_empty() {
            return Err(TrainingError::InvalidConfiguration(
                "search grid needs at least one rank and one regularization".to_string(),
            ));
        }
        if self.ranks.contains(&0) {
            return Err(TrainingError::InvalidConfiguration(
                "ranks must be at least 1".to_string(),
            ));
        }
        if let Some(reg) = self
            .regularizations
            .iter()
            .find(|r| !r.is_finite() || **r < 0.0)
        {
            return Err(TrainingError::InvalidConfiguration(format!(
                "regularization must be finite and non-negative, got {}",
                reg
            )));
        }
        Ok(())
    }

    /// Grid points, regularization-major and rank-minor
    pub fn points(&self) -> Vec<Hyperparameters> {
        self.regularizations
            .iter()
            .flat_map(|&reg| self.ranks.iter().map(move |&rank| Hyperparameters::new(rank, reg)))
            .collect()
    }
}

impl Default for SearchGrid {
    fn default() -> Self {
        Self::new(
            vec![2, 4, 8, 12, 16, 20, 24],
            vec![0.01, 0.05, 0.1, 0.15, 0.2, 0.3],
        )
    }
}

/// Which ratings the final model is refit on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefitScope {
    #[default]
    TrainingAndValidation,
    FullDataset,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub grid: SearchGrid,
    pub refit_scope: RefitScope,
    /// Train grid points concurrently on the rayon pool
    pub parallel: bool,
}

/// Shared flag for stopping a search between grid points
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one grid point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrialOutcome {
    Evaluated(EvaluationResult),
    Failed {
        hyperparameters: Hyperparameters,
        reason: String,
    },
}

impl TrialOutcome {
    pub fn hyperparameters(&self) -> Hyperparameters {
        match self {
            TrialOutcome::Evaluated(result) => result.hyperparameters,
            TrialOutcome::Failed {
                hyperparameters, ..
            } => *hyperparameters,
        }
    }
}

/// Everything a search produced
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// One entry per grid point, in grid order
    pub trials: Vec<TrialOutcome>,
    /// Grid position of the winning point
    pub best_index: usize,
    /// Validation result of the winning grid point
    pub best_validation: EvaluationResult,
    /// The winning grid point's model on the testing set
    pub best_test: EvaluationResult,
    pub refit_scope: RefitScope,
    /// Model refit with the winning hyperparameters
    pub final_model: Model,
    /// Wall time of the refit alone
    pub refit_duration: Duration,
    /// The refit model on the testing set
    pub final_test: EvaluationResult,
}

impl SearchReport {
    pub fn best_hyperparameters(&self) -> Hyperparameters {
        self.best_validation.hyperparameters
    }
}

/// Drives the trainer and evaluator over a hyperparameter grid
pub struct GridSearch {
    trainer: AlsTrainer,
    config: SearchConfig,
}

type Trial = std::result::Result<(EvaluationResult, Model), TrainingError>;

impl GridSearch {
    pub fn new(trainer: AlsTrainer, config: SearchConfig) -> Self {
        Self { trainer, config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run the search over `partition`, honouring `cancel` between grid points
    #[instrument(skip_all, fields(points = self.config.grid.ranks.len() * self.config.grid.regularizations.len()))]
    pub fn run(&self, partition: &Partition, cancel: &CancellationToken) -> Result<SearchReport> {
        self.config.grid.validate()?;
        self.trainer.config().validate()?;
        let points = self.config.grid.points();
        let total = points.len();

        let results: Vec<Option<Trial>> = if self.config.parallel {
            points
                .par_iter()
                .map(|&hp| (!cancel.is_cancelled()).then(|| self.run_trial(partition, hp)))
                .collect()
        } else {
            let mut results = Vec::with_capacity(total);
            for &hp in &points {
                if cancel.is_cancelled() {
                    break;
                }
                results.push(Some(self.run_trial(partition, hp)));
            }
            results
        };

        let completed = results.iter().filter(|r| r.is_some()).count();
        if completed < total {
            warn!("Search cancelled after {} of {} grid points", completed, total);
            return Err(TrainingError::Cancelled { completed, total });
        }

        let mut trials = Vec::with_capacity(total);
        let mut best: Option<(EvaluationResult, (usize, Model))> = None;
        for (index, (hp, trial)) in points
            .into_iter()
            .zip(results.into_iter().flatten())
            .enumerate()
        {
            match trial {
                Ok((result, model)) => {
                    match result.rmse {
                        Some(rmse) => info!(
                            "For rank {}, regularization {}, the RMSE is {}",
                            hp.rank, hp.regularization, rmse
                        ),
                        None => warn!("For {}, nothing in the validation set could be scored", hp),
                    }
                    trials.push(TrialOutcome::Evaluated(result));
                    best = select_best(best, (result, (index, model)));
                }
                Err(e) => {
                    warn!("Training failed for {}: {}", hp, e);
                    trials.push(TrialOutcome::Failed {
                        hyperparameters: hp,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let (best_validation, (best_index, best_model)) =
            best.ok_or(TrainingError::NoViableConfiguration { trials: total })?;
        let winner = best_validation.hyperparameters;
        info!(
            "The best model was trained with rank {} and regularization {}",
            winner.rank, winner.regularization
        );

        let best_test = evaluate(&best_model, &partition.testing);
        info!("Its RMSE on the test set is {}", format_rmse(best_test.rmse));

        let refit_ratings = match self.config.refit_scope {
            RefitScope::TrainingAndValidation => partition.training_and_validation(),
            RefitScope::FullDataset => partition.all(),
        };
        let refit_start = Instant::now();
        let final_model = self.trainer.train(&refit_ratings, winner)?;
        let refit_duration = refit_start.elapsed();
        let final_test = evaluate(&final_model, &partition.testing);
        info!(
            "Refit on {:?} ({} ratings) in {:.2?}; test RMSE {}",
            self.config.refit_scope,
            refit_ratings.len(),
            refit_duration,
            format_rmse(final_test.rmse)
        );

        Ok(SearchReport {
            trials,
            best_index,
            best_validation,
            best_test,
            refit_scope: self.config.refit_scope,
            final_model,
            refit_duration,
            final_test,
        })
    }

    fn run_trial(&self, partition: &Partition, hp: Hyperparameters) -> Trial {
        let model = self.trainer.train(&partition.training, hp)?;
        let result = evaluate(&model, &partition.validation);
        Ok((result, model))
    }
}

pub fn format_rmse(rmse: Option<f64>) -> String {
    rmse.map(|r| format!("{:.6}", r))
        .unwrap_or_else(|| "undefined".to_string())
}
