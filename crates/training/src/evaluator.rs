//! Held-out evaluation.
//!
//! Pairs the model cannot score (a user or movie without a factor vector,
//! or a non-finite prediction) are skipped and counted rather than failing
//! the evaluation. With nothing scored the RMSE is undefined, and an
//! undefined RMSE loses every comparison.

use crate::model::{Hyperparameters, Model};
use data_loader::Rating;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub hyperparameters: Hyperparameters,
    /// Root mean squared error over scored pairs; `None` if nothing was scored
    pub rmse: Option<f64>,
    pub scored: usize,
    pub skipped: usize,
}

impl EvaluationResult {
    /// True if `self` should replace `incumbent` as the running best.
    ///
    /// Only a strictly lower, defined RMSE wins, so ties keep the incumbent.
    pub fn improves_on(&self, incumbent: &EvaluationResult) -> bool {
        compare_rmse(self.rmse, incumbent.rmse) == Ordering::Less
    }
}

/// Order two RMSE values, undefined sorting after every defined value
pub fn compare_rmse(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Pure fold step over `(result, payload)` pairs.
///
/// Keeps `best` unless `candidate` strictly improves on it. A candidate with
/// an undefined RMSE never becomes the first best.
pub fn select_best<T>(
    best: Option<(EvaluationResult, T)>,
    candidate: (EvaluationResult, T),
) -> Option<(EvaluationResult, T)> {
    match best {
        Some(best) if !candidate.0.improves_on(&best.0) => Some(best),
        None if candidate.0.rmse.is_none() => None,
        _ => Some(candidate),
    }
}

/// Evaluate `model` against held-out `ratings`
pub fn evaluate(model: &Model, ratings: &[Rating]) -> EvaluationResult {
    let mut squared_error = 0.0;
    let mut scored = 0;
    let mut skipped = 0;

    for rating in ratings {
        match model.predict(rating.user_id, rating.movie_id) {
            Some(predicted) if predicted.is_finite() => {
                squared_error += (rating.rating - predicted).powi(2);
                scored += 1;
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("Skipped {} unscorable pairs out of {}", skipped, ratings.len());
    }

    EvaluationResult {
        hyperparameters: model.hyperparameters(),
        rmse: (scored > 0).then(|| (squared_error / scored as f64).sqrt()),
        scored,
        skipped,
    }
}
