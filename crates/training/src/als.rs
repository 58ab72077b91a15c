//! Alternating least squares trainer.
//!
//! Minimizes
//!
//! ```text
//! Σ (r − uᵀv)² + λ (Σ_u n_u‖u‖² + Σ_i n_i‖v‖²)
//! ```
//!
//! by alternating two half-iterations. With item factors fixed, every user's
//! regularized normal equations `(Σ v vᵀ + λ n_u I) u = Σ r v` are solved
//! independently, then the same is done for items with user factors fixed.
//!
//! ## Parallelism
//! The per-entity solves of one half-iteration run on the rayon pool. Each
//! phase reads the other side's matrix and produces a brand new matrix for
//! its own side, so nothing is shared mutably. The two phases run one after
//! the other.
//!
//! ## Determinism
//! Item factors are initialized from `StdRng::seed_from_u64(seed)`, uniform
//! in [0, 1) per component, visiting items in ascending id order, and each
//! vector is normalized to unit length. User factors come out of the first
//! user half-iteration. Objective sums run sequentially so the stopping
//! decision does not depend on thread scheduling.

use crate::error::{Result, TrainingError};
use crate::model::{FactorMatrix, Hyperparameters, Model, TrainingSummary};
use chrono::Utc;
use data_loader::Rating;
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

/// Without regularization, Cholesky pivots below this fraction of the
/// largest diagonal entry count as zero
const PIVOT_TOLERANCE: f64 = 1e-12;

/// What to do with repeated (user, movie) observations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Every observation contributes to the fit
    #[default]
    KeepAll,
    /// The observation appearing last in the input replaces earlier ones
    LastWins,
    /// Observations of the same pair are averaged into one
    Average,
}

/// Trainer settings that are not hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlsConfig {
    /// Upper bound on full iterations (at least 1)
    pub max_iterations: usize,
    /// Stop once the relative change of the objective drops below this;
    /// 0 always runs `max_iterations`
    pub tolerance: f64,
    pub seed: u64,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for AlsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: 0.0,
            seed: 123,
            duplicate_policy: DuplicatePolicy::KeepAll,
        }
    }
}

impl AlsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(TrainingError::InvalidConfiguration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(TrainingError::InvalidConfiguration(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Observations grouped by entity: (dense index of the other side, rating)
type Adjacency = Vec<Vec<(usize, f64)>>;

/// Training set re-indexed densely over sorted user and movie ids
struct Problem {
    user_ids: Vec<u32>,
    item_ids: Vec<u32>,
    by_user: Adjacency,
    by_item: Adjacency,
    observations: Vec<(usize, usize, f64)>,
}

impl Problem {
    fn build(ratings: &[Rating], policy: DuplicatePolicy) -> Self {
        let triples = apply_duplicate_policy(ratings, policy);

        let mut user_ids: Vec<u32> = triples.iter().map(|t| t.0).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let mut item_ids: Vec<u32> = triples.iter().map(|t| t.1).collect();
        item_ids.sort_unstable();
        item_ids.dedup();

        let user_index: HashMap<u32, usize> =
            user_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let item_index: HashMap<u32, usize> =
            item_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut by_user: Adjacency = vec![Vec::new(); user_ids.len()];
        let mut by_item: Adjacency = vec![Vec::new(); item_ids.len()];
        let mut observations = Vec::with_capacity(triples.len());
        for (user_id, item_id, r) in triples {
            let u = user_index[&user_id];
            let i = item_index[&item_id];
            by_user[u].push((i, r));
            by_item[i].push((u, r));
            observations.push((u, i, r));
        }

        Self {
            user_ids,
            item_ids,
            by_user,
            by_item,
            observations,
        }
    }
}

fn apply_duplicate_policy(ratings: &[Rating], policy: DuplicatePolicy) -> Vec<(u32, u32, f64)> {
    match policy {
        DuplicatePolicy::KeepAll => ratings
            .iter()
            .map(|r| (r.user_id, r.movie_id, r.rating))
            .collect(),
        DuplicatePolicy::LastWins => {
            let mut last: BTreeMap<(u32, u32), f64> = BTreeMap::new();
            for r in ratings {
                last.insert((r.user_id, r.movie_id), r.rating);
            }
            last.into_iter().map(|((u, i), r)| (u, i, r)).collect()
        }
        DuplicatePolicy::Average => {
            let mut sums: BTreeMap<(u32, u32), (f64, usize)> = BTreeMap::new();
            for r in ratings {
                let entry = sums.entry((r.user_id, r.movie_id)).or_insert((0.0, 0));
                entry.0 += r.rating;
                entry.1 += 1;
            }
            sums.into_iter()
                .map(|((u, i), (sum, n))| (u, i, sum / n as f64))
                .collect()
        }
    }
}

/// Fits factorization models with alternating least squares
#[derive(Debug, Clone, Default)]
pub struct AlsTrainer {
    config: AlsConfig,
}

impl AlsTrainer {
    pub fn new(config: AlsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlsConfig {
        &self.config
    }

    /// Train a model on `ratings`.
    ///
    /// Users and movies absent from `ratings` get no factor vector.
    #[instrument(skip(self, ratings), fields(rank = hyperparameters.rank, regularization = hyperparameters.regularization))]
    pub fn train(&self, ratings: &[Rating], hyperparameters: Hyperparameters) -> Result<Model> {
        self.config.validate()?;
        hyperparameters.validate()?;
        if ratings.is_empty() {
            return Err(TrainingError::EmptyTrainingSet);
        }

        let problem = Problem::build(ratings, self.config.duplicate_policy);
        let rank = hyperparameters.rank;
        let lambda = hyperparameters.regularization;

        let mut items = initial_item_factors(problem.item_ids.len(), rank, self.config.seed);
        let mut users = Array2::<f64>::zeros((problem.user_ids.len(), rank));
        let mut previous: Option<f64> = None;
        let mut objective = f64::NAN;
        let mut iterations = 0;

        for iteration in 1..=self.config.max_iterations {
            users = solve_phase(&problem.by_user, &items, &problem.user_ids, hyperparameters, "user")?;
            items = solve_phase(&problem.by_item, &users, &problem.item_ids, hyperparameters, "item")?;
            objective = training_objective(&problem, &users, &items, lambda);
            iterations = iteration;
            debug!("Iteration {}: objective {}", iteration, objective);

            if let Some(prev) = previous {
                if relative_change(prev, objective) < self.config.tolerance {
                    debug!("Converged after {} iterations", iteration);
                    break;
                }
            }
            previous = Some(objective);
        }

        let mut user_factors = FactorMatrix::new(rank);
        for (id, vector) in problem.user_ids.iter().zip(users.rows()) {
            user_factors.insert(*id, vector.to_owned())?;
        }
        let mut item_factors = FactorMatrix::new(rank);
        for (id, vector) in problem.item_ids.iter().zip(items.rows()) {
            item_factors.insert(*id, vector.to_owned())?;
        }

        Model::new(
            hyperparameters,
            user_factors,
            item_factors,
            Utc::now(),
            TrainingSummary {
                iterations,
                objective,
                seed: self.config.seed,
            },
        )
    }
}

fn relative_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        if current == 0.0 { 0.0 } else { f64::INFINITY }
    } else {
        ((previous - current) / previous).abs()
    }
}

/// One unit-length row per item, drawn in ascending item order
fn initial_item_factors(count: usize, rank: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut items = Array2::from_shape_fn((count, rank), |_| rng.random::<f64>());
    for mut row in items.rows_mut() {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|x| x / norm);
        } else {
            row.fill(1.0 / (rank as f64).sqrt());
        }
    }
    items
}

/// Solve every entity's normal equations against the fixed side
fn solve_phase(
    adjacency: &Adjacency,
    fixed: &Array2<f64>,
    ids: &[u32],
    hyperparameters: Hyperparameters,
    side: &str,
) -> Result<Array2<f64>> {
    let rows: Vec<Array1<f64>> = adjacency
        .par_iter()
        .enumerate()
        .map(|(idx, observed)| {
            solve_entity(observed, fixed, hyperparameters).ok_or_else(|| {
                hyperparameters.invalid(format!(
                    "normal equations for {} {} are singular",
                    side, ids[idx]
                ))
            })
        })
        .collect::<Result<_>>()?;

    let mut solved = Array2::zeros((rows.len(), hyperparameters.rank));
    for (mut target, row) in solved.rows_mut().into_iter().zip(&rows) {
        target.assign(row);
    }
    Ok(solved)
}

/// Build and solve `(Σ v vᵀ + λ n I) x = Σ r v` for one entity
fn solve_entity(
    observed: &[(usize, f64)],
    fixed: &Array2<f64>,
    hyperparameters: Hyperparameters,
) -> Option<Array1<f64>> {
    let indices: Vec<usize> = observed.iter().map(|&(other, _)| other).collect();
    let ratings: Array1<f64> = observed.iter().map(|&(_, r)| r).collect();
    let vectors = fixed.select(Axis(0), &indices);

    let mut a = vectors.t().dot(&vectors);
    let ridge = hyperparameters.regularization * observed.len() as f64;
    for d in a.diag_mut() {
        *d += ridge;
    }
    let b = vectors.t().dot(&ratings);

    solve_normal_equations(&a, &b, hyperparameters.regularization == 0.0)
}

/// Cholesky solve of `a x = b`.
///
/// Any positive pivot is accepted when the system is regularized, since
/// `λ n > 0` keeps it positive definite. Without regularization a pivot
/// that is tiny next to the largest diagonal entry means a rank-deficient
/// system and yields `None`.
fn solve_normal_equations(a: &Array2<f64>, b: &Array1<f64>, unregularized: bool) -> Option<Array1<f64>> {
    let k = b.len();
    let cholesky = DMatrix::from_fn(k, k, |i, j| a[[i, j]]).cholesky()?;

    if unregularized {
        let max_diag = a.diag().fold(0.0_f64, |m, &d| m.max(d));
        let l = cholesky.l_dirty();
        if (0..k).any(|i| l[(i, i)] * l[(i, i)] <= max_diag * PIVOT_TOLERANCE) {
            return None;
        }
    }

    let x = cholesky.solve(&DVector::from_iterator(k, b.iter().copied()));
    x.iter()
        .all(|v| v.is_finite())
        .then(|| x.iter().copied().collect())
}

fn training_objective(problem: &Problem, users: &Array2<f64>, items: &Array2<f64>, lambda: f64) -> f64 {
    let squared_error: f64 = problem
        .observations
        .iter()
        .map(|&(u, i, r)| (r - users.row(u).dot(&items.row(i))).powi(2))
        .sum();
    let user_penalty: f64 = problem
        .by_user
        .iter()
        .zip(users.rows())
        .map(|(obs, u)| obs.len() as f64 * u.dot(&u))
        .sum();
    let item_penalty: f64 = problem
        .by_item
        .iter()
        .zip(items.rows())
        .map(|(obs, v)| obs.len() as f64 * v.dot(&v))
        .sum();
    squared_error + lambda * (user_penalty + item_penalty)
}
