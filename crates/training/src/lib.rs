//! # Training Crate
//!
//! Model fitting and selection for the recommender.
//!
//! ## Components
//!
//! - **split**: Deterministic train/validation/test partitioning
//! - **als**: Alternating least squares trainer
//! - **model**: Hyperparameters, factor matrices and the trained `Model`
//! - **evaluator**: Held-out RMSE with cold-start skipping
//! - **search**: Grid search with refit of the winning configuration
//!
//! ## Example Usage
//!
//! ```ignore
//! use training::{
//!     AlsConfig, AlsTrainer, CancellationToken, GridSearch, SearchConfig, SplitFractions,
//! };
//!
//! let split = training::partition(index.ratings(), SplitFractions::default(), 12345)?;
//! let search = GridSearch::new(AlsTrainer::new(AlsConfig::default()), SearchConfig::default());
//! let report = search.run(&split, &CancellationToken::new())?;
//!
//! let model = report.final_model;
//! println!("{:?}", model.predict(1, 1193));
//! ```

pub mod als;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod search;
pub mod split;

pub use als::{AlsConfig, AlsTrainer, DuplicatePolicy};
pub use error::{Result, TrainingError};
pub use evaluator::{EvaluationResult, compare_rmse, evaluate, select_best};
pub use model::{FactorMatrix, Hyperparameters, Model, TrainingSummary};
pub use search::{
    CancellationToken, GridSearch, RefitScope, SearchConfig, SearchGrid, SearchReport,
    TrialOutcome, format_rmse,
};
pub use split::{Partition, SplitFractions, partition};
