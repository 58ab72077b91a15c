//! Engine crate for the ALS movie recommender.
//!
//! Wires the data index, the training stage, the recommendation stage and
//! the model store behind one async orchestrator, configured by a single
//! `PipelineConfig`.

pub mod config;
pub mod orchestrator;

pub use config::{ConfigError, PipelineConfig};
pub use orchestrator::{RecommendationOrchestrator, TrainingOutcome};
