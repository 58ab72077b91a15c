//! Recommendation stage: candidate filtering and ranking.
//!
//! This crate provides:
//! - Filter trait and implementations for candidate filtering
//! - FilterPipeline for composing filters
//! - Recommender, which scores surviving candidates with a trained model
//!
//! ## Architecture
//! The pipeline processes candidates in stages:
//! 1. Every catalog movie starts as a candidate
//! 2. Filters remove unwanted candidates (already watched, too few
//!    ratings, wrong category)
//! 3. The model scores the rest, and the top K are returned
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{RecommendationRequest, Recommender};
//!
//! let recommender = Recommender::new(index.clone());
//! let request = RecommendationRequest::new(user_id, 25).with_min_rating_count(20);
//! for rec in recommender.recommend(&model, &request)? {
//!     println!("{} {:.3}", rec.title, rec.predicted_score);
//! }
//! ```

pub mod error;
pub mod filter_pipeline;
pub mod filters;
pub mod recommender;
pub mod traits;
pub mod types;
pub mod user_context;

pub use error::RecommendError;
pub use filter_pipeline::FilterPipeline;
pub use recommender::Recommender;
pub use traits::Filter;
pub use types::{Candidate, CandidateCounts, Recommendation, RecommendationRequest, UserContext};
pub use user_context::{build_user_context, candidate_counts, watched_by_rating};
