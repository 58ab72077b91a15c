//! Recommendation generator: score, filter and rank catalog movies.
//!
//! ## Algorithm
//! 1. Watched set = every movie the user rated in the full rating set
//! 2. Candidates = catalog movies not in the watched set
//! 3. Apply the popularity floor and category filters, if requested
//! 4. Score survivors with the model; movies without a factor vector or
//!    with a non-finite score drop out
//! 5. Sort by score descending, ties by movie id ascending, keep `top_k`
//!
//! Read-only: the same model, index and request always give the same list.

use crate::error::{RecommendError, Result};
use crate::filter_pipeline::FilterPipeline;
use crate::filters::{AlreadyWatchedFilter, CategoryFilter, MinimumRatingCountFilter};
use crate::types::{Candidate, Recommendation, RecommendationRequest};
use crate::user_context::build_user_context;
use data_loader::DataIndex;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, instrument};
use training::Model;

pub struct Recommender {
    data_index: Arc<DataIndex>,
}

impl Recommender {
    pub fn new(data_index: Arc<DataIndex>) -> Self {
        Self { data_index }
    }

    /// Filter chain for one request
    fn pipeline_for(&self, request: &RecommendationRequest) -> FilterPipeline {
        let mut pipeline = FilterPipeline::new().add_filter(AlreadyWatchedFilter);
        if let Some(min_count) = request.min_rating_count {
            pipeline = pipeline.add_filter(MinimumRatingCountFilter::new(
                self.data_index.clone(),
                min_count,
            ));
        }
        if let Some(category) = &request.category {
            pipeline = pipeline.add_filter(CategoryFilter::new(self.data_index.clone(), category.clone()));
        }
        pipeline
    }

    /// Top-`k` unwatched movies for `request.user_id`
    #[instrument(skip(self, model, request), fields(user_id = request.user_id, top_k = request.top_k))]
    pub fn recommend(&self, model: &Model, request: &RecommendationRequest) -> Result<Vec<Recommendation>> {
        if !model.user_factors().contains(request.user_id) {
            return Err(RecommendError::UnknownUser(request.user_id));
        }
        if request.top_k == 0 {
            return Ok(Vec::new());
        }

        let context = build_user_context(&self.data_index, request.user_id);
        let candidates: Vec<Candidate> = self
            .data_index
            .get_all_movie_ids()
            .into_iter()
            .map(Candidate::new)
            .collect();
        let total = candidates.len();

        let filtered = self.pipeline_for(request).apply(candidates, &context)?;

        let mut scored: Vec<Candidate> = filtered
            .par_iter()
            .filter_map(|candidate| {
                model
                    .predict(request.user_id, candidate.movie_id)
                    .filter(|score| score.is_finite())
                    .map(|score| Candidate::scored(candidate.movie_id, score))
            })
            .collect();
        debug!(
            "Scored {} of {} filtered candidates ({} in catalog)",
            scored.len(),
            filtered.len(),
            total
        );

        scored.sort_by(|a, b| {
            let (sa, sb) = (a.score.unwrap_or(f64::NEG_INFINITY), b.score.unwrap_or(f64::NEG_INFINITY));
            sb.total_cmp(&sa).then(a.movie_id.cmp(&b.movie_id))
        });
        scored.truncate(request.top_k);

        Ok(scored
            .into_iter()
            .filter_map(|candidate| {
                let movie = self.data_index.get_movie(candidate.movie_id)?;
                Some(Recommendation::from_movie(movie, candidate.score?))
            })
            .collect())
    }
}
