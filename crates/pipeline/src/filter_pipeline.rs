//! The FilterPipeline chains filters together using the builder pattern.

use crate::traits::Filter;
use crate::types::{Candidate, UserContext};
use anyhow::Result;
use tracing::debug;

/// Chains multiple filters together into a processing pipeline.
///
/// ## Usage
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(AlreadyWatchedFilter)
///     .add_filter(MinimumRatingCountFilter::new(index.clone(), 20))
///     .add_filter(CategoryFilter::new(index.clone(), "Comedy"));
///
/// let filtered = pipeline.apply(candidates, &context)?;
/// ```
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline (builder pattern).
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Names of the configured filters, in application order
    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Apply all filters in sequence, stopping at the first failure.
    pub fn apply(&self, candidates: Vec<Candidate>, context: &UserContext) -> Result<Vec<Candidate>> {
        let mut current = candidates;
        for filter in &self.filters {
            let before = current.len();
            current = filter.apply(current, context)?;
            debug!(
                "Filter {} kept {} of {} candidates",
                filter.name(),
                current.len(),
                before
            );
        }
        Ok(current)
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::AlreadyWatchedFilter;

    struct FailingFilter;

    impl Filter for FailingFilter {
        fn name(&self) -> &str {
            "FailingFilter"
        }

        fn apply(&self, _: Vec<Candidate>, _: &UserContext) -> Result<Vec<Candidate>> {
            anyhow::bail!("lookup failed")
        }
    }

    #[test]
    fn test_empty_pipeline() {
        let pipeline = FilterPipeline::new();
        let context = UserContext::new(1);

        let candidates = vec![Candidate::new(1), Candidate::new(2)];

        let filtered = pipeline.apply(candidates, &context).unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_single_filter() {
        let mut context = UserContext::new(1);
        context.watched_movies.insert(1);

        let pipeline = FilterPipeline::new().add_filter(AlreadyWatchedFilter);
        assert_eq!(pipeline.filter_names(), vec!["AlreadyWatchedFilter"]);

        let filtered = pipeline
            .apply(vec![Candidate::new(1), Candidate::new(2)], &context)
            .unwrap();
        assert_eq!(filtered, vec![Candidate::new(2)]);
    }

    #[test]
    fn test_filter_error_propagates() {
        let pipeline = FilterPipeline::new()
            .add_filter(AlreadyWatchedFilter)
            .add_filter(FailingFilter);
        let result = pipeline.apply(vec![Candidate::new(1)], &UserContext::new(1));
        assert!(result.is_err());
    }
}
