//! Popularity floor: drop movies with too few ratings.
//!
//! Counts come from the full rating set, not from whatever partition the
//! model was trained on.

use crate::traits::Filter;
use crate::types::{Candidate, UserContext};
use anyhow::Result;
use data_loader::DataIndex;
use std::sync::Arc;

/// Keeps candidates with at least `min_count` ratings.
pub struct MinimumRatingCountFilter {
    data_index: Arc<DataIndex>,
    min_count: u32,
}

impl MinimumRatingCountFilter {
    pub fn new(data_index: Arc<DataIndex>, min_count: u32) -> Self {
        Self {
            data_index,
            min_count,
        }
    }
}

impl Filter for MinimumRatingCountFilter {
    fn name(&self) -> &str {
        "MinimumRatingCountFilter"
    }

    fn apply(&self, candidates: Vec<Candidate>, _context: &UserContext) -> Result<Vec<Candidate>> {
        Ok(candidates
            .into_iter()
            .filter(|candidate| self.data_index.rating_count(candidate.movie_id) >= self.min_count)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Rating;

    fn index_with_counts(counts: &[(u32, u32)]) -> DataIndex {
        let mut index = DataIndex::new();
        for &(movie_id, n) in counts {
            for user_id in 0..n {
                index.insert_rating(Rating {
                    user_id,
                    movie_id,
                    rating: 4.0,
                    timestamp: 0,
                });
            }
        }
        index
    }

    #[test]
    fn test_minimum_rating_count_filter() {
        let index = Arc::new(index_with_counts(&[(1, 20), (2, 19), (3, 25)]));
        let candidates = [1, 2, 3, 4].map(Candidate::new).to_vec();

        let filter = MinimumRatingCountFilter::new(index, 20);
        let filtered = filter.apply(candidates, &UserContext::new(1)).unwrap();

        let ids: Vec<u32> = filtered.iter().map(|c| c.movie_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_zero_floor_keeps_unrated_movies() {
        let index = Arc::new(index_with_counts(&[]));
        let filter = MinimumRatingCountFilter::new(index, 0);
        let filtered = filter
            .apply(vec![Candidate::new(7)], &UserContext::new(1))
            .unwrap();
        assert_eq!(filtered.len(), 1);
    }
}
