//! Filter to remove movies the user has already rated.
//!
//! This is the first filter in the pipeline: there's no point in
//! recommending movies the user has already seen.

use crate::traits::Filter;
use crate::types::{Candidate, UserContext};
use anyhow::Result;

/// Removes candidates that appear in `UserContext::watched_movies`.
pub struct AlreadyWatchedFilter;

impl Filter for AlreadyWatchedFilter {
    fn name(&self) -> &str {
        "AlreadyWatchedFilter"
    }

    fn apply(&self, candidates: Vec<Candidate>, context: &UserContext) -> Result<Vec<Candidate>> {
        Ok(candidates
            .into_iter()
            .filter(|candidate| !context.watched_movies.contains(&candidate.movie_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_watched_filter() {
        let mut context = UserContext::new(1);
        context.watched_movies.insert(100);
        context.watched_movies.insert(200);

        let candidates = [100, 101, 200, 300].map(Candidate::new).to_vec();

        let filtered = AlreadyWatchedFilter.apply(candidates, &context).unwrap();
        let ids: Vec<u32> = filtered.iter().map(|c| c.movie_id).collect();
        assert_eq!(ids, vec![101, 300]);
    }
}
