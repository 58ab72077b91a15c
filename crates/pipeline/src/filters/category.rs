//! Filter to keep only movies carrying one category label.
//!
//! Labels match exactly and case-sensitively ("Sci-Fi", not "sci-fi").
//! Movies missing from the catalog never match.

use crate::traits::Filter;
use crate::types::{Candidate, UserContext};
use anyhow::Result;
use data_loader::DataIndex;
use std::sync::Arc;

pub struct CategoryFilter {
    data_index: Arc<DataIndex>,
    category: String,
}

impl CategoryFilter {
    pub fn new(data_index: Arc<DataIndex>, category: impl Into<String>) -> Self {
        Self {
            data_index,
            category: category.into(),
        }
    }
}

impl Filter for CategoryFilter {
    fn name(&self) -> &str {
        "CategoryFilter"
    }

    fn apply(&self, candidates: Vec<Candidate>, _context: &UserContext) -> Result<Vec<Candidate>> {
        Ok(candidates
            .into_iter()
            .filter(|candidate| {
                self.data_index
                    .get_movie(candidate.movie_id)
                    .is_some_and(|movie| movie.has_genre(&self.category))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Movie;

    fn create_test_index() -> DataIndex {
        let mut index = DataIndex::new();
        for (id, genres) in [
            (1, vec!["Action", "Sci-Fi"]),
            (2, vec!["Comedy"]),
            (3, vec!["Comedy", "Romance"]),
        ] {
            index.insert_movie(Movie {
                id,
                title: format!("Movie {}", id),
                year: None,
                genres: genres.into_iter().map(String::from).collect(),
            });
        }
        index
    }

    #[test]
    fn test_category_filter() {
        let index = Arc::new(create_test_index());
        let candidates = [1, 2, 3, 4].map(Candidate::new).to_vec();

        let filtered = CategoryFilter::new(index, "Comedy")
            .apply(candidates, &UserContext::new(1))
            .unwrap();
        let ids: Vec<u32> = filtered.iter().map(|c| c.movie_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_category_match_is_exact() {
        let index = Arc::new(create_test_index());
        let filtered = CategoryFilter::new(index, "sci-fi")
            .apply(vec![Candidate::new(1)], &UserContext::new(1))
            .unwrap();
        assert!(filtered.is_empty());
    }
}
