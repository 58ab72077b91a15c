//! Descriptive statistics over a rating set.
//!
//! Read-only reporting: the summary renders what the index holds and never
//! feeds back into training.

use crate::types::{DataIndex, Rating, RatingScale};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Summary of a rating dataset, mirroring what an analyst prints before
/// modeling: size, cardinalities, moments and the rating distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub scale: RatingScale,
    pub rating_count: usize,
    pub distinct_users: usize,
    pub distinct_rated_movies: usize,
    pub catalog_size: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Sample standard deviation; undefined below two ratings
    pub stddev: Option<f64>,
    /// (rating value, count), ascending by value
    pub distribution: Vec<(f64, usize)>,
    /// Mean number of ratings per rated movie
    pub mean_ratings_per_movie: Option<f64>,
}

impl DatasetSummary {
    /// Summarize an arbitrary rating slice (a partition, for instance).
    pub fn from_ratings(ratings: &[Rating], scale: RatingScale, catalog_size: usize) -> Self {
        let n = ratings.len();
        let users: HashSet<_> = ratings.iter().map(|r| r.user_id).collect();
        let movies: HashSet<_> = ratings.iter().map(|r| r.movie_id).collect();

        let mean = (n > 0).then(|| ratings.iter().map(|r| r.rating).sum::<f64>() / n as f64);
        let min = ratings.iter().map(|r| r.rating).reduce(f64::min);
        let max = ratings.iter().map(|r| r.rating).reduce(f64::max);
        let stddev = match mean {
            Some(mean) if n > 1 => {
                let ss: f64 = ratings.iter().map(|r| (r.rating - mean).powi(2)).sum();
                Some((ss / (n - 1) as f64).sqrt())
            }
            _ => None,
        };

        // f64 is not Ord; the bit pattern is a stable key for finite, non-negative values
        let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
        for rating in ratings {
            *counts.entry(rating.rating.to_bits()).or_insert(0) += 1;
        }
        let mut distribution: Vec<(f64, usize)> = counts
            .into_iter()
            .map(|(bits, count)| (f64::from_bits(bits), count))
            .collect();
        distribution.sort_by(|a, b| a.0.total_cmp(&b.0));

        Self {
            scale,
            rating_count: n,
            distinct_users: users.len(),
            distinct_rated_movies: movies.len(),
            catalog_size,
            mean,
            min,
            max,
            stddev,
            distribution,
            mean_ratings_per_movie: (!movies.is_empty()).then(|| n as f64 / movies.len() as f64),
        }
    }
}

impl DataIndex {
    /// Summarize the full dataset held by this index
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary::from_ratings(&self.ratings, self.scale, self.movies.len())
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.4}", v))
        .unwrap_or_else(|| "n/a".to_string())
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of ratings: {}", self.rating_count)?;
        writeln!(f, "Number of distinct users: {}", self.distinct_users)?;
        writeln!(f, "Number of rated distinct movies: {}", self.distinct_rated_movies)?;
        writeln!(f, "Total number of movies: {}", self.catalog_size)?;
        writeln!(f, "Rating scale: [{}, {}]", self.scale.min, self.scale.max)?;
        writeln!(
            f,
            "mean {}  min {}  max {}  stddev {}",
            fmt_opt(self.mean),
            fmt_opt(self.min),
            fmt_opt(self.max),
            fmt_opt(self.stddev)
        )?;
        writeln!(f, "Distribution of ratings:")?;
        for (value, count) in &self.distribution {
            writeln!(f, "  {:>4}: {}", value, count)?;
        }
        write!(
            f,
            "Average number of ratings per movie: {}",
            fmt_opt(self.mean_ratings_per_movie)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(user_id: u32, movie_id: u32, value: f64) -> Rating {
        Rating {
            user_id,
            movie_id,
            rating: value,
            timestamp: 0,
        }
    }

    #[test]
    fn test_summary_statistics() {
        let ratings = vec![
            rating(1, 1, 4.0),
            rating(1, 2, 2.0),
            rating(2, 1, 4.0),
            rating(3, 3, 5.0),
        ];
        let summary = DatasetSummary::from_ratings(&ratings, RatingScale::default(), 10);

        assert_eq!(summary.rating_count, 4);
        assert_eq!(summary.distinct_users, 3);
        assert_eq!(summary.distinct_rated_movies, 3);
        assert_eq!(summary.catalog_size, 10);
        assert_eq!(summary.mean, Some(3.75));
        assert_eq!(summary.min, Some(2.0));
        assert_eq!(summary.max, Some(5.0));
        // squared deviations: 0.0625 + 3.0625 + 0.0625 + 1.5625 = 4.75, / 3
        assert!((summary.stddev.unwrap() - (4.75f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(summary.distribution, vec![(2.0, 1), (4.0, 2), (5.0, 1)]);
        assert!((summary.mean_ratings_per_movie.unwrap() - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_summary() {
        let summary = DatasetSummary::from_ratings(&[], RatingScale::default(), 0);
        assert_eq!(summary.rating_count, 0);
        assert!(summary.mean.is_none());
        assert!(summary.stddev.is_none());
        assert!(summary.to_string().contains("n/a"));
    }
}
