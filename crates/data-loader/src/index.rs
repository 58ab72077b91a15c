//! DataIndex building and indexing logic.
//!
//! Builds the DataIndex from parsed files:
//! - Primary stores (catalog, ordered rating sequence)
//! - Per-user and per-movie rating indices

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use std::path::Path;
use tracing::info;

impl DataIndex {
    /// Load a rating file and a movie file into a new index.
    ///
    /// Steps:
    /// 1. Parse both files in parallel (malformed rows are dropped)
    /// 2. Build the catalog and rating indices
    /// 3. Validate data integrity
    pub fn load_from_files(
        ratings_path: &Path,
        movies_path: &Path,
        scale: RatingScale,
    ) -> Result<Self> {
        info!(
            "Loading ratings from {:?} and movies from {:?}",
            ratings_path, movies_path
        );

        // Rayon's `join` runs both closures in parallel
        let (ratings, movies) = rayon::join(
            || parser::parse_ratings(ratings_path, scale),
            || parser::parse_movies(movies_path),
        );
        let ratings = ratings?;
        let movies = movies?;

        let mut index = DataIndex::with_scale(scale);
        index.ingest = IngestReport {
            ratings_loaded: ratings.records.len(),
            ratings_dropped: ratings.dropped,
            movies_loaded: movies.records.len(),
            movies_dropped: movies.dropped,
        };

        for movie in movies.records {
            index.insert_movie(movie);
        }
        for rating in ratings.records {
            index.insert_rating(rating);
        }

        index.validate()?;

        let (users, movies, ratings) = index.counts();
        info!(
            "Loaded {} ratings from {} users over {} catalog movies ({} rows dropped)",
            ratings,
            users,
            movies,
            index.ingest.total_dropped()
        );
        Ok(index)
    }

    /// Load `ratings.csv`/`movies.csv` from a directory, falling back to the
    /// MovieLens 1M `ratings.dat`/`movies.dat` pair.
    pub fn load_from_dir(data_dir: &Path, scale: RatingScale) -> Result<Self> {
        let csv_ratings = data_dir.join("ratings.csv");
        if csv_ratings.exists() {
            return Self::load_from_files(&csv_ratings, &data_dir.join("movies.csv"), scale);
        }
        Self::load_from_files(
            &data_dir.join("ratings.dat"),
            &data_dir.join("movies.dat"),
            scale,
        )
    }

    /// Validate data integrity
    ///
    /// Every stored rating must lie inside the declared scale. Ratings that
    /// reference movies missing from the catalog are allowed: they still
    /// train the model, they just can never be recommended.
    pub fn validate(&self) -> Result<()> {
        if !(self.scale.min.is_finite() && self.scale.max.is_finite())
            || self.scale.min > self.scale.max
        {
            return Err(DataLoadError::ValidationError(format!(
                "invalid rating scale [{}, {}]",
                self.scale.min, self.scale.max
            )));
        }
        if let Some(rating) = self.ratings.iter().find(|r| !self.scale.contains(r.rating)) {
            return Err(DataLoadError::InvalidValue {
                field: "rating".to_string(),
                value: rating.rating.to_string(),
            });
        }
        Ok(())
    }
}
