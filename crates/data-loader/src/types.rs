//! Core domain types for MovieLens-style rating data.
//!
//! This module defines the fundamental data structures used throughout the system:
//! - Type aliases for domain clarity (UserId, MovieId)
//! - Immutable `Rating` and `Movie` records
//! - The declared `RatingScale` of a dataset
//! - `DataIndex`, the in-memory rating store and item catalog

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

// =============================================================================
// Type Aliases
// =============================================================================
// These make the domain clearer and prevent mixing up user IDs with movie IDs

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for a movie (the catalog item)
pub type MovieId = u32;

// =============================================================================
// Movie-related Types
// =============================================================================

/// Represents a movie in the item catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Year extracted from title (e.g., "Toy Story (1995)")
    pub year: Option<u16>,
    /// Category labels parsed from the pipe-delimited genres field.
    ///
    /// Labels are kept verbatim ("Sci-Fi", "Children's") and compared with
    /// exact, case-sensitive matches.
    pub genres: BTreeSet<String>,
}

impl Movie {
    /// Returns true if the movie carries exactly this category label
    pub fn has_genre(&self, label: &str) -> bool {
        self.genres.contains(label)
    }
}

// =============================================================================
// Rating Type
// =============================================================================

/// Represents a single rating from a user for a movie
///
/// Small, copyable struct. Ratings are never mutated after ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Rating value inside the dataset's declared `RatingScale`
    pub rating: f64,
    /// Opaque ordinal (Unix seconds in the MovieLens files)
    pub timestamp: i64,
}

/// Inclusive bounds of the rating values a dataset may contain.
///
/// The same bounds are used to drop out-of-range rows during ingestion and
/// to label the dataset summary, so both always agree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingScale {
    pub min: f64,
    pub max: f64,
}

impl RatingScale {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// True if `value` is a finite number within the scale
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

impl Default for RatingScale {
    /// Half-star MovieLens scale, which also covers the 1-5 integer files
    fn default() -> Self {
        Self { min: 0.5, max: 5.0 }
    }
}

// =============================================================================
// Statistics and ingestion bookkeeping
// =============================================================================

/// Counts of rows accepted and dropped while loading the input files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub ratings_loaded: usize,
    pub ratings_dropped: usize,
    pub movies_loaded: usize,
    pub movies_dropped: usize,
}

impl IngestReport {
    pub fn total_dropped(&self) -> usize {
        self.ratings_dropped + self.movies_dropped
    }
}

// =============================================================================
// DataIndex - The Core In-Memory Store
// =============================================================================

/// Holds the full rating sequence, the item catalog and lookup indices.
///
/// `ratings` keeps the ingestion order, which the partitioner relies on for
/// reproducible splits. The per-user and per-movie maps give O(1) access
/// for the recommendation filters.
#[derive(Debug)]
pub struct DataIndex {
    // Primary data stores
    pub(crate) movies: HashMap<MovieId, Movie>,
    pub(crate) ratings: Vec<Rating>,

    // Rating indices for fast lookups
    /// All ratings made by each user
    pub(crate) user_ratings: HashMap<UserId, Vec<Rating>>,
    /// All ratings received by each movie
    pub(crate) movie_ratings: HashMap<MovieId, Vec<Rating>>,

    pub(crate) scale: RatingScale,
    pub(crate) ingest: IngestReport,
}

impl DataIndex {
    /// Creates a new, empty DataIndex using the default rating scale
    pub fn new() -> Self {
        Self::with_scale(RatingScale::default())
    }

    /// Creates a new, empty DataIndex for a dataset with the given scale
    pub fn with_scale(scale: RatingScale) -> Self {
        Self {
            movies: HashMap::new(),
            ratings: Vec::new(),
            user_ratings: HashMap::new(),
            movie_ratings: HashMap::new(),
            scale,
            ingest: IngestReport::default(),
        }
    }

    /// Get a movie by ID
    pub fn get_movie(&self, id: MovieId) -> Option<&Movie> {
        self.movies.get(&id)
    }

    /// The full rating sequence in ingestion order
    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    /// Get all ratings made by a user
    ///
    /// Returns an empty slice if user has no ratings
    pub fn get_user_ratings(&self, user_id: UserId) -> &[Rating] {
        self.user_ratings
            .get(&user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Get all ratings for a movie
    pub fn get_movie_ratings(&self, movie_id: MovieId) -> &[Rating] {
        self.movie_ratings
            .get(&movie_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of observed ratings for a movie across the full dataset
    pub fn rating_count(&self, movie_id: MovieId) -> u32 {
        self.get_movie_ratings(movie_id).len() as u32
    }

    /// All catalog movie IDs in ascending order
    pub fn get_all_movie_ids(&self) -> Vec<MovieId> {
        let mut ids: Vec<MovieId> = self.movies.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn scale(&self) -> RatingScale {
        self.scale
    }

    pub fn ingest_report(&self) -> IngestReport {
        self.ingest
    }

    /// Insert a movie into the catalog
    pub fn insert_movie(&mut self, movie: Movie) {
        self.movies.insert(movie.id, movie);
    }

    /// Insert a rating and update indices
    pub fn insert_rating(&mut self, rating: Rating) {
        self.ratings.push(rating);

        self.user_ratings
            .entry(rating.user_id)
            .or_default()
            .push(rating);

        self.movie_ratings
            .entry(rating.movie_id)
            .or_default()
            .push(rating);
    }

    /// Get counts for debugging/validation: (users, movies, ratings)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.user_ratings.len(), self.movies.len(), self.ratings.len())
    }
}

impl Default for DataIndex {
    fn default() -> Self {
        Self::new()
    }
}
