//! Types flowing through the recommendation stage.

use data_loader::{Movie, MovieId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A catalog movie still in the running for a user
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub movie_id: MovieId,
    /// Predicted rating, filled in once the candidate has been scored
    pub score: Option<f64>,
}

impl Candidate {
    pub fn new(movie_id: MovieId) -> Self {
        Self {
            movie_id,
            score: None,
        }
    }

    pub fn scored(movie_id: MovieId, score: f64) -> Self {
        Self {
            movie_id,
            score: Some(score),
        }
    }
}

/// What the filters need to know about the target user
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    pub user_id: UserId,
    /// Every movie the user rated anywhere in the full rating set
    pub watched_movies: HashSet<MovieId>,
}

impl UserContext {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            watched_movies: HashSet::new(),
        }
    }
}

/// How the catalog breaks down for one user before scoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCounts {
    pub catalog: usize,
    /// Catalog movies the user has not rated
    pub unwatched: usize,
    /// Catalog movies under the popularity floor, if one is set
    pub below_floor: Option<usize>,
}

/// One ranked recommendation with the movie's catalog metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub movie_id: MovieId,
    pub predicted_score: f64,
    pub title: String,
    pub year: Option<u16>,
    pub genres: BTreeSet<String>,
}

impl Recommendation {
    pub fn from_movie(movie: &Movie, predicted_score: f64) -> Self {
        Self {
            movie_id: movie.id,
            predicted_score,
            title: movie.title.clone(),
            year: movie.year,
            genres: movie.genres.clone(),
        }
    }
}

/// Parameters of one recommendation query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: UserId,
    pub top_k: usize,
    /// Drop movies with fewer ratings than this in the full rating set
    pub min_rating_count: Option<u32>,
    /// Keep only movies carrying this exact category label
    pub category: Option<String>,
}

impl RecommendationRequest {
    pub fn new(user_id: UserId, top_k: usize) -> Self {
        Self {
            user_id,
            top_k,
            min_rating_count: None,
            category: None,
        }
    }

    pub fn with_min_rating_count(mut self, count: u32) -> Self {
        self.min_rating_count = Some(count);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}
