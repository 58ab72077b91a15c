//! # Data Loader Crate
//!
//! Loads MovieLens-style rating and movie files into an in-memory index.
//! The index is the rating store and item catalog for training and
//! recommendation.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Movie, Rating, RatingScale, DataIndex)
//! - **parser**: Parse `.csv` and `.dat` files, dropping malformed rows
//! - **index**: Build lookup indices and per-movie statistics
//! - **summary**: Descriptive statistics for a rating set
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{DataIndex, RatingScale};
//! use std::path::Path;
//!
//! let index = DataIndex::load_from_files(
//!     Path::new("data/ratings.csv"),
//!     Path::new("data/movies.csv"),
//!     RatingScale::default(),
//! )?;
//!
//! println!("{}", index.summary());
//! let watched = index.get_user_ratings(1);
//! ```

pub mod error;
pub mod index;
pub mod parser;
pub mod summary;
pub mod types;

pub use error::{DataLoadError, Result};
pub use summary::DatasetSummary;
pub use types::{
    DataIndex, IngestReport, Movie, MovieId, Rating, RatingScale, UserId,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn movie(id: MovieId, title: &str, genres: &[&str]) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            year: None,
            genres: genres.iter().map(|g| g.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_data_index_creation() {
        let index = DataIndex::new();
        assert_eq!(index.counts(), (0, 0, 0));
        assert_eq!(index.scale(), RatingScale::default());
    }

    #[test]
    fn test_insert_movie() {
        let mut index = DataIndex::new();
        index.insert_movie(movie(1, "Toy Story (1995)", &["Animation", "Comedy"]));

        let retrieved = index.get_movie(1).unwrap();
        assert_eq!(retrieved.title, "Toy Story (1995)");
        assert!(retrieved.has_genre("Comedy"));
        assert!(!retrieved.has_genre("comedy"));
    }

    #[test]
    fn test_insert_rating() {
        let mut index = DataIndex::new();
        index.insert_rating(Rating {
            user_id: 1,
            movie_id: 1193,
            rating: 5.0,
            timestamp: 978300760,
        });

        let user_ratings = index.get_user_ratings(1);
        assert_eq!(user_ratings.len(), 1);
        assert_eq!(user_ratings[0].rating, 5.0);
        assert_eq!(index.rating_count(1193), 1);
    }

    #[test]
    fn test_empty_queries() {
        let index = DataIndex::new();

        assert!(index.get_movie(999).is_none());
        assert!(index.get_user_ratings(999).is_empty());
        assert!(index.get_movie_ratings(999).is_empty());
        assert_eq!(index.rating_count(999), 0);
    }
}
