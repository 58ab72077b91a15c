//! Integration tests for the recommendation stage.
//!
//! Trains a real model on a small rating set and checks the guarantees of
//! the ranked output.

use data_loader::{DataIndex, Movie, Rating};
use pipeline::filters::*;
use pipeline::{FilterPipeline, RecommendError, RecommendationRequest, Recommender, build_user_context};
use std::sync::Arc;
use training::{AlsConfig, AlsTrainer, Hyperparameters, Model};

fn create_test_setup() -> (Arc<DataIndex>, Model) {
    let mut index = DataIndex::new();

    for id in 1..=12u32 {
        let genres = match id % 3 {
            0 => vec!["Action", "Sci-Fi"],
            1 => vec!["Comedy"],
            _ => vec!["Drama", "Romance"],
        };
        index.insert_movie(Movie {
            id,
            title: format!("Movie {} ({})", id, 1990 + id),
            year: Some(1990 + id as u16),
            genres: genres.into_iter().map(String::from).collect(),
        });
    }

    // Users 1..=30 each rate a deterministic subset; movie popularity
    // decreases with id so the popularity floor has something to cut.
    for user_id in 1..=30u32 {
        for movie_id in 1..=12u32 {
            if (user_id + movie_id) % (movie_id / 3 + 2) != 0 {
                continue;
            }
            let rating = 1.0 + ((user_id * movie_id) % 9) as f64 / 2.0;
            index.insert_rating(Rating {
                user_id,
                movie_id,
                rating,
                timestamp: 0,
            });
        }
    }

    let model = AlsTrainer::new(AlsConfig::default())
        .train(index.ratings(), Hyperparameters::new(3, 0.1))
        .unwrap();

    (Arc::new(index), model)
}

#[test]
fn test_recommendations_exclude_watched_movies() {
    let (index, model) = create_test_setup();
    let recommender = Recommender::new(index.clone());

    for user_id in 1..=30u32 {
        let watched = build_user_context(&index, user_id).watched_movies;
        let recs = recommender
            .recommend(&model, &RecommendationRequest::new(user_id, 20))
            .unwrap();
        assert!(recs.iter().all(|r| !watched.contains(&r.movie_id)));
        assert_eq!(recs.len(), 12 - watched.len());
    }
}

#[test]
fn test_popularity_floor_is_respected() {
    let (index, model) = create_test_setup();
    let recs = Recommender::new(index.clone())
        .recommend(
            &model,
            &RecommendationRequest::new(1, 20).with_min_rating_count(8),
        )
        .unwrap();

    for rec in &recs {
        assert!(index.rating_count(rec.movie_id) >= 8);
    }
}

#[test]
fn test_ranking_is_descending_and_repeatable() {
    let (index, model) = create_test_setup();
    let recommender = Recommender::new(index);
    let request = RecommendationRequest::new(2, 5);

    let first = recommender.recommend(&model, &request).unwrap();
    let second = recommender.recommend(&model, &request).unwrap();
    assert_eq!(first, second);
    assert!(first.len() <= 5);
    assert!(first
        .windows(2)
        .all(|w| w[0].predicted_score >= w[1].predicted_score));
}

#[test]
fn test_category_recommendations() {
    let (index, model) = create_test_setup();
    let recs = Recommender::new(index)
        .recommend(&model, &RecommendationRequest::new(3, 20).with_category("Sci-Fi"))
        .unwrap();
    assert!(recs.iter().all(|r| r.genres.contains("Sci-Fi")));
}

#[test]
fn test_cold_start_user_is_unknown() {
    let (index, model) = create_test_setup();
    let result = Recommender::new(index).recommend(&model, &RecommendationRequest::new(999, 5));
    assert!(matches!(result, Err(RecommendError::UnknownUser(999))));
}

#[test]
fn test_manual_pipeline_composition() {
    let (index, _) = create_test_setup();
    let context = build_user_context(&index, 1);

    let pipeline = FilterPipeline::new()
        .add_filter(AlreadyWatchedFilter)
        .add_filter(MinimumRatingCountFilter::new(index.clone(), 5))
        .add_filter(CategoryFilter::new(index.clone(), "Comedy"));

    let candidates = index
        .get_all_movie_ids()
        .into_iter()
        .map(pipeline::Candidate::new)
        .collect();
    let filtered = pipeline.apply(candidates, &context).unwrap();

    for candidate in &filtered {
        assert!(!context.watched_movies.contains(&candidate.movie_id));
        assert!(index.rating_count(candidate.movie_id) >= 5);
        assert!(index.get_movie(candidate.movie_id).unwrap().has_genre("Comedy"));
    }
}
