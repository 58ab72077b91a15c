//! Full run from MovieLens-style files: load, train, persist, reload,
//! recommend.

use std::fmt::Write as _;
use std::sync::Arc;

use data_loader::{DataIndex, RatingScale};
use engine::{PipelineConfig, RecommendationOrchestrator};
use model_store::{FsBlobStore, ModelId, ModelStore};
use training::CancellationToken;

const GENRES: [&str; 3] = ["Action", "Comedy", "Drama"];

fn write_dataset(dir: &std::path::Path) {
    let mut movies = String::from("movieId,title,genres\n");
    for id in 1..=15u32 {
        let genre = GENRES[(id % 3) as usize];
        writeln!(movies, "{},\"Film {}, The ({})\",{}|IMAX", id, id, 1980 + id, genre).unwrap();
    }

    let mut ratings = String::from("userId,movieId,rating,timestamp\n");
    for user in 1..=40u32 {
        for movie in 1..=15u32 {
            if (user * 7 + movie * 3) % 5 == 0 {
                continue;
            }
            let taste = if (user % 3) == (movie % 3) { 4.5 } else { 2.0 };
            let nudge = ((user + movie) % 3) as f64 * 0.5;
            writeln!(ratings, "{},{},{},{}", user, movie, taste - nudge, 964982703 + movie).unwrap();
        }
    }

    std::fs::write(dir.join("movies.csv"), movies).unwrap();
    std::fs::write(dir.join("ratings.csv"), ratings).unwrap();
}

fn config() -> PipelineConfig {
    PipelineConfig {
        ranks: vec![2, 3],
        regularizations: vec![0.05, 0.1],
        max_iterations: 8,
        top_k: 4,
        min_rating_count: Some(5),
        ..PipelineConfig::default()
    }
}

#[tokio::test]
async fn test_train_then_recommend_from_disk() {
    let data_dir = tempfile::tempdir().unwrap();
    let model_dir = tempfile::tempdir().unwrap();
    write_dataset(data_dir.path());

    let index = Arc::new(DataIndex::load_from_dir(data_dir.path(), RatingScale::default()).unwrap());
    let store = ModelStore::new(Arc::new(FsBlobStore::new(model_dir.path()).unwrap()));
    let orchestrator = RecommendationOrchestrator::new(index.clone(), store, config()).unwrap();

    let id = ModelId::parse("latest").unwrap();
    let outcome = orchestrator
        .train(Some(id.clone()), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.report.trials.len(), 4);
    assert!(outcome.report.final_test.rmse.is_some());
    assert!(model_dir.path().join("latest.json").exists());

    // A fresh orchestrator over the same directory sees the stored model
    let reopened = RecommendationOrchestrator::new(
        index.clone(),
        ModelStore::new(Arc::new(FsBlobStore::new(model_dir.path()).unwrap())),
        config(),
    )
    .unwrap();

    let request = reopened.default_request(3).with_category("Comedy");
    let recs = reopened.recommend_from_store(&id, request).await.unwrap();

    let watched: Vec<u32> = index.get_user_ratings(3).iter().map(|r| r.movie_id).collect();
    assert!(!recs.is_empty());
    assert!(recs.len() <= 4);
    for rec in &recs {
        assert!(!watched.contains(&rec.movie_id));
        assert!(rec.genres.contains("Comedy"));
        assert!(index.rating_count(rec.movie_id) >= 5);
    }
    for pair in recs.windows(2) {
        assert!(pair[0].predicted_score >= pair[1].predicted_score);
    }
}
