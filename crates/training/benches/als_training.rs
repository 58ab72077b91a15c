//! Benchmarks for ALS training and evaluation
//!
//! Run with: cargo bench --package training
//!
//! Uses a synthetic rating set so the benchmark runs without the MovieLens files.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use data_loader::Rating;
use training::{AlsConfig, AlsTrainer, Hyperparameters, SplitFractions, evaluate, partition};

fn synthetic_ratings(users: u32, movies: u32) -> Vec<Rating> {
    let mut ratings = Vec::new();
    for user in 0..users {
        for movie in 0..movies {
            // roughly 5% density
            if (user.wrapping_mul(2654435761) ^ movie.wrapping_mul(40503)) % 20 != 0 {
                continue;
            }
            let value = 1.0 + ((user % 5) as f64 + (movie % 7) as f64) * 4.0 / 10.0;
            ratings.push(Rating {
                user_id: user,
                movie_id: movie,
                rating: value.min(5.0),
                timestamp: 0,
            });
        }
    }
    ratings
}

fn bench_als_train(c: &mut Criterion) {
    let ratings = synthetic_ratings(2000, 1500);
    let trainer = AlsTrainer::new(AlsConfig::default());

    let mut group = c.benchmark_group("als_train");
    group.sample_size(10);
    for rank in [4, 12] {
        group.bench_function(format!("rank_{}", rank), |b| {
            b.iter(|| {
                let model = trainer
                    .train(black_box(&ratings), Hyperparameters::new(rank, 0.1))
                    .unwrap();
                black_box(model)
            })
        });
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let ratings = synthetic_ratings(2000, 1500);
    let split = partition(&ratings, SplitFractions::default(), 12345).unwrap();
    let model = AlsTrainer::new(AlsConfig::default())
        .train(&split.training, Hyperparameters::new(8, 0.1))
        .unwrap();

    c.bench_function("evaluate_validation", |b| {
        b.iter(|| black_box(evaluate(&model, black_box(&split.validation))))
    });
}

criterion_group!(benches, bench_als_train, bench_evaluate);
criterion_main!(benches);
