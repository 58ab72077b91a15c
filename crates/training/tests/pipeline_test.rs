//! End-to-end training checks: partition, train, evaluate, search.

use data_loader::Rating;
use training::*;

fn rating(user_id: u32, movie_id: u32, value: f64) -> Rating {
    Rating {
        user_id,
        movie_id,
        rating: value,
        timestamp: 0,
    }
}

/// 40 users × 25 movies drawn from a rank-2 structure, ~70% observed
fn dataset() -> Vec<Rating> {
    let mut ratings = Vec::new();
    for user in 1..=40u32 {
        let a: f64 = [0.8, 1.2, 0.5][(user % 3) as usize];
        let b: f64 = [0.3, 1.0][(user % 2) as usize];
        for movie in 1..=25u32 {
            if (user * 31 + movie * 17) % 10 < 3 {
                continue;
            }
            let x: f64 = [2.0, 3.0, 1.5, 2.5][(movie % 4) as usize];
            let y: f64 = [1.0, 0.5, 1.5][(movie % 3) as usize];
            ratings.push(rating(user, movie, (a * x + b * y).clamp(0.5, 5.0)));
        }
    }
    ratings
}

fn trainer() -> AlsTrainer {
    AlsTrainer::new(AlsConfig {
        max_iterations: 10,
        ..AlsConfig::default()
    })
}

#[test]
fn test_small_scenario_scores_unobserved_pair() {
    let ratings = vec![rating(1, 1, 5.0), rating(1, 2, 3.0), rating(2, 1, 4.0)];
    let model = trainer()
        .train(&ratings, Hyperparameters::new(1, 0.1))
        .unwrap();

    // Rank-1 unit initial vectors make the run independent of the seed draw
    let prediction = model.predict(2, 2).unwrap();
    assert!((prediction - 2.405995).abs() < 1e-6, "{}", prediction);

    let fit = evaluate(&model, &ratings);
    assert_eq!(fit.scored, 3);
    assert!((fit.rmse.unwrap() - 0.072522).abs() < 1e-6, "{:?}", fit);

    let cold = evaluate(&model, &[rating(3, 1, 4.0)]);
    assert_eq!(cold.rmse, None);
    assert_eq!(cold.skipped, 1);
}

#[test]
fn test_training_fits_held_out_data() {
    let split = partition(&dataset(), SplitFractions::default(), 12345).unwrap();
    let model = trainer()
        .train(&split.training, Hyperparameters::new(2, 0.01))
        .unwrap();

    let train_eval = evaluate(&model, &split.training);
    let validation = evaluate(&model, &split.validation);
    assert!(train_eval.rmse.unwrap() < 0.1);
    assert!(validation.rmse.unwrap() < 0.5, "{:?}", validation);
}

#[test]
fn test_single_point_grid_matches_direct_training() {
    let split = partition(&dataset(), SplitFractions::default(), 7).unwrap();
    let hp = Hyperparameters::new(2, 0.05);

    let direct = evaluate(&trainer().train(&split.training, hp).unwrap(), &split.validation);
    let report = GridSearch::new(
        trainer(),
        SearchConfig {
            grid: SearchGrid::new(vec![2], vec![0.05]),
            ..SearchConfig::default()
        },
    )
    .run(&split, &CancellationToken::new())
    .unwrap();

    assert_eq!(report.best_validation, direct);
    assert_eq!(report.trials, vec![TrialOutcome::Evaluated(direct)]);
}

#[test]
fn test_full_dataset_refit_covers_testing_ratings() {
    let mut ratings = dataset();
    // A user that only appears once, most likely outside the training set
    ratings.push(rating(99, 1, 4.0));
    let split = partition(&ratings, SplitFractions::default(), 3).unwrap();

    let search = |scope| {
        GridSearch::new(
            trainer(),
            SearchConfig {
                grid: SearchGrid::new(vec![2], vec![0.1]),
                refit_scope: scope,
                parallel: false,
            },
        )
        .run(&split, &CancellationToken::new())
        .unwrap()
    };

    let full = search(RefitScope::FullDataset);
    assert_eq!(full.refit_scope, RefitScope::FullDataset);
    assert!(full.final_model.predict(99, 1).is_some());
    assert_eq!(full.final_test.skipped, 0);

    let partial = search(RefitScope::TrainingAndValidation);
    assert!(partial.final_test.scored <= full.final_test.scored);
}
