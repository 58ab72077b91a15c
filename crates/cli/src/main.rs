use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use data_loader::{DataIndex, RatingScale, UserId};
use engine::{PipelineConfig, RecommendationOrchestrator};
use model_store::{FsBlobStore, ModelId, ModelStore};
use pipeline::{Recommendation, candidate_counts, watched_by_rating};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use training::{
    CancellationToken, DuplicatePolicy, RefitScope, SearchReport, SplitFractions, TrialOutcome,
    format_rmse,
};

/// ReelRecs - ALS Movie Recommendation Engine
#[derive(Parser)]
#[command(name = "reel-recs")]
#[command(about = "Movie recommendations from alternating least squares matrix factorization", long_about = None)]
struct Cli {
    /// Path to a MovieLens dataset directory (ratings.csv/movies.csv or .dat)
    #[arg(short, long, default_value = "data/ml-latest-small")]
    data_dir: PathBuf,

    /// Lowest valid rating value
    #[arg(long, default_value = "0.5")]
    scale_min: f64,

    /// Highest valid rating value
    #[arg(long, default_value = "5.0")]
    scale_max: f64,

    /// JSON pipeline config; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print descriptive statistics of the dataset
    Summary,

    /// Search the hyperparameter grid, refit the winner and store it
    Train {
        /// Latent ranks to try, comma separated
        #[arg(long, value_delimiter = ',')]
        ranks: Option<Vec<usize>>,

        /// Regularization strengths to try, comma separated
        #[arg(long, value_delimiter = ',')]
        regs: Option<Vec<f64>>,

        /// Training, validation and testing fractions, comma separated
        #[arg(long, value_delimiter = ',')]
        split: Option<Vec<f64>>,

        /// Partition seed
        #[arg(long)]
        seed: Option<u64>,

        /// Factor initialization seed
        #[arg(long)]
        als_seed: Option<u64>,

        #[arg(long)]
        max_iter: Option<usize>,

        /// Relative objective change that stops training early
        #[arg(long)]
        tolerance: Option<f64>,

        /// Ratings the final model is refit on
        #[arg(long, value_enum)]
        refit: Option<RefitArg>,

        /// Handling of repeated (user, movie) ratings
        #[arg(long, value_enum)]
        duplicates: Option<DuplicatesArg>,

        /// Train grid points concurrently
        #[arg(long)]
        parallel_grid: bool,

        /// Directory holding stored models
        #[arg(long, default_value = "models")]
        model_dir: PathBuf,

        /// Store under this id instead of a generated one
        #[arg(long)]
        model_id: Option<String>,
    },

    /// Get movie recommendations for a user from a stored model
    Recommend {
        /// User ID to get recommendations for
        #[arg(long)]
        user_id: UserId,

        #[arg(long, default_value = "models")]
        model_dir: PathBuf,

        #[arg(long)]
        model_id: String,

        /// Number of recommendations to return
        #[arg(long)]
        top_k: Option<usize>,

        /// Minimum number of ratings a recommended movie needs
        #[arg(long, conflicts_with = "no_min_ratings")]
        min_ratings: Option<u32>,

        /// Disable the popularity floor
        #[arg(long)]
        no_min_ratings: bool,

        /// Only recommend movies carrying this genre label
        #[arg(long)]
        category: Option<String>,
    },

    /// Show a user's rated movies, best first
    User {
        #[arg(long)]
        user_id: UserId,

        /// Number of movies to list
        #[arg(long, default_value = "25")]
        limit: usize,
    },

    /// List the models in a model directory
    Models {
        #[arg(long, default_value = "models")]
        model_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RefitArg {
    TrainingAndValidation,
    FullDataset,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Summary => "summary",
            Commands::Train { .. } => "train",
            Commands::Recommend { .. } => "recommend",
            Commands::User { .. } => "user",
            Commands::Models { .. } => "models",
        }
    }
}

impl From<RefitArg> for RefitScope {
    fn from(arg: RefitArg) -> Self {
        match arg {
            RefitArg::TrainingAndValidation => RefitScope::TrainingAndValidation,
            RefitArg::FullDataset => RefitScope::FullDataset,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DuplicatesArg {
    KeepAll,
    LastWins,
    Average,
}

impl From<DuplicatesArg> for DuplicatePolicy {
    fn from(arg: DuplicatesArg) -> Self {
        match arg {
            DuplicatesArg::KeepAll => DuplicatePolicy::KeepAll,
            DuplicatesArg::LastWins => DuplicatePolicy::LastWins,
            DuplicatesArg::Average => DuplicatePolicy::Average,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Commands::Models { model_dir } = &cli.command {
        return handle_models(model_dir);
    }

    let data_index = load_dataset(&cli.data_dir, RatingScale::new(cli.scale_min, cli.scale_max))?;

    info!("Running {} command", cli.command.name());
    match cli.command {
        Commands::Summary => handle_summary(&data_index),
        Commands::Train {
            ranks,
            regs,
            split,
            seed,
            als_seed,
            max_iter,
            tolerance,
            refit,
            duplicates,
            parallel_grid,
            model_dir,
            model_id,
        } => {
            if let Some(ranks) = ranks {
                config.ranks = ranks;
            }
            if let Some(regs) = regs {
                config.regularizations = regs;
            }
            if let Some(split) = split {
                config.split = parse_split(&split)?;
            }
            if let Some(seed) = seed {
                config.split_seed = seed;
            }
            if let Some(als_seed) = als_seed {
                config.als_seed = als_seed;
            }
            if let Some(max_iter) = max_iter {
                config.max_iterations = max_iter;
            }
            if let Some(tolerance) = tolerance {
                config.tolerance = tolerance;
            }
            if let Some(refit) = refit {
                config.refit_scope = refit.into();
            }
            if let Some(duplicates) = duplicates {
                config.duplicate_policy = duplicates.into();
            }
            config.parallel_grid |= parallel_grid;

            let model_id = model_id.map(ModelId::parse).transpose()?;
            handle_train(data_index, config, &model_dir, model_id).await
        }
        Commands::Recommend {
            user_id,
            model_dir,
            model_id,
            top_k,
            min_ratings,
            no_min_ratings,
            category,
        } => {
            if let Some(top_k) = top_k {
                config.top_k = top_k;
            }
            if no_min_ratings {
                config.min_rating_count = None;
            } else if min_ratings.is_some() {
                config.min_rating_count = min_ratings;
            }
            if category.is_some() {
                config.category = category;
            }

            let model_id = ModelId::parse(model_id)?;
            handle_recommend(data_index, config, &model_dir, &model_id, user_id).await
        }
        Commands::User { user_id, limit } => handle_user(&data_index, user_id, limit),
        Commands::Models { .. } => Ok(()),
    }
}

fn load_dataset(data_dir: &Path, scale: RatingScale) -> Result<Arc<DataIndex>> {
    println!("Loading MovieLens dataset from {}...", data_dir.display());
    let start = Instant::now();
    let data_index = DataIndex::load_from_dir(data_dir, scale)
        .context("Failed to load MovieLens dataset")?;

    let ingest = data_index.ingest_report();
    println!(
        "{} Loaded dataset in {:?} ({} rows dropped)",
        "✓".green(),
        start.elapsed(),
        ingest.total_dropped()
    );
    Ok(Arc::new(data_index))
}

fn parse_split(values: &[f64]) -> Result<SplitFractions> {
    match values {
        [training, validation, testing] => Ok(SplitFractions::new(*training, *validation, *testing)),
        _ => bail!("--split takes exactly three fractions, got {}", values.len()),
    }
}

fn open_store(model_dir: &Path) -> Result<ModelStore> {
    let blobs = FsBlobStore::new(model_dir)
        .with_context(|| format!("Failed to open model directory {}", model_dir.display()))?;
    Ok(ModelStore::new(Arc::new(blobs)))
}

/// Handle the 'summary' command
fn handle_summary(data_index: &DataIndex) -> Result<()> {
    let summary = data_index.summary();
    println!("{}", "Dataset summary".bold().blue());
    println!("{}", summary);
    Ok(())
}

/// Handle the 'train' command
async fn handle_train(
    data_index: Arc<DataIndex>,
    config: PipelineConfig,
    model_dir: &Path,
    model_id: Option<ModelId>,
) -> Result<()> {
    let orchestrator = RecommendationOrchestrator::new(data_index, open_store(model_dir)?, config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, stopping after the current grid point".yellow());
            on_interrupt.cancel();
        }
    });

    let outcome = orchestrator.train(model_id, cancel).await?;
    info!("Training run stored model {}", outcome.model_id);

    println!(
        "Training: {}, validation: {}, test: {}",
        outcome.training_size, outcome.validation_size, outcome.testing_size
    );
    print_search_report(&outcome.report);
    println!(
        "{} Model stored as {}",
        "✓".green(),
        outcome.model_id.to_string().bold()
    );
    Ok(())
}

/// Handle the 'recommend' command
async fn handle_recommend(
    data_index: Arc<DataIndex>,
    config: PipelineConfig,
    model_dir: &Path,
    model_id: &ModelId,
    user_id: UserId,
) -> Result<()> {
    let orchestrator = RecommendationOrchestrator::new(data_index, open_store(model_dir)?, config)?;
    let request = orchestrator.default_request(user_id);

    let counts = candidate_counts(orchestrator.data_index(), user_id, request.min_rating_count);
    println!(
        "{}User {} has not watched {} of {} movies",
        "• ".cyan(),
        user_id,
        counts.unwatched,
        counts.catalog
    );
    if let (Some(floor), Some(below)) = (request.min_rating_count, counts.below_floor) {
        println!("{}{} movies have fewer than {} ratings", "• ".cyan(), below, floor);
    }

    info!("Recommending for user {} with model {}", user_id, model_id);
    let recommendations = orchestrator.recommend_from_store(model_id, request).await?;

    print_recommendations(user_id, &recommendations);
    Ok(())
}

/// Handle the 'user' command
fn handle_user(data_index: &DataIndex, user_id: UserId, limit: usize) -> Result<()> {
    let watched = watched_by_rating(data_index, user_id);
    if watched.is_empty() {
        return Err(anyhow!("User {} has no ratings", user_id));
    }

    println!("{}", format!("User ID: {}", user_id).bold().blue());
    let mean = watched.iter().map(|r| r.rating).sum::<f64>() / watched.len() as f64;
    println!("{}Number of ratings: {}", "• ".cyan(), watched.len());
    println!("{}Average rating: {:.2}", "• ".cyan(), mean);

    println!("Movies watched, highest rated first:");
    for rating in watched.iter().take(limit) {
        let title = data_index
            .get_movie(rating.movie_id)
            .map(|m| m.title.as_str())
            .unwrap_or("<not in catalog>");
        println!("  {:>4.1}  {} ({})", rating.rating, title, rating.movie_id);
    }
    Ok(())
}

/// Handle the 'models' command
fn handle_models(model_dir: &Path) -> Result<()> {
    let ids = open_store(model_dir)?.list()?;
    if ids.is_empty() {
        println!("No models in {}", model_dir.display());
    }
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

fn print_search_report(report: &SearchReport) {
    println!("{}", "Grid search:".bold().blue());
    println!("  {:>5}  {:>14}  {:>10}", "rank", "regularization", "RMSE");
    for trial in &report.trials {
        let hp = trial.hyperparameters();
        match trial {
            TrialOutcome::Evaluated(result) => println!(
                "  {:>5}  {:>14}  {:>10}",
                hp.rank,
                hp.regularization,
                format_rmse(result.rmse)
            ),
            TrialOutcome::Failed { reason, .. } => println!(
                "  {:>5}  {:>14}  {}",
                hp.rank,
                hp.regularization,
                format!("failed: {}", reason).red()
            ),
        }
    }

    let best = report.best_hyperparameters();
    println!(
        "{} Best: rank {}, regularization {} (validation RMSE {})",
        "✓".green(),
        best.rank,
        best.regularization,
        format_rmse(report.best_validation.rmse)
    );
    println!(
        "  Test RMSE of the selected model: {} ({} pairs skipped)",
        format_rmse(report.best_test.rmse),
        report.best_test.skipped
    );
    println!(
        "  Final model refit on {:?} in {:.2?}",
        report.refit_scope, report.refit_duration
    );
    println!(
        "  Test RMSE after refit: {}",
        format_rmse(report.final_test.rmse)
    );
}

/// Print a ranked table of recommendations
fn print_recommendations(user_id: UserId, recommendations: &[Recommendation]) {
    println!("{}", format!("Movie Recommendations for user {}:", user_id).bold().blue());
    if recommendations.is_empty() {
        println!("  (no movie passes the filters)");
    }
    for (i, rec) in recommendations.iter().enumerate() {
        let genres = rec.genres.iter().cloned().collect::<Vec<_>>().join(", ");
        println!(
            "{}. {} [{}] - Predicted: {:.3}",
            (i + 1).to_string().green(),
            rec.title,
            genres,
            rec.predicted_score
        );
    }
}
