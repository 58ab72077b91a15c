//! # Recommendation Orchestrator
//!
//! Coordinates the offline modeling run and the recommendation queries:
//! 1. Partition the full rating set (seeded)
//! 2. Grid-search hyperparameters on training/validation
//! 3. Refit the winner and report its test RMSE
//! 4. Persist the final model in the model store
//! 5. Serve top-K recommendations from a stored or in-memory model
//!
//! Partitioning, training and scoring are CPU-bound and run on tokio's
//! blocking pool via `spawn_blocking`; the async surface only coordinates.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use data_loader::{DataIndex, UserId};
use model_store::{ModelId, ModelStore};
use pipeline::{Recommendation, RecommendationRequest, Recommender};
use training::{
    AlsTrainer, CancellationToken, GridSearch, Model, SearchReport, format_rmse, partition,
};

use crate::config::PipelineConfig;

/// Result of one full training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model_id: ModelId,
    pub training_size: usize,
    pub validation_size: usize,
    pub testing_size: usize,
    pub report: SearchReport,
}

/// Main orchestrator wiring the data index, trainer, recommender and store
#[derive(Clone)]
pub struct RecommendationOrchestrator {
    data_index: Arc<DataIndex>,
    store: ModelStore,
    config: Arc<PipelineConfig>,
}

impl RecommendationOrchestrator {
    /// Create an orchestrator; the config is validated up front
    pub fn new(data_index: Arc<DataIndex>, store: ModelStore, config: PipelineConfig) -> Result<Self> {
        config.validate().context("Invalid pipeline configuration")?;
        Ok(Self {
            data_index,
            store,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn data_index(&self) -> &Arc<DataIndex> {
        &self.data_index
    }

    /// Run partition, search and refit, then save the final model.
    ///
    /// The model is stored under `model_id` when given, otherwise under a
    /// generated id.
    pub async fn train(
        &self,
        model_id: Option<ModelId>,
        cancel: CancellationToken,
    ) -> Result<TrainingOutcome> {
        let start_time = Instant::now();

        let data_index = self.data_index.clone();
        let config = self.config.clone();
        let (split, report) = tokio::task::spawn_blocking(move || -> Result<_> {
            let split = partition(data_index.ratings(), config.split, config.split_seed)
                .context("Failed to partition ratings")?;
            let search = GridSearch::new(
                AlsTrainer::new(config.als_config()),
                config.search_config(),
            );
            let report = search
                .run(&split, &cancel)
                .context("Hyperparameter search failed")?;
            Ok((split, report))
        })
        .await
        .context("Training task panicked")??;

        let best = report.best_hyperparameters();
        info!(
            "Selected rank {} and regularization {} (validation RMSE {}, test RMSE {})",
            best.rank,
            best.regularization,
            format_rmse(report.best_validation.rmse),
            format_rmse(report.best_test.rmse)
        );

        let model_id = self.save_model(model_id, report.final_model.clone()).await?;

        info!(
            "Training finished in {:.2?}; final model stored as {}",
            start_time.elapsed(),
            model_id
        );

        Ok(TrainingOutcome {
            model_id,
            training_size: split.training.len(),
            validation_size: split.validation.len(),
            testing_size: split.testing.len(),
            report,
        })
    }

    /// Persist a model, returning the id it was stored under
    pub async fn save_model(&self, model_id: Option<ModelId>, model: Model) -> Result<ModelId> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || match model_id {
            Some(id) => store.save_as(&id, &model).map(|_| id),
            None => store.save(&model),
        })
        .await
        .context("Model save task panicked")?
        .context("Failed to save model")
    }

    pub async fn load_model(&self, model_id: &ModelId) -> Result<Arc<Model>> {
        let store = self.store.clone();
        let id = model_id.clone();
        let model = tokio::task::spawn_blocking(move || store.load(&id))
            .await
            .context("Model load task panicked")?
            .with_context(|| format!("Failed to load model {}", model_id))?;
        Ok(Arc::new(model))
    }

    /// Request built from the configured top-K, popularity floor and category
    pub fn default_request(&self, user_id: UserId) -> RecommendationRequest {
        RecommendationRequest {
            user_id,
            top_k: self.config.top_k,
            min_rating_count: self.config.min_rating_count,
            category: self.config.category.clone(),
        }
    }

    /// Main entry point: ranked recommendations for one user
    pub async fn get_recommendations(
        &self,
        model: Arc<Model>,
        request: RecommendationRequest,
    ) -> Result<Vec<Recommendation>> {
        let start_time = Instant::now();
        let user_id = request.user_id;

        let recommender = Recommender::new(self.data_index.clone());
        let recommendations =
            tokio::task::spawn_blocking(move || recommender.recommend(&model, &request))
                .await
                .context("Recommendation task panicked")?
                .with_context(|| format!("Failed to recommend for user {}", user_id))?;

        info!(
            "Selected top {} recommendations for user {} in {:.2?}",
            recommendations.len(),
            user_id,
            start_time.elapsed()
        );
        Ok(recommendations)
    }

    /// Load a stored model and recommend from it
    pub async fn recommend_from_store(
        &self,
        model_id: &ModelId,
        request: RecommendationRequest,
    ) -> Result<Vec<Recommendation>> {
        let model = self.load_model(model_id).await?;
        self.get_recommendations(model, request).await
    }
}
