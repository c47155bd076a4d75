//! End-to-end training: split, search, holdout evaluation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::grid_search::{CvResult, GridSearch};
use super::metrics::RegressionMetrics;
use crate::data::LeagueDataset;
use crate::features::FeaturePipeline;
use crate::model::{RidgeParams, RidgeRegression};
use crate::{LabeledSample, League, LeagueError, ModelConfig, Result};

/// Everything needed to reproduce predictions from a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub trained_at: DateTime<Utc>,
    pub pipeline: FeaturePipeline,
    pub model: RidgeRegression,
    pub best_params: RidgeParams,
    pub cv_results: Vec<CvResult>,
    pub train_metrics: RegressionMetrics,
    pub holdout_metrics: RegressionMetrics,
    pub n_train: usize,
    pub n_test: usize,
}

impl ModelArtifact {
    /// Leagues the encoder saw during training
    pub fn leagues(&self) -> &[League] {
        self.pipeline.encoder.categories()
    }

    pub fn predict_samples(&self, samples: &[LabeledSample]) -> Result<Vec<f64>> {
        let x = self.pipeline.transform(samples)?;
        self.model.predict(&x)
    }

    /// Feature name and coefficient pairs in column order
    pub fn coefficients(&self) -> Vec<(String, f64)> {
        self.pipeline
            .feature_names()
            .into_iter()
            .zip(self.model.coefficients.iter().copied())
            .collect()
    }

    pub fn save(&self, path: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Saved model artifact to {}", path);
        Ok(())
    }

    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Err(LeagueError::NoModel);
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Runs the full training procedure on a labeled dataset
pub struct Trainer {
    config: ModelConfig,
}

impl Trainer {
    pub fn new(config: ModelConfig) -> Self {
        Trainer { config }
    }

    pub fn train(&self, dataset: &LeagueDataset) -> Result<ModelArtifact> {
        let (train, test) = dataset.train_test_split(self.config.test_fraction, self.config.seed)?;

        let outcome = GridSearch::from_config(&self.config).run(&train)?;

        let train_pred = predict(&outcome.pipeline, &outcome.model, train.samples())?;
        let train_metrics = RegressionMetrics::compute(&train.targets(), &train_pred)?;

        // Test rows are only ever transformed with the training fit
        let test_pred = predict(&outcome.pipeline, &outcome.model, test.samples())?;
        let holdout_metrics = RegressionMetrics::compute(&test.targets(), &test_pred)?;

        log::info!("Train:   {}", train_metrics);
        log::info!("Holdout: {}", holdout_metrics);

        Ok(ModelArtifact {
            trained_at: Utc::now(),
            pipeline: outcome.pipeline,
            model: outcome.model,
            best_params: outcome.best,
            cv_results: outcome.results,
            train_metrics,
            holdout_metrics,
            n_train: train.len(),
            n_test: test.len(),
        })
    }
}

fn predict(pipeline: &FeaturePipeline, model: &RidgeRegression, samples: &[LabeledSample]) -> Result<Vec<f64>> {
    let x = pipeline.transform(samples)?;
    model.predict(&x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Solver;
    use crate::training::synthetic_dataset;

    fn small_config() -> ModelConfig {
        ModelConfig {
            folds: 3,
            test_fraction: 0.25,
            seed: 3,
            alphas: vec![0.1, 10.0],
            solvers: vec![Solver::Cholesky, Solver::ConjugateGradient],
            ..crate::Config::default().model
        }
    }

    #[test]
    fn test_train_reports_holdout_metrics() {
        let dataset = synthetic_dataset(120, 21);
        let artifact = Trainer::new(small_config()).train(&dataset).unwrap();

        assert_eq!(artifact.n_train + artifact.n_test, 120);
        assert_eq!(artifact.n_test, 30);
        assert_eq!(artifact.cv_results.len(), 4);
        assert_eq!(artifact.holdout_metrics.count, 30);
        // Signal is nearly linear, so the fit explains most variance
        assert!(artifact.holdout_metrics.r2 > 0.9, "{}", artifact.holdout_metrics);
        assert_eq!(artifact.pipeline.scaler.n_samples, artifact.n_train);
        assert_eq!(artifact.leagues().len(), 3);
        assert_eq!(artifact.coefficients().len(), artifact.pipeline.width());
    }

    #[test]
    fn test_artifact_save_load() {
        let dataset = synthetic_dataset(60, 4);
        let artifact = Trainer::new(small_config()).train(&dataset).unwrap();

        let dir = std::env::temp_dir().join(format!("league-strength-model-{}", std::process::id()));
        let path = dir.join("ridge.json");
        let path = path.to_str().unwrap();
        artifact.save(path).unwrap();

        let loaded = ModelArtifact::load(path).unwrap();
        assert_eq!(loaded.best_params, artifact.best_params);
        assert_eq!(loaded.model, artifact.model);
        assert_eq!(
            loaded.predict_samples(dataset.samples()).unwrap(),
            artifact.predict_samples(dataset.samples()).unwrap()
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_artifact_is_no_model() {
        assert!(matches!(
            ModelArtifact::load("/nonexistent/league-strength/ridge.json"),
            Err(LeagueError::NoModel)
        ));
    }
}
