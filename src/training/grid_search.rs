//! Cross-validated grid search over ridge hyperparameters

use serde::{Deserialize, Serialize};

use super::cv::KFold;
use super::metrics::RegressionMetrics;
use crate::data::LeagueDataset;
use crate::features::FeaturePipeline;
use crate::model::{FitOptions, RidgeParams, RidgeRegression, Solver};
use crate::{LeagueError, ModelConfig, Result};

/// Cartesian product of penalty strengths and solvers
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    pub alphas: Vec<f64>,
    pub solvers: Vec<Solver>,
}

impl ParamGrid {
    pub fn from_config(config: &ModelConfig) -> Self {
        ParamGrid {
            alphas: config.alphas.clone(),
            solvers: config.solvers.clone(),
        }
    }

    /// Every combination, alpha-major
    pub fn combinations(&self) -> Vec<RidgeParams> {
        self.alphas
            .iter()
            .flat_map(|&alpha| {
                self.solvers
                    .iter()
                    .map(move |&solver| RidgeParams { alpha, solver })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.alphas.len() * self.solvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cross-validation score of one combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvResult {
    pub params: RidgeParams,
    /// Validation MSE of every fold that fit
    pub fold_mse: Vec<f64>,
    /// None when any fold failed to fit or diverged
    pub mean_mse: Option<f64>,
    pub std_mse: Option<f64>,
}

/// Best combination refit on all training rows
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: RidgeParams,
    pub results: Vec<CvResult>,
    pub pipeline: FeaturePipeline,
    pub model: RidgeRegression,
}

impl SearchOutcome {
    /// Results ordered best first, ties kept in grid order
    pub fn ranked(&self) -> Vec<&CvResult> {
        let mut ranked: Vec<&CvResult> = self.results.iter().collect();
        ranked.sort_by(|a, b| {
            let a = a.mean_mse.unwrap_or(f64::INFINITY);
            let b = b.mean_mse.unwrap_or(f64::INFINITY);
            a.total_cmp(&b)
        });
        ranked
    }
}

/// Fold matrices, built once per fold and shared across combinations
struct PreparedFold {
    x_train: Vec<Vec<f64>>,
    y_train: Vec<f64>,
    x_val: Vec<Vec<f64>>,
    y_val: Vec<f64>,
}

pub struct GridSearch {
    grid: ParamGrid,
    kfold: KFold,
    options: FitOptions,
}

impl GridSearch {
    pub fn new(grid: ParamGrid, kfold: KFold, options: FitOptions) -> Self {
        GridSearch {
            grid,
            kfold,
            options,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(
            ParamGrid::from_config(config),
            KFold::new(config.folds, config.seed),
            FitOptions::from(config),
        )
    }

    pub fn run(&self, dataset: &LeagueDataset) -> Result<SearchOutcome> {
        if self.grid.is_empty() {
            return Err(LeagueError::InvalidParameter(
                "parameter grid is empty".to_string(),
            ));
        }

        let folds = self.prepare_folds(dataset)?;
        log::info!(
            "Grid search: {} combinations x {} folds on {} samples",
            self.grid.len(),
            folds.len(),
            dataset.len()
        );

        let mut results = Vec::with_capacity(self.grid.len());
        for params in self.grid.combinations() {
            let result = self.score(params, &folds);
            match result.mean_mse {
                Some(mse) => log::debug!("  {}: mean MSE {:.4}", params, mse),
                None => log::debug!("  {}: failed", params),
            }
            results.push(result);
        }

        // Strict comparison keeps the earlier combination on ties
        let mut best: Option<(RidgeParams, f64)> = None;
        for result in &results {
            if let Some(mse) = result.mean_mse {
                if best.map_or(true, |(_, best_mse)| mse < best_mse) {
                    best = Some((result.params, mse));
                }
            }
        }
        let best = best
            .map(|(params, _)| params)
            .ok_or_else(|| LeagueError::InvalidParameter("no parameter combination could be fit".to_string()))?;

        log::info!("Best parameters: {}", best);

        // Refit on every training row
        let pipeline = FeaturePipeline::fit(dataset.samples())?;
        let x = pipeline.transform(dataset.samples())?;
        let model = RidgeRegression::fit(&x, &dataset.targets(), best, &self.options)?;

        Ok(SearchOutcome {
            best,
            results,
            pipeline,
            model,
        })
    }

    fn prepare_folds(&self, dataset: &LeagueDataset) -> Result<Vec<PreparedFold>> {
        let mut prepared = Vec::new();
        for fold in self.kfold.split(dataset.len())? {
            let train = dataset.subset(&fold.train);
            let validation = dataset.subset(&fold.validation);

            // Fit on this fold's training rows only
            let pipeline = FeaturePipeline::fit(train.samples())?;
            prepared.push(PreparedFold {
                x_train: pipeline.transform(train.samples())?,
                y_train: train.targets(),
                x_val: pipeline.transform(validation.samples())?,
                y_val: validation.targets(),
            });
        }
        Ok(prepared)
    }

    fn score(&self, params: RidgeParams, folds: &[PreparedFold]) -> CvResult {
        let mut fold_mse = Vec::with_capacity(folds.len());
        for (i, fold) in folds.iter().enumerate() {
            let mse = RidgeRegression::fit(&fold.x_train, &fold.y_train, params, &self.options)
                .and_then(|model| model.predict(&fold.x_val))
                .and_then(|pred| RegressionMetrics::compute(&fold.y_val, &pred))
                .map(|m| m.mse);
            match mse {
                Ok(mse) if mse.is_finite() => fold_mse.push(mse),
                Ok(_) => log::warn!("{} diverged on fold {}", params, i + 1),
                Err(e) => log::warn!("{} failed on fold {}: {}", params, i + 1, e),
            }
        }

        let (mean_mse, std_mse) = if fold_mse.len() == folds.len() && !folds.is_empty() {
            let n = fold_mse.len() as f64;
            let mean = fold_mse.iter().sum::<f64>() / n;
            let var = fold_mse.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / n;
            (Some(mean), Some(var.sqrt()))
        } else {
            (None, None)
        };

        CvResult {
            params,
            fold_mse,
            mean_mse,
            std_mse,
        }
    }
}
