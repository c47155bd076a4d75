//! Column transformer: standardized stats followed by one-hot league

use super::{OneHotEncoder, StandardScaler};
use crate::{LabeledSample, League, LeagueError, PlayerSeason, Result, StatLine};
use serde::{Deserialize, Serialize};

/// Anything that carries a stat line and a league
pub trait FeatureSource {
    fn stats(&self) -> &StatLine;
    fn league(&self) -> &League;
}

impl FeatureSource for LabeledSample {
    fn stats(&self) -> &StatLine {
        &self.stats
    }

    fn league(&self) -> &League {
        &self.league
    }
}

impl FeatureSource for PlayerSeason {
    fn stats(&self) -> &StatLine {
        &self.stats
    }

    fn league(&self) -> &League {
        &self.league
    }
}

/// Fitted preprocessing applied before the regression
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturePipeline {
    pub scaler: StandardScaler,
    pub encoder: OneHotEncoder,
}

impl FeaturePipeline {
    /// Fit scaler and encoder on these rows only
    pub fn fit<T: FeatureSource>(rows: &[T]) -> Result<Self> {
        if rows.is_empty() {
            return Err(LeagueError::EmptyDataset(
                "cannot fit feature pipeline on zero rows".to_string(),
            ));
        }

        let numeric: Vec<Vec<f64>> = rows.iter().map(|r| r.stats().to_vec()).collect();
        let mut scaler = StandardScaler::new();
        scaler.fit(&numeric)?;

        let mut encoder = OneHotEncoder::new();
        encoder.fit(rows.iter().map(|r| r.league()))?;

        log::debug!(
            "Fitted feature pipeline on {} rows, {} leagues",
            rows.len(),
            encoder.width()
        );
        Ok(FeaturePipeline { scaler, encoder })
    }

    /// Width of a transformed row
    pub fn width(&self) -> usize {
        self.scaler.width() + self.encoder.width()
    }

    pub fn transform_one<T: FeatureSource>(&self, row: &T) -> Result<Vec<f64>> {
        let mut features = self.scaler.transform_row(&row.stats().to_vec())?;
        features.extend(self.encoder.transform(row.league())?);
        Ok(features)
    }

    pub fn transform<T: FeatureSource>(&self, rows: &[T]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_one(row)).collect()
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = StatLine::FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        names.extend(self.encoder.feature_names());
        names
    }
}
