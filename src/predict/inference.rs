//! Apply a trained artifact to stored player seasons

use std::collections::BTreeSet;

use crate::data::RowFilter;
use crate::training::ModelArtifact;
use crate::{League, PlayerPrediction, PlayerSeason, Result};

/// Predicts next-season NBA Win Shares for any league's player seasons
pub struct Predictor {
    artifact: ModelArtifact,
    filter: RowFilter,
}

impl Predictor {
    pub fn new(artifact: ModelArtifact, filter: RowFilter) -> Self {
        Predictor { artifact, filter }
    }

    /// Load the artifact saved at `path`
    pub fn load(path: &str, filter: RowFilter) -> Result<Self> {
        Ok(Self::new(ModelArtifact::load(path)?, filter))
    }

    /// Predict a single row, ignoring the playing-time filter
    pub fn predict_row(&self, row: &PlayerSeason) -> Result<PlayerPrediction> {
        let features = self.artifact.pipeline.transform_one(row)?;
        let prediction = self.artifact.model.predict_one(&features)?;
        Ok(PlayerPrediction {
            player: row.player.clone(),
            team: row.team.clone(),
            league: row.league.clone(),
            season: row.season,
            prediction,
        })
    }

    /// Predict every row passing the filter, in input order
    pub fn predict_rows(&self, rows: &[PlayerSeason]) -> Result<Vec<PlayerPrediction>> {
        let eligible: Vec<&PlayerSeason> = rows.iter().filter(|r| self.filter.accepts(r)).collect();

        let unseen: BTreeSet<&League> = eligible
            .iter()
            .map(|r| &r.league)
            .filter(|league| self.artifact.pipeline.encoder.index_of(league).is_none())
            .collect();
        if !unseen.is_empty() {
            log::info!(
                "{} leagues were not in the training data and use the baseline encoding",
                unseen.len()
            );
            for league in &unseen {
                log::debug!("  unseen league: {}", league);
            }
        }

        let predictions = eligible
            .into_iter()
            .map(|row| self.predict_row(row))
            .collect::<Result<Vec<_>>>()?;

        log::info!(
            "Predicted {} of {} rows (GP >= {}, MPG >= {})",
            predictions.len(),
            rows.len(),
            self.filter.min_games,
            self.filter.min_minutes_per_game
        );
        Ok(predictions)
    }
}
