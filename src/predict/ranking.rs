//! League strength ranking from player predictions

use serde::Serialize;
use std::collections::BTreeMap;

use crate::{League, PlayerPrediction, Season};

/// Summary of one league's prediction distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeagueSummary {
    pub league: League,
    pub count: usize,
    pub median: f64,
    pub mean: f64,
    pub q1: f64,
    pub q3: f64,
    pub min: f64,
    pub max: f64,
}

/// Leagues ordered strongest first by median prediction
#[derive(Debug, Clone, Default, Serialize)]
pub struct LeagueRanking {
    pub entries: Vec<LeagueSummary>,
}

impl LeagueRanking {
    pub fn from_predictions(predictions: &[PlayerPrediction]) -> Self {
        let mut groups: BTreeMap<&League, Vec<f64>> = BTreeMap::new();
        for p in predictions {
            if p.prediction.is_finite() {
                groups.entry(&p.league).or_default().push(p.prediction);
            } else {
                log::warn!("Skipping non-finite prediction for {} ({})", p.player, p.league);
            }
        }

        let mut entries: Vec<LeagueSummary> = groups
            .into_iter()
            .map(|(league, mut values)| {
                values.sort_by(|a, b| a.total_cmp(b));
                summarize(league.clone(), &values)
            })
            .collect();

        // BTreeMap order gives name order, and the sort is stable
        entries.sort_by(|a, b| b.median.total_cmp(&a.median));
        LeagueRanking { entries }
    }

    /// Ranking restricted to one season's predictions
    pub fn for_season(predictions: &[PlayerPrediction], season: Season) -> Self {
        let filtered: Vec<PlayerPrediction> = predictions
            .iter()
            .filter(|p| p.season == season)
            .cloned()
            .collect();
        Self::from_predictions(&filtered)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, league: &League) -> Option<&LeagueSummary> {
        self.entries.iter().find(|e| &e.league == league)
    }

    /// 1-based rank of a league
    pub fn rank_of(&self, league: &League) -> Option<usize> {
        self.entries.iter().position(|e| &e.league == league).map(|i| i + 1)
    }
}

fn summarize(league: League, sorted: &[f64]) -> LeagueSummary {
    let count = sorted.len();
    LeagueSummary {
        league,
        count,
        median: quantile(sorted, 0.5),
        mean: sorted.iter().sum::<f64>() / count as f64,
        q1: quantile(sorted, 0.25),
        q3: quantile(sorted, 0.75),
        min: sorted[0],
        max: sorted[count - 1],
    }
}

/// Linearly interpolated quantile of sorted, non-empty values.
///
/// At q = 0.5 an even count averages the two middle values.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Median of unsorted values, None when empty
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(quantile(&sorted, 0.5))
}
