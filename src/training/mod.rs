//! Model training
//!
//! Cross-validated hyperparameter search, holdout evaluation and the saved
//! model artifact.

pub mod cv;
pub mod grid_search;
pub mod metrics;
pub mod trainer;

pub use cv::KFold;
pub use grid_search::{CvResult, GridSearch, ParamGrid};
pub use metrics::RegressionMetrics;
pub use trainer::{ModelArtifact, Trainer};

/// Win Shares driven by points and assists with an NBA offset
#[cfg(test)]
pub(crate) fn synthetic_dataset(n: usize, seed: u64) -> crate::data::LeagueDataset {
    use crate::{LabeledSample, League, Season, StatLine};
    use rand::{Rng, SeedableRng};

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let leagues = ["NBA", "Euroleague", "Spanish ACB"];
    let samples = (0..n)
        .map(|i| {
            let league = leagues[i % leagues.len()];
            let pts: f64 = rng.gen_range(10.0..40.0);
            let ast: f64 = rng.gen_range(1.0..12.0);
            let noise: f64 = rng.gen_range(-0.2..0.2);
            let offset = if league == League::NBA { 1.0 } else { 0.0 };
            LabeledSample {
                player: format!("P{}", i),
                team: "TM".to_string(),
                league: League::new(league),
                predictor_season: Season(2015),
                target_season: Season(2016),
                games: 50,
                minutes_per_game: 25.0,
                stats: StatLine {
                    pts,
                    ast,
                    ..StatLine::default()
                },
                win_shares: 0.2 * pts + 0.3 * ast + offset - 4.0 + noise,
            }
        })
        .collect();
    crate::data::LeagueDataset::from_samples(samples)
}
