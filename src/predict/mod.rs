//! Prediction and league ranking
//!
//! Load a trained artifact, project every eligible player season and
//! aggregate the projections by league.

pub mod inference;
pub mod ranking;
pub mod report;

pub use inference::Predictor;
pub use ranking::{LeagueRanking, LeagueSummary};
