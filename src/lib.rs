//! Cross-league basketball strength estimation
//!
//! Projects per-48-minute player statistics from any professional league onto
//! a common scale (next-season NBA Win Shares) and ranks leagues by the
//! median projection of their players.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ridge::Solver;

/// A league as named by the stats provider (e.g. "NBA", "Spanish ACB")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct League(pub String);

impl League {
    pub const NBA: &'static str = "NBA";

    pub fn new(name: impl Into<String>) -> Self {
        League(name.into())
    }

    pub fn nba() -> Self {
        League(Self::NBA.to_string())
    }

    pub fn is_nba(&self) -> bool {
        self.0 == Self::NBA
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.replace('_', " "))
    }
}

/// A season identified by the calendar year it ends in (2010 = 2009-10)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Season(pub u16);

impl Season {
    /// The season that follows this one, None past the last representable year
    pub fn next(self) -> Option<Season> {
        self.0.checked_add(1).map(Season)
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.0.saturating_sub(1), self.0 % 100)
    }
}

/// Per-48-minute, pace-adjusted box score line for one player season
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    pub pts: f64,
    pub fgm: f64,
    pub fga: f64,
    pub fg_pct: f64,
    pub tpm: f64,
    pub tpa: f64,
    pub tp_pct: f64,
    pub ftm: f64,
    pub fta: f64,
    pub ft_pct: f64,
    pub orb: f64,
    pub drb: f64,
    pub reb: f64,
    pub ast: f64,
    pub stl: f64,
    pub blk: f64,
    pub tov: f64,
    pub pf: f64,
}

impl StatLine {
    /// Number of numeric model features
    pub const DIM: usize = 18;

    /// Column names, in `to_vec` order
    pub const FEATURE_NAMES: [&'static str; Self::DIM] = [
        "PTS", "FGM", "FGA", "FG%", "3PM", "3PA", "3P%", "FTM", "FTA", "FT%", "ORB", "DRB",
        "REB", "AST", "STL", "BLK", "TOV", "PF",
    ];

    /// Flatten into model feature order
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.pts,
            self.fgm,
            self.fga,
            self.fg_pct,
            self.tpm,
            self.tpa,
            self.tp_pct,
            self.ftm,
            self.fta,
            self.ft_pct,
            self.orb,
            self.drb,
            self.reb,
            self.ast,
            self.stl,
            self.blk,
            self.tov,
            self.pf,
        ]
    }

    /// Build from values in `FEATURE_NAMES` order
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.len() != Self::DIM {
            return Err(LeagueError::DimensionMismatch {
                expected: Self::DIM,
                found: values.len(),
            });
        }
        Ok(StatLine {
            pts: values[0],
            fgm: values[1],
            fga: values[2],
            fg_pct: values[3],
            tpm: values[4],
            tpa: values[5],
            tp_pct: values[6],
            ftm: values[7],
            fta: values[8],
            ft_pct: values[9],
            orb: values[10],
            drb: values[11],
            reb: values[12],
            ast: values[13],
            stl: values[14],
            blk: values[15],
            tov: values[16],
            pf: values[17],
        })
    }

    /// Mutable access by feature column name
    pub fn field_mut(&mut self, name: &str) -> Option<&mut f64> {
        let field = match name {
            "PTS" => &mut self.pts,
            "FGM" => &mut self.fgm,
            "FGA" => &mut self.fga,
            "FG%" => &mut self.fg_pct,
            "3PM" => &mut self.tpm,
            "3PA" => &mut self.tpa,
            "3P%" => &mut self.tp_pct,
            "FTM" => &mut self.ftm,
            "FTA" => &mut self.fta,
            "FT%" => &mut self.ft_pct,
            "ORB" => &mut self.orb,
            "DRB" => &mut self.drb,
            "REB" => &mut self.reb,
            "AST" => &mut self.ast,
            "STL" => &mut self.stl,
            "BLK" => &mut self.blk,
            "TOV" => &mut self.tov,
            "PF" => &mut self.pf,
            _ => return None,
        };
        Some(field)
    }
}

/// One scraped row: a player's season in one league
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeason {
    pub player: String,
    pub team: String,
    pub league: League,
    pub season: Season,
    /// Games played
    pub games: u32,
    pub minutes_per_game: f64,
    pub stats: StatLine,
}

/// NBA outcome for a player season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinSharesLabel {
    pub player: String,
    pub season: Season,
    pub win_shares: f64,
}

/// A stat row aligned with the player's following NBA season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub player: String,
    pub team: String,
    pub league: League,
    pub predictor_season: Season,
    pub target_season: Season,
    pub games: u32,
    pub minutes_per_game: f64,
    pub stats: StatLine,
    pub win_shares: f64,
}

/// Model output for one player season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPrediction {
    pub player: String,
    pub team: String,
    pub league: League,
    pub season: Season,
    /// Predicted Win Shares in the following NBA season
    pub prediction: f64,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum LeagueError {
    #[error("Scraper failed for {league}: {message}")]
    Scraper { league: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown league: {0}")]
    UnknownLeague(String),

    #[error("Model not trained - run `league-strength train` first")]
    NoModel,

    #[error("{0} used before fit")]
    NotFitted(&'static str),

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Dimension mismatch: expected {expected} columns, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, LeagueError>;

/// Application configuration loaded from config.toml.
///
/// Missing sections take their default values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scrape: ScrapeConfig,
    pub filter: FilterConfig,
    pub inference: FilterConfig,
    pub model: ModelConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub first_season: u16,
    pub last_season: u16,
    pub max_pages: u32,
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
    pub max_attempts: u32,
    pub url_mapping_path: String,
    pub cache_dir: Option<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
}

/// Minimum playing time for a row to be used
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FilterConfig {
    pub min_games: u32,
    pub min_minutes_per_game: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub folds: usize,
    pub test_fraction: f64,
    pub seed: u64,
    pub alphas: Vec<f64>,
    pub solvers: Vec<Solver>,
    /// Epochs for the gradient descent solvers
    pub epochs: usize,
    pub learning_rate: f64,
    /// Residual tolerance for the conjugate gradient solver
    pub tolerance: f64,
    pub max_iterations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub model_path: String,
    pub snapshot_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scrape: ScrapeConfig {
                base_url: "https://basketball.realgm.com".to_string(),
                first_season: 2010,
                last_season: 2019,
                max_pages: 99,
                min_delay_secs: 5,
                max_delay_secs: 10,
                max_attempts: 3,
                url_mapping_path: "data/url_mapping/url_mapping.csv".to_string(),
                cache_dir: None,
                user_agent: "league-strength/0.1".to_string(),
                timeout_secs: 30,
            },
            filter: FilterConfig {
                min_games: 20,
                min_minutes_per_game: 10.0,
            },
            inference: FilterConfig {
                min_games: 10,
                min_minutes_per_game: 10.0,
            },
            model: ModelConfig {
                folds: 5,
                test_fraction: 0.2,
                seed: 42,
                alphas: vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 1000.0],
                solvers: vec![
                    Solver::Cholesky,
                    Solver::ConjugateGradient,
                    Solver::Sgd,
                    Solver::Adam,
                ],
                epochs: 500,
                learning_rate: 0.05,
                tolerance: 1e-8,
                max_iterations: 1000,
            },
            data: DataConfig {
                database_path: "data/league_strength.db".to_string(),
                model_path: "model/ridge.json".to_string(),
                snapshot_dir: "data/snapshots".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LeagueError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| LeagueError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LeagueError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_display_and_next() {
        let season = Season(2010);
        assert_eq!(season.to_string(), "2009-10");
        assert_eq!(season.next(), Some(Season(2011)));
        assert_eq!(Season(u16::MAX).next(), None);
        assert_eq!(Season(2000).to_string(), "1999-00");
    }

    #[test]
    fn test_stat_line_roundtrip_order() {
        let values: Vec<f64> = (0..StatLine::DIM).map(|i| i as f64).collect();
        let line = StatLine::from_slice(&values).unwrap();
        assert_eq!(line.tp_pct, 6.0);
        assert_eq!(line.to_vec(), values);

        let mut line = StatLine::default();
        *line.field_mut("AST").unwrap() = 7.5;
        assert_eq!(line.ast, 7.5);
        assert!(line.field_mut("WS").is_none());
    }

    #[test]
    fn test_stat_line_rejects_wrong_width() {
        assert!(matches!(
            StatLine::from_slice(&[1.0, 2.0]),
            Err(LeagueError::DimensionMismatch { expected: 18, found: 2 })
        ));
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.model.alphas.len() * parsed.model.solvers.len(), 40);
        assert_eq!(parsed.scrape.first_season, 2010);
    }

    #[test]
    fn test_config_missing_sections_use_defaults() {
        let text = "[filter]\nmin_games = 30\nmin_minutes_per_game = 15.0\n";
        let parsed: Config = toml::from_str(text).unwrap();
        assert_eq!(parsed.filter.min_games, 30);
        assert_eq!(parsed.inference.min_games, 10);
        assert_eq!(parsed.model.folds, 5);
        assert_eq!(parsed.data.model_path, "model/ridge.json");

        let empty: Config = toml::from_str("").unwrap();
        assert_eq!(empty.scrape.first_season, 2010);
    }
}
