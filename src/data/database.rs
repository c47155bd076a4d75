//! SQLite snapshot store for scraped tables and predictions

use crate::{League, PlayerPrediction, PlayerSeason, Result, Season, StatLine, WinSharesLabel};
use rusqlite::{params, Connection};
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS player_seasons (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                league TEXT NOT NULL,
                season INTEGER NOT NULL,
                player TEXT NOT NULL,
                team TEXT NOT NULL,
                games INTEGER NOT NULL,
                minutes_per_game REAL NOT NULL,
                stats TEXT NOT NULL,
                UNIQUE(league, season, player)
            );

            CREATE TABLE IF NOT EXISTS win_shares (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player TEXT NOT NULL,
                season INTEGER NOT NULL,
                win_shares REAL NOT NULL,
                UNIQUE(player, season)
            );

            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                league TEXT NOT NULL,
                season INTEGER NOT NULL,
                player TEXT NOT NULL,
                team TEXT NOT NULL,
                prediction REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_player_seasons_league ON player_seasons(league);
            CREATE INDEX IF NOT EXISTS idx_predictions_league ON predictions(league);
            "#,
        )?;
        Ok(())
    }

    // ==================== Player Season Operations ====================

    /// Insert or update player season rows, returns number written
    pub fn upsert_player_seasons(&self, rows: &[PlayerSeason]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO player_seasons (league, season, player, team, games, minutes_per_game, stats)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(league, season, player) DO UPDATE SET
                    team = excluded.team,
                    games = excluded.games,
                    minutes_per_game = excluded.minutes_per_game,
                    stats = excluded.stats",
            )?;
            for row in rows {
                let stats = serde_json::to_string(&row.stats)?;
                count += stmt.execute(params![
                    row.league.as_str(),
                    row.season.0,
                    row.player,
                    row.team,
                    row.games,
                    row.minutes_per_game,
                    stats
                ])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    /// All player seasons, ordered by league, season, player
    pub fn get_player_seasons(&self) -> Result<Vec<PlayerSeason>> {
        self.query_player_seasons(
            "SELECT league, season, player, team, games, minutes_per_game, stats
             FROM player_seasons
             ORDER BY league, season, player",
            params![],
        )
    }

    /// Player seasons for one league
    pub fn get_league_seasons(&self, league: &League) -> Result<Vec<PlayerSeason>> {
        self.query_player_seasons(
            "SELECT league, season, player, team, games, minutes_per_game, stats
             FROM player_seasons
             WHERE league = ?1
             ORDER BY season, player",
            params![league.as_str()],
        )
    }

    fn query_player_seasons(
        &self,
        query: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<PlayerSeason>> {
        let mut stmt = self.conn.prepare(query)?;
        let raw = stmt
            .query_map(args, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u16>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(league, season, player, team, games, minutes_per_game, stats)| {
                let stats: StatLine = serde_json::from_str(&stats)?;
                Ok(PlayerSeason {
                    player,
                    team,
                    league: League(league),
                    season: Season(season),
                    games,
                    minutes_per_game,
                    stats,
                })
            })
            .collect()
    }

    /// Distinct leagues with stored rows
    pub fn leagues(&self) -> Result<Vec<League>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT league FROM player_seasons ORDER BY league")?;
        let leagues = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|r| r.map(League))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(leagues)
    }

    // ==================== Label Operations ====================

    /// Insert or update Win Shares labels, returns number written
    pub fn upsert_labels(&self, labels: &[WinSharesLabel]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO win_shares (player, season, win_shares) VALUES (?1, ?2, ?3)
                 ON CONFLICT(player, season) DO UPDATE SET win_shares = excluded.win_shares",
            )?;
            for label in labels {
                count += stmt.execute(params![label.player, label.season.0, label.win_shares])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn get_labels(&self) -> Result<Vec<WinSharesLabel>> {
        let mut stmt = self
            .conn
            .prepare("SELECT player, season, win_shares FROM win_shares ORDER BY season, player")?;
        let labels = stmt
            .query_map([], |row| {
                Ok(WinSharesLabel {
                    player: row.get(0)?,
                    season: Season(row.get(1)?),
                    win_shares: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(labels)
    }

    // ==================== Prediction Operations ====================

    /// Replace all stored predictions with a new run
    pub fn replace_predictions(&self, predictions: &[PlayerPrediction]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM predictions", [])?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO predictions (league, season, player, team, prediction)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for p in predictions {
                count += stmt.execute(params![
                    p.league.as_str(),
                    p.season.0,
                    p.player,
                    p.team,
                    p.prediction
                ])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn get_predictions(&self) -> Result<Vec<PlayerPrediction>> {
        let mut stmt = self.conn.prepare(
            "SELECT league, season, player, team, prediction FROM predictions
             ORDER BY league, season, player",
        )?;
        let predictions = stmt
            .query_map([], |row| {
                Ok(PlayerPrediction {
                    league: League(row.get(0)?),
                    season: Season(row.get(1)?),
                    player: row.get(2)?,
                    team: row.get(3)?,
                    prediction: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(predictions)
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let mut stmt = self.conn.prepare(
            "SELECT league, COUNT(*) FROM player_seasons GROUP BY league ORDER BY league",
        )?;
        let rows_per_league = stmt
            .query_map([], |row| {
                Ok((League(row.get(0)?), row.get::<_, i64>(1)? as usize))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let label_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM win_shares", [], |row| row.get(0))?;
        let prediction_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))?;
        let (earliest, latest): (Option<u16>, Option<u16>) = self.conn.query_row(
            "SELECT MIN(season), MAX(season) FROM player_seasons",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(DatabaseStats {
            rows_per_league,
            label_count: label_count as usize,
            prediction_count: prediction_count as usize,
            earliest_season: earliest.map(Season),
            latest_season: latest.map(Season),
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub rows_per_league: Vec<(League, usize)>,
    pub label_count: usize,
    pub prediction_count: usize,
    pub earliest_season: Option<Season>,
    pub latest_season: Option<Season>,
}

impl DatabaseStats {
    pub fn row_count(&self) -> usize {
        self.rows_per_league.iter().map(|(_, n)| n).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(league: &str, season: u16, player: &str, pts: f64) -> PlayerSeason {
        PlayerSeason {
            player: player.to_string(),
            team: "TM".to_string(),
            league: League::new(league),
            season: Season(season),
            games: 30,
            minutes_per_game: 25.0,
            stats: StatLine {
                pts,
                ..StatLine::default()
            },
        }
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.row_count(), 0);
        assert_eq!(stats.label_count, 0);
        assert!(stats.earliest_season.is_none());
    }

    #[test]
    fn test_upsert_player_seasons_replaces_on_key() {
        let db = Database::in_memory().unwrap();
        db.upsert_player_seasons(&[row("NBA", 2012, "A", 20.0), row("Euroleague", 2012, "A", 30.0)])
            .unwrap();
        db.upsert_player_seasons(&[row("NBA", 2012, "A", 22.5)]).unwrap();

        let rows = db.get_player_seasons().unwrap();
        assert_eq!(rows.len(), 2);
        let nba = db.get_league_seasons(&League::nba()).unwrap();
        assert_eq!(nba.len(), 1);
        assert_eq!(nba[0].stats.pts, 22.5);
        assert_eq!(nba[0].minutes_per_game, 25.0);

        assert_eq!(
            db.leagues().unwrap(),
            vec![League::new("Euroleague"), League::nba()]
        );
    }

    #[test]
    fn test_labels_and_stats() {
        let db = Database::in_memory().unwrap();
        db.upsert_player_seasons(&[row("NBA", 2011, "A", 20.0), row("NBA", 2014, "B", 10.0)])
            .unwrap();
        db.upsert_labels(&[
            WinSharesLabel {
                player: "A".to_string(),
                season: Season(2012),
                win_shares: 4.2,
            },
            WinSharesLabel {
                player: "A".to_string(),
                season: Season(2012),
                win_shares: 5.0,
            },
        ])
        .unwrap();

        let labels = db.get_labels().unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].win_shares, 5.0);

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.row_count(), 2);
        assert_eq!(stats.label_count, 1);
        assert_eq!(stats.earliest_season, Some(Season(2011)));
        assert_eq!(stats.latest_season, Some(Season(2014)));
    }

    #[test]
    fn test_replace_predictions() {
        let db = Database::in_memory().unwrap();
        let prediction = |player: &str, value: f64| PlayerPrediction {
            player: player.to_string(),
            team: "TM".to_string(),
            league: League::nba(),
            season: Season(2015),
            prediction: value,
        };

        db.replace_predictions(&[prediction("A", 1.0), prediction("B", 2.0)]).unwrap();
        db.replace_predictions(&[prediction("C", 3.0)]).unwrap();

        let stored = db.get_predictions().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].player, "C");
        assert_eq!(db.get_stats().unwrap().prediction_count, 1);
    }
}
