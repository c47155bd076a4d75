//! Flat CSV snapshots of league tables, labels and predictions
//!
//! Column layout follows the provider tables (`Player`, `Team`, `GP`, `MPG`,
//! stat columns) with `SEASON` and `LEAGUE` appended, so snapshots written by
//! earlier scraping runs can be read back directly.

use crate::data::scrapers::realgm::{header_index, minutes_per_game, parse_number, STAT_ALIASES};
use crate::{
    League, LeagueError, PlayerPrediction, PlayerSeason, Result, Season, StatLine,
    WinSharesLabel,
};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const PLAYER: &[&str] = &["Player", "PLAYER", "Name"];
const TEAM: &[&str] = &["Team", "TEAM"];
const SEASON: &[&str] = &["SEASON", "Season"];
const LEAGUE: &[&str] = &["LEAGUE", "League"];
const GAMES: &[&str] = &["GP", "G"];
const MPG: &[&str] = &["MPG"];
const MINUTES: &[&str] = &["MIN"];
const WIN_SHARES: &[&str] = &["WS", "Win Shares", "Total WS"];
const PREDICTION: &[&str] = &["Prediction", "PREDICTION"];

fn required(headers: &[&str], aliases: &[&str]) -> Result<usize> {
    header_index(headers, aliases)
        .ok_or_else(|| LeagueError::Parse(format!("snapshot is missing a {} column", aliases[0])))
}

fn field<'r>(record: &'r csv::StringRecord, col: Option<usize>) -> &'r str {
    col.and_then(|c| record.get(c)).unwrap_or("").trim()
}

/// Seasons outside this range are rejected as malformed
const MIN_SEASON: u16 = 1900;
const MAX_SEASON: u16 = 2200;

fn parse_season(raw: &str) -> Result<Season> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| (MIN_SEASON as f64..=MAX_SEASON as f64).contains(v))
        .map(|v| Season(v as u16))
        .ok_or_else(|| LeagueError::Parse(format!("invalid season: {:?}", raw)))
}

// ==================== Player Seasons ====================

pub fn write_player_seasons<W: Write>(writer: W, rows: &[PlayerSeason]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["Player", "Team", "GP", "MPG"];
    header.extend(StatLine::FEATURE_NAMES);
    header.extend(["SEASON", "LEAGUE"]);
    csv_writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.player.clone(),
            row.team.clone(),
            row.games.to_string(),
            row.minutes_per_game.to_string(),
        ];
        record.extend(row.stats.to_vec().iter().map(|v| v.to_string()));
        record.push(row.season.0.to_string());
        record.push(row.league.as_str().to_string());
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn read_player_seasons<R: Read>(reader: R) -> Result<Vec<PlayerSeason>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let headers: Vec<&str> = headers.iter().collect();

    let player_col = required(&headers, PLAYER)?;
    let season_col = required(&headers, SEASON)?;
    let league_col = required(&headers, LEAGUE)?;
    let team_col = header_index(&headers, TEAM);
    let games_col = header_index(&headers, GAMES);
    let mpg_col = header_index(&headers, MPG);
    let min_col = header_index(&headers, MINUTES);
    let stat_cols: Vec<(&str, Option<usize>)> = STAT_ALIASES
        .iter()
        .map(|(name, aliases)| (*name, header_index(&headers, aliases)))
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let player = field(&record, Some(player_col));
        if player.is_empty() {
            continue;
        }

        let mut stats = StatLine::default();
        for (name, col) in &stat_cols {
            if let Some(value) = stats.field_mut(name) {
                *value = parse_number(field(&record, *col));
            }
        }

        let games = parse_number(field(&record, games_col)).max(0.0) as u32;
        rows.push(PlayerSeason {
            player: player.to_string(),
            team: field(&record, team_col).to_string(),
            league: League::new(field(&record, Some(league_col))),
            season: parse_season(field(&record, Some(season_col)))?,
            games,
            minutes_per_game: minutes_per_game(
                mpg_col.map(|c| parse_number(field(&record, Some(c)))),
                min_col.map(|c| parse_number(field(&record, Some(c)))),
                games,
            ),
            stats,
        });
    }

    Ok(rows)
}

/// Combine every `*.csv` league file in a directory into one table
pub fn combine_directory<P: AsRef<Path>>(dir: P) -> Result<Vec<PlayerSeason>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map(|e| e == "csv").unwrap_or(false))
        .collect();
    files.sort();

    let mut combined = Vec::new();
    for path in files {
        let rows = read_player_seasons(std::fs::File::open(&path)?)?;
        log::info!("Read {} rows from {}", rows.len(), path.display());
        combined.extend(rows);
    }

    Ok(combined)
}

/// Write one CSV per league plus a combined table
pub fn export_leagues<P: AsRef<Path>>(dir: P, rows: &[PlayerSeason]) -> Result<usize> {
    let leagues_dir = dir.as_ref().join("leagues");
    std::fs::create_dir_all(&leagues_dir)?;

    let mut leagues: Vec<&League> = rows.iter().map(|r| &r.league).collect();
    leagues.sort();
    leagues.dedup();

    for league in &leagues {
        let league_rows: Vec<PlayerSeason> =
            rows.iter().filter(|r| &r.league == *league).cloned().collect();
        let path = leagues_dir.join(format!("{}.csv", league.as_str()));
        write_player_seasons(std::fs::File::create(&path)?, &league_rows)?;
        log::debug!("Wrote {} rows to {}", league_rows.len(), path.display());
    }

    let combined_dir = dir.as_ref().join("combined_data");
    std::fs::create_dir_all(&combined_dir)?;
    write_player_seasons(
        std::fs::File::create(combined_dir.join("combined_data.csv"))?,
        rows,
    )?;

    Ok(leagues.len())
}

// ==================== Labels ====================

pub fn write_labels<W: Write>(writer: W, labels: &[WinSharesLabel]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["Player", "WS", "SEASON", "LEAGUE"])?;
    for label in labels {
        csv_writer.write_record([
            label.player.as_str(),
            &label.win_shares.to_string(),
            &label.season.0.to_string(),
            League::NBA,
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn read_labels<R: Read>(reader: R) -> Result<Vec<WinSharesLabel>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let headers: Vec<&str> = headers.iter().collect();

    let player_col = required(&headers, PLAYER)?;
    let season_col = required(&headers, SEASON)?;
    let ws_col = required(&headers, WIN_SHARES)?;

    let mut labels = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let player = field(&record, Some(player_col));
        if player.is_empty() {
            continue;
        }
        labels.push(WinSharesLabel {
            player: player.to_string(),
            season: parse_season(field(&record, Some(season_col)))?,
            win_shares: parse_number(field(&record, Some(ws_col))),
        });
    }

    Ok(labels)
}

// ==================== Predictions ====================

pub fn write_predictions<W: Write>(writer: W, predictions: &[PlayerPrediction]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["Player", "Team", "SEASON", "LEAGUE", "Prediction"])?;
    for p in predictions {
        csv_writer.write_record([
            p.player.as_str(),
            p.team.as_str(),
            &p.season.0.to_string(),
            p.league.as_str(),
            &format!("{:.4}", p.prediction),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn read_predictions<R: Read>(reader: R) -> Result<Vec<PlayerPrediction>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let headers: Vec<&str> = headers.iter().collect();

    let player_col = required(&headers, PLAYER)?;
    let league_col = required(&headers, LEAGUE)?;
    let prediction_col = required(&headers, PREDICTION)?;
    let season_col = header_index(&headers, SEASON);
    let team_col = header_index(&headers, TEAM);

    let mut predictions = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        predictions.push(PlayerPrediction {
            player: field(&record, Some(player_col)).to_string(),
            team: field(&record, team_col).to_string(),
            league: League::new(field(&record, Some(league_col))),
            season: match season_col {
                Some(col) => parse_season(field(&record, Some(col)))?,
                None => Season(0),
            },
            prediction: parse_number(field(&record, Some(prediction_col))),
        });
    }

    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(league: &str, player: &str) -> PlayerSeason {
        let values: Vec<f64> = (1..=StatLine::DIM).map(|i| i as f64 * 0.5).collect();
        PlayerSeason {
            player: player.to_string(),
            team: "BAR".to_string(),
            league: League::new(league),
            season: Season(2016),
            games: 31,
            minutes_per_game: 22.75,
            stats: StatLine::from_slice(&values).unwrap(),
        }
    }

    #[test]
    fn test_player_seasons_survive_snapshot() {
        let rows = vec![sample_row("Spanish ACB", "Ante Tomic"), sample_row("NBA", "Pau Gasol")];
        let mut buffer = Vec::new();
        write_player_seasons(&mut buffer, &rows).unwrap();

        let read = read_player_seasons(buffer.as_slice()).unwrap();
        assert_eq!(read, rows);
    }

    #[test]
    fn test_read_scraper_style_csv() {
        // Layout produced by the original per-league scraping runs
        let csv = "#,Player,Team,GP,MPG,PPG,FGM,FGA,FG%,3PM,3PA,3P%,FTM,FTA,FT%,ORB,DRB,RPG,APG,SPG,BPG,TOV,PF,SEASON,LEAGUE\n\
                   1,Jan Vesely,FEN,30,24.0,25.1,10.0,16.0,.625,0.0,0.1,-,5.1,9.0,.567,4.0,8.0,12.0,2.5,2.0,1.9,3.0,5.0,2018,Turkish BSL\n";
        let rows = read_player_seasons(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.league, League::new("Turkish BSL"));
        assert_eq!(row.season, Season(2018));
        assert_eq!(row.games, 30);
        assert!((row.stats.pts - 25.1).abs() < 1e-9);
        assert!((row.stats.reb - 12.0).abs() < 1e-9);
        assert_eq!(row.stats.tp_pct, 0.0);
    }

    #[test]
    fn test_min_column_totals_become_per_game() {
        let csv = "Player,Team,GP,MIN,SEASON,LEAGUE\n\
                   A,TM,30,900,2018,Euroleague\n\
                   B,TM,30,18.5,2018,Euroleague\n";
        let rows = read_player_seasons(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].minutes_per_game, 30.0);
        assert_eq!(rows[1].minutes_per_game, 18.5);
    }

    #[test]
    fn test_implausible_season_is_rejected() {
        for season in ["65535", "1850", "-3"] {
            let csv = format!("Player,SEASON,LEAGUE\nA,{},NBA\n", season);
            assert!(matches!(
                read_player_seasons(csv.as_bytes()),
                Err(LeagueError::Parse(_))
            ));
        }
        let csv = "Player,SEASON,LEAGUE\nA,2019,NBA\n";
        assert_eq!(read_player_seasons(csv.as_bytes()).unwrap()[0].season, Season(2019));
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "Player,Team\nA,B\n";
        assert!(matches!(
            read_player_seasons(csv.as_bytes()),
            Err(LeagueError::Parse(_))
        ));
    }

    #[test]
    fn test_labels_snapshot() {
        let labels = vec![WinSharesLabel {
            player: "Kevin Durant".to_string(),
            season: Season(2014),
            win_shares: 19.2,
        }];
        let mut buffer = Vec::new();
        write_labels(&mut buffer, &labels).unwrap();
        assert_eq!(read_labels(buffer.as_slice()).unwrap(), labels);
    }

    #[test]
    fn test_predictions_snapshot() {
        let predictions = vec![PlayerPrediction {
            player: "Luka Doncic".to_string(),
            team: "RMD".to_string(),
            league: League::new("Euroleague"),
            season: Season(2018),
            prediction: 5.25,
        }];
        let mut buffer = Vec::new();
        write_predictions(&mut buffer, &predictions).unwrap();
        assert_eq!(read_predictions(buffer.as_slice()).unwrap(), predictions);
    }

    #[test]
    fn test_export_and_combine_directory() {
        let dir = std::env::temp_dir().join(format!("league-strength-snap-{}", std::process::id()));
        let rows = vec![
            sample_row("NBA", "A"),
            sample_row("Euroleague", "B"),
            sample_row("Euroleague", "C"),
        ];

        let league_count = export_leagues(&dir, &rows).unwrap();
        assert_eq!(league_count, 2);

        let combined = combine_directory(dir.join("leagues")).unwrap();
        assert_eq!(combined.len(), 3);
        // Files are read in name order: Euroleague.csv then NBA.csv
        assert_eq!(combined[0].league, League::new("Euroleague"));
        assert_eq!(combined[2].league, League::nba());

        std::fs::remove_dir_all(&dir).ok();
    }
}
