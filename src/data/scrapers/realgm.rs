//! RealGM scraper for per-48 statistics and NBA Win Shares
//!
//! Walks the paginated stats tables season by season. Supports caching HTML
//! files for offline runs and reduced load on the provider.

use super::{collect_seasons, with_retry, StatsSource, UrlMapping};
use crate::{
    League, LeagueError, PlayerSeason, Result, ScrapeConfig, Season, StatLine, WinSharesLabel,
};
use rand::Rng;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which table a page holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableKind {
    Per48,
    Targets,
}

/// Scraper for basketball.realgm.com
pub struct RealGmScraper {
    client: reqwest::blocking::Client,
    base_url: String,
    mapping: UrlMapping,
    first_season: Season,
    last_season: Season,
    max_pages: u32,
    delay_secs: (u64, u64),
    max_attempts: u32,
    /// Optional cache directory for offline HTML files
    cache_dir: Option<PathBuf>,
    /// If true, only use cache (no network requests)
    offline_only: bool,
}

impl RealGmScraper {
    pub fn new(config: &ScrapeConfig, mapping: UrlMapping) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let mut scraper = RealGmScraper {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            mapping,
            first_season: Season(config.first_season),
            last_season: Season(config.last_season),
            max_pages: config.max_pages,
            delay_secs: (config.min_delay_secs, config.max_delay_secs),
            max_attempts: config.max_attempts,
            cache_dir: None,
            offline_only: false,
        };
        if let Some(dir) = &config.cache_dir {
            scraper = scraper.with_cache(dir);
        }
        Ok(scraper)
    }

    /// Create scraper with a cache directory
    pub fn with_cache<P: AsRef<Path>>(mut self, cache_dir: P) -> Self {
        self.cache_dir = Some(cache_dir.as_ref().to_path_buf());
        self
    }

    /// Set offline-only mode (no network requests, cache must exist)
    pub fn offline_only(mut self, offline: bool) -> Self {
        self.offline_only = offline;
        self
    }

    /// URL of one page of a league's per-48 table
    pub fn league_url(&self, league: &League, season: Season, page: u32) -> Result<String> {
        if league.is_nba() {
            return Ok(format!(
                "{}/nba/stats/{}/Per_48/All/points/All/asc/{}/Regular_Season?pace_adjustment=",
                self.base_url, season.0, page
            ));
        }
        let number = self.mapping.url_number(league)?;
        Ok(format!(
            "{}/international/league/{}/{}/stats/{}/Per_48/All/All/points/All/desc/{}?pace_adjustment=",
            self.base_url,
            number,
            league.as_str().replace(' ', "-"),
            season.0,
            page
        ))
    }

    /// URL of one page of the NBA advanced stats table
    pub fn targets_url(&self, season: Season, page: u32) -> String {
        format!(
            "{}/nba/stats/{}/Misc_Stats/All/per/All/asc/{}/Regular_Season?pace_adjustment=",
            self.base_url, season.0, page
        )
    }

    /// All configured seasons of one league
    pub fn fetch_league(&self, league: &League) -> Result<Vec<PlayerSeason>> {
        // Fail fast on leagues missing from the mapping
        self.league_url(league, self.first_season, 1)?;
        let rows = collect_seasons(self.first_season, self.last_season, |season| {
            self.league_stats(league, season)
        });
        log::info!("Fetched {} rows for {}", rows.len(), league);
        Ok(rows)
    }

    /// All configured seasons of NBA Win Shares
    pub fn fetch_targets(&self) -> Result<Vec<WinSharesLabel>> {
        let labels = collect_seasons(self.first_season, self.last_season, |season| {
            self.win_shares(season)
        });
        log::info!("Fetched {} Win Shares labels", labels.len());
        Ok(labels)
    }

    /// Walk pages until one is missing or empty
    fn fetch_pages<T, F, P, K>(&self, kind: TableKind, url_for: F, parse: P, key: K) -> Result<Vec<T>>
    where
        F: Fn(u32) -> String,
        P: Fn(&str) -> Result<Vec<T>>,
        K: Fn(&T) -> String,
    {
        let mut rows = Vec::new();
        let mut previous_first: Option<String> = None;

        for page in 1..=self.max_pages {
            let url = url_for(page);
            let html = match self.fetch_html(&url)? {
                Some(html) => html,
                None => break,
            };

            let parsed = match parse(&html) {
                Ok(parsed) => parsed,
                Err(e) => {
                    log::debug!("Stopping {:?} pagination at page {}: {}", kind, page, e);
                    break;
                }
            };
            if parsed.is_empty() {
                break;
            }

            // The provider serves the last page again past the end
            let first = key(&parsed[0]);
            if previous_first.as_deref() == Some(first.as_str()) {
                break;
            }
            previous_first = Some(first);

            log::debug!("Page {} of {:?}: {} rows", page, kind, parsed.len());
            rows.extend(parsed);
        }

        Ok(rows)
    }

    /// Fetch a page from cache or network. `None` means no such page.
    fn fetch_html(&self, url: &str) -> Result<Option<String>> {
        if let Some(html) = self.load_from_cache(url) {
            return Ok(Some(html));
        }

        if self.offline_only {
            log::debug!("Offline mode, no cached copy of {}", url);
            return Ok(None);
        }

        self.polite_delay();

        let response = with_retry(|| Ok(self.client.get(url).send()?), self.max_attempts);
        match response {
            Ok(resp) if resp.status().is_success() => {
                let html = resp.text()?;
                self.save_to_cache(url, &html)?;
                Ok(Some(html))
            }
            Ok(resp) => {
                log::warn!("RealGM returned {} for {}", resp.status(), url);
                Ok(None)
            }
            Err(e) => {
                log::warn!("Failed to fetch {}: {}", url, e);
                Ok(None)
            }
        }
    }

    /// Random pause between requests to avoid being throttled
    fn polite_delay(&self) {
        let (min, max) = self.delay_secs;
        let secs = if max > min {
            rand::thread_rng().gen_range(min..max)
        } else {
            min
        };
        if secs > 0 {
            std::thread::sleep(Duration::from_secs(secs));
        }
    }

    /// Get the cache file path for a URL
    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| {
            let filename = url
                .replace("https://", "")
                .replace("http://", "")
                .replace('/', "_")
                .replace('?', "_")
                .replace('=', "_")
                + ".html";
            dir.join(filename)
        })
    }

    fn load_from_cache(&self, url: &str) -> Option<String> {
        let path = self.cache_path(url)?;
        if path.exists() {
            log::debug!("Loading from cache: {}", path.display());
            std::fs::read_to_string(&path).ok()
        } else {
            None
        }
    }

    fn save_to_cache(&self, url: &str, html: &str) -> Result<()> {
        if let Some(path) = self.cache_path(url) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, html)?;
            log::debug!("Saved to cache: {}", path.display());
        }
        Ok(())
    }
}

impl StatsSource for RealGmScraper {
    fn league_stats(&self, league: &League, season: Season) -> Result<Vec<PlayerSeason>> {
        log::info!("Fetching {} {}", league, season);
        // Resolve the league id once so page URLs cannot fail below
        self.league_url(league, season, 1)?;
        self.fetch_pages(
            TableKind::Per48,
            |page| self.league_url(league, season, page).unwrap_or_default(),
            |html| parse_stats_table(html, league, season),
            |row| row.player.clone(),
        )
    }

    fn win_shares(&self, season: Season) -> Result<Vec<WinSharesLabel>> {
        log::info!("Fetching NBA Win Shares {}", season);
        self.fetch_pages(
            TableKind::Targets,
            |page| self.targets_url(season, page),
            |html| parse_targets_table(html, season),
            |label| label.player.clone(),
        )
    }
}

/// Header cells and body rows of the first table on a page
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    fn parse(html: &str) -> Result<Self> {
        let document = Html::parse_document(html);
        let table_sel = selector("table")?;
        let th_sel = selector("th")?;
        let tr_sel = selector("tr")?;
        let td_sel = selector("td")?;

        let table = document
            .select(&table_sel)
            .next()
            .ok_or_else(|| LeagueError::Parse("no table on page".to_string()))?;

        let headers: Vec<String> = table.select(&th_sel).map(|th| cell_text(&th)).collect();
        let rows = table
            .select(&tr_sel)
            .map(|tr| tr.select(&td_sel).map(|td| cell_text(&td)).collect::<Vec<_>>())
            .filter(|cells: &Vec<String>| !cells.is_empty())
            .collect();

        Ok(RawTable { headers, rows })
    }

    fn column(&self, aliases: &[&str]) -> Option<usize> {
        header_index(&self.headers, aliases)
    }
}

/// Index of the first header matching any alias, ignoring ASCII case
pub(crate) fn header_index<S: AsRef<str>>(headers: &[S], aliases: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| aliases.iter().any(|a| h.as_ref().trim().eq_ignore_ascii_case(a)))
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| LeagueError::Parse(format!("bad selector {}: {}", css, e)))
}

fn cell_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Stat columns and the header names the provider uses for them
pub(crate) const STAT_ALIASES: [(&str, &[&str]); StatLine::DIM] = [
    ("PTS", &["PTS", "PPG"]),
    ("FGM", &["FGM"]),
    ("FGA", &["FGA"]),
    ("FG%", &["FG%"]),
    ("3PM", &["3PM", "3FGM"]),
    ("3PA", &["3PA", "3FGA"]),
    ("3P%", &["3P%", "3FG%"]),
    ("FTM", &["FTM"]),
    ("FTA", &["FTA"]),
    ("FT%", &["FT%"]),
    ("ORB", &["ORB", "OFF"]),
    ("DRB", &["DRB", "DEF"]),
    ("REB", &["REB", "RPG", "TRB"]),
    ("AST", &["AST", "APG"]),
    ("STL", &["STL", "SPG"]),
    ("BLK", &["BLK", "BPG"]),
    ("TOV", &["TOV", "TO"]),
    ("PF", &["PF"]),
];

/// Minutes per game from an `MPG` column, falling back to `MIN`.
///
/// A `MIN` value above a full game is a season total and is divided by games.
pub(crate) fn minutes_per_game(mpg: Option<f64>, min: Option<f64>, games: u32) -> f64 {
    match (mpg, min) {
        (Some(mpg), _) => mpg,
        (None, Some(minutes)) if minutes > 48.0 && games > 0 => minutes / games as f64,
        (None, Some(minutes)) => minutes,
        (None, None) => 0.0,
    }
}

/// Parse a per-48 stats page into player seasons
pub fn parse_stats_table(html: &str, league: &League, season: Season) -> Result<Vec<PlayerSeason>> {
    let table = RawTable::parse(html)?;

    let player_col = table
        .column(&["Player", "Name"])
        .ok_or_else(|| LeagueError::Parse("stats table has no Player column".to_string()))?;
    let team_col = table.column(&["Team"]);
    let games_col = table.column(&["GP", "G"]);
    let mpg_col = table.column(&["MPG"]);
    let min_col = table.column(&["MIN"]);

    let stat_cols: Vec<(&str, Option<usize>)> = STAT_ALIASES
        .iter()
        .map(|(name, aliases)| (*name, table.column(aliases)))
        .collect();
    let missing: Vec<&str> = stat_cols
        .iter()
        .filter(|(_, col)| col.is_none())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        log::debug!("{} {}: columns {:?} missing, using 0.0", league, season, missing);
    }

    let mut rows = Vec::new();
    for cells in &table.rows {
        let player = match cells.get(player_col).map(|p| clean_player_name(p)) {
            Some(name) if !name.is_empty() => name,
            _ => continue,
        };

        let number = |col: Option<usize>| col.and_then(|c| cells.get(c)).map_or(0.0, |s| parse_number(s));

        let games = number(games_col).max(0.0) as u32;
        let minutes_per_game = minutes_per_game(
            mpg_col.map(|c| number(Some(c))),
            min_col.map(|c| number(Some(c))),
            games,
        );

        let mut stats = StatLine::default();
        for (name, col) in &stat_cols {
            if let Some(field) = stats.field_mut(name) {
                *field = number(*col);
            }
        }

        rows.push(PlayerSeason {
            player,
            team: team_col
                .and_then(|c| cells.get(c))
                .cloned()
                .unwrap_or_default(),
            league: league.clone(),
            season,
            games,
            minutes_per_game,
            stats,
        });
    }

    Ok(rows)
}

/// Parse an NBA advanced stats page into Win Shares labels
pub fn parse_targets_table(html: &str, season: Season) -> Result<Vec<WinSharesLabel>> {
    let table = RawTable::parse(html)?;

    let player_col = table
        .column(&["Player", "Name"])
        .ok_or_else(|| LeagueError::Parse("targets table has no Player column".to_string()))?;
    let ws_col = table
        .column(&["WS", "Win Shares", "Total WS"])
        .ok_or_else(|| LeagueError::Scraper {
            league: League::NBA.to_string(),
            message: format!("no Win Shares column for {}", season),
        })?;

    let labels = table
        .rows
        .iter()
        .filter_map(|cells| {
            let player = clean_player_name(cells.get(player_col)?);
            if player.is_empty() {
                return None;
            }
            Some(WinSharesLabel {
                player,
                season,
                win_shares: cells.get(ws_col).map_or(0.0, |s| parse_number(s)),
            })
        })
        .collect();

    Ok(labels)
}

/// Parse a numeric cell; placeholders such as "-" or "" become 0.0
pub fn parse_number(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '%' | '+'))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Strip footnote markers and collapse whitespace in a player name
pub fn clean_player_name(raw: &str) -> String {
    thread_local! {
        static MARKERS: Regex = Regex::new(r"\[\d+\]|\*|†").expect("valid regex");
        static SPACES: Regex = Regex::new(r"\s+").expect("valid regex");
    }
    let stripped = MARKERS.with(|re| re.replace_all(raw, "").into_owned());
    SPACES.with(|re| re.replace_all(stripped.trim(), " ").into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PER48_PAGE: &str = r#"
        <html><body>
        <table class="tablesaw">
          <thead><tr>
            <th>#</th><th>Player</th><th>Team</th><th>GP</th><th>MPG</th>
            <th>PTS</th><th>FGM</th><th>FGA</th><th>FG%</th><th>3PM</th><th>3PA</th>
            <th>3P%</th><th>FTM</th><th>FTA</th><th>FT%</th><th>ORB</th><th>DRB</th>
            <th>REB</th><th>AST</th><th>STL</th><th>BLK</th><th>TOV</th><th>PF</th>
          </tr></thead>
          <tbody>
            <tr><td>1</td><td><a href="/player/1">Nikola  Mirotic</a></td><td>RMD</td><td>34</td><td>24.1</td>
              <td>30.2</td><td>10.1</td><td>20.4</td><td>.495</td><td>3.1</td><td>8.0</td>
              <td>.388</td><td>6.9</td><td>8.1</td><td>.852</td><td>3.0</td><td>9.1</td>
              <td>12.1</td><td>3.3</td><td>2.1</td><td>1.4</td><td>3.0</td><td>5.5</td></tr>
            <tr><td>2</td><td>Sergio Llull*</td><td>RMD</td><td>30</td><td>21.0</td>
              <td>25.0</td><td>8.0</td><td>19.0</td><td>.421</td><td>4.0</td><td>11.0</td>
              <td>-</td><td>5.0</td><td>6.0</td><td>.833</td><td>1.0</td><td>4.0</td>
              <td>5.0</td><td>9.0</td><td>2.0</td><td>0.1</td><td>4.2</td><td>4.0</td></tr>
            <tr><td>3</td><td></td><td>RMD</td></tr>
          </tbody>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_stats_table() {
        let league = League::new("Spanish ACB");
        let rows = parse_stats_table(PER48_PAGE, &league, Season(2014)).unwrap();

        assert_eq!(rows.len(), 2);
        let first = &rows[0];
        assert_eq!(first.player, "Nikola Mirotic");
        assert_eq!(first.team, "RMD");
        assert_eq!(first.games, 34);
        assert!((first.minutes_per_game - 24.1).abs() < 1e-9);
        assert!((first.stats.pts - 30.2).abs() < 1e-9);
        assert!((first.stats.fg_pct - 0.495).abs() < 1e-9);
        assert!((first.stats.pf - 5.5).abs() < 1e-9);
        assert_eq!(first.league, league);
        assert_eq!(first.season, Season(2014));

        let second = &rows[1];
        assert_eq!(second.player, "Sergio Llull");
        assert_eq!(second.stats.tp_pct, 0.0);
        assert!((second.stats.ast - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_targets_table() {
        let html = r#"
            <table>
              <tr><th>#</th><th>Player</th><th>Team</th><th>TS%</th><th>WS</th></tr>
              <tr><td>1</td><td>Pau Gasol</td><td>LAL</td><td>.572</td><td>11.4</td></tr>
              <tr><td>2</td><td>Omri Casspi</td><td>SAC</td><td>.530</td><td>-0.6</td></tr>
            </table>
        "#;
        let labels = parse_targets_table(html, Season(2010)).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].player, "Pau Gasol");
        assert!((labels[0].win_shares - 11.4).abs() < 1e-9);
        assert!((labels[1].win_shares + 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_targets_without_win_shares_is_error() {
        let html = "<table><tr><th>Player</th><th>PER</th></tr><tr><td>A</td><td>15</td></tr></table>";
        assert!(matches!(
            parse_targets_table(html, Season(2010)),
            Err(LeagueError::Scraper { .. })
        ));
    }

    #[test]
    fn test_page_without_table_is_error() {
        let league = League::nba();
        assert!(parse_stats_table("<html><p>No data</p></html>", &league, Season(2010)).is_err());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1,234.5"), 1234.5);
        assert_eq!(parse_number(".455"), 0.455);
        assert_eq!(parse_number("45.5%"), 45.5);
        assert_eq!(parse_number("-"), 0.0);
        assert_eq!(parse_number(""), 0.0);
        assert_eq!(parse_number("-1.2"), -1.2);
    }

    #[test]
    fn test_minutes_per_game_from_totals() {
        assert_eq!(minutes_per_game(Some(31.5), Some(900.0), 30), 31.5);
        assert_eq!(minutes_per_game(None, Some(900.0), 30), 30.0);
        assert_eq!(minutes_per_game(None, Some(24.0), 30), 24.0);
        assert_eq!(minutes_per_game(None, Some(900.0), 0), 900.0);
        assert_eq!(minutes_per_game(None, None, 30), 0.0);
    }

    #[test]
    fn test_clean_player_name() {
        assert_eq!(clean_player_name("  LeBron   James* "), "LeBron James");
        assert_eq!(clean_player_name("Ricky Rubio[1]"), "Ricky Rubio");
    }

    #[test]
    fn test_league_urls() {
        let mut mapping = UrlMapping::default();
        mapping.insert(League::new("Spanish ACB"), 4);
        let scraper = RealGmScraper::new(&crate::Config::default().scrape, mapping).unwrap();

        assert_eq!(
            scraper.league_url(&League::nba(), Season(2015), 2).unwrap(),
            "https://basketball.realgm.com/nba/stats/2015/Per_48/All/points/All/asc/2/Regular_Season?pace_adjustment="
        );
        assert_eq!(
            scraper.league_url(&League::new("Spanish ACB"), Season(2015), 1).unwrap(),
            "https://basketball.realgm.com/international/league/4/Spanish-ACB/stats/2015/Per_48/All/All/points/All/desc/1?pace_adjustment="
        );
        assert!(scraper.league_url(&League::new("Unknown"), Season(2015), 1).is_err());
        assert!(scraper.targets_url(Season(2012), 3).contains("/nba/stats/2012/Misc_Stats/All/per/All/asc/3/"));
    }

    #[test]
    fn test_offline_scrape_reads_cache_pages() {
        let dir = std::env::temp_dir().join(format!("league-strength-cache-{}", std::process::id()));
        let mut mapping = UrlMapping::default();
        mapping.insert(League::new("Spanish ACB"), 4);
        let scraper = RealGmScraper::new(&crate::Config::default().scrape, mapping)
            .unwrap()
            .with_cache(&dir)
            .offline_only(true);

        let league = League::new("Spanish ACB");
        let url = scraper.league_url(&league, Season(2014), 1).unwrap();
        scraper.save_to_cache(&url, PER48_PAGE).unwrap();

        let rows = scraper.league_stats(&league, Season(2014)).unwrap();
        assert_eq!(rows.len(), 2);

        // No cached page for other seasons, so nothing is fetched
        let rows = scraper.league_stats(&league, Season(2015)).unwrap();
        assert!(rows.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }
}
