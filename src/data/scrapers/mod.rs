//! Web scrapers for player statistics

pub mod realgm;
pub mod url_mapping;

pub use realgm::RealGmScraper;
pub use url_mapping::UrlMapping;

use crate::{League, PlayerSeason, Result, Season, WinSharesLabel};

/// A provider of per-season player tables
pub trait StatsSource {
    /// Per-48 statistics for every player of a league in one season
    fn league_stats(&self, league: &League, season: Season) -> Result<Vec<PlayerSeason>>;

    /// NBA Win Shares for every player in one season
    fn win_shares(&self, season: Season) -> Result<Vec<WinSharesLabel>>;
}

/// Retry a scraper operation with exponential backoff
pub fn with_retry<T, F>(mut operation: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if attempt + 1 < attempts => {
                log::warn!("Attempt {} failed: {}", attempt + 1, e);
                let delay = std::time::Duration::from_millis(100 * 2u64.pow(attempt));
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Collect every season in an inclusive range from a source, skipping failures
pub fn collect_seasons<T, F>(first: Season, last: Season, mut fetch: F) -> Vec<T>
where
    F: FnMut(Season) -> Result<Vec<T>>,
{
    let mut rows = Vec::new();
    for year in first.0..=last.0 {
        match fetch(Season(year)) {
            Ok(batch) => rows.extend(batch),
            Err(e) => log::warn!("Failed to fetch season {}: {}", Season(year), e),
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LeagueError;
    use std::cell::Cell;

    #[test]
    fn test_retry_succeeds_after_failures() {
        let calls = Cell::new(0);
        let result = with_retry(
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 2 {
                    Err(LeagueError::Parse("flaky".to_string()))
                } else {
                    Ok(7)
                }
            },
            3,
        );
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_retry_returns_last_error() {
        let calls = Cell::new(0);
        let result: Result<()> = with_retry(
            || {
                calls.set(calls.get() + 1);
                Err(LeagueError::Parse(format!("attempt {}", calls.get())))
            },
            2,
        );
        assert_eq!(calls.get(), 2);
        assert!(matches!(result, Err(LeagueError::Parse(msg)) if msg == "attempt 2"));
    }

    #[test]
    fn test_collect_seasons_skips_failed_season() {
        let rows = collect_seasons(Season(2010), Season(2012), |season| {
            if season == Season(2011) {
                Err(LeagueError::Parse("missing".to_string()))
            } else {
                Ok(vec![season.0])
            }
        });
        assert_eq!(rows, vec![2010, 2012]);
    }
}
