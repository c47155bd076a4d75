//! Labeled dataset construction
//!
//! Aligns each player season (from any league) with the same player's Win
//! Shares in the following NBA season and applies playing-time filters.

use crate::{FilterConfig, LabeledSample, LeagueError, PlayerSeason, Result, Season, WinSharesLabel};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};

/// Minimum playing time a row needs to be used
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowFilter {
    pub min_games: u32,
    pub min_minutes_per_game: f64,
}

impl RowFilter {
    /// Filter that accepts every row
    pub fn none() -> Self {
        RowFilter {
            min_games: 0,
            min_minutes_per_game: 0.0,
        }
    }

    pub fn accepts(&self, row: &PlayerSeason) -> bool {
        row.games >= self.min_games && row.minutes_per_game >= self.min_minutes_per_game
    }

    pub fn accepts_sample(&self, sample: &LabeledSample) -> bool {
        sample.games >= self.min_games && sample.minutes_per_game >= self.min_minutes_per_game
    }
}

impl From<FilterConfig> for RowFilter {
    fn from(config: FilterConfig) -> Self {
        RowFilter {
            min_games: config.min_games,
            min_minutes_per_game: config.min_minutes_per_game,
        }
    }
}

/// Inner join of stat rows onto next-season labels.
///
/// A row for `(player, season)` is paired with the label for
/// `(player, season + 1)`. Rows without a label and labels without a row are
/// dropped. Output preserves observation order.
pub fn lagged_join(observations: &[PlayerSeason], labels: &[WinSharesLabel]) -> Vec<LabeledSample> {
    let mut by_key: HashMap<(&str, Season), f64> = HashMap::with_capacity(labels.len());
    for label in labels {
        let key = (label.player.as_str(), label.season);
        if by_key.contains_key(&key) {
            log::warn!(
                "Duplicate label for {} {}, keeping the first",
                label.player,
                label.season
            );
            continue;
        }
        by_key.insert(key, label.win_shares);
    }

    let mut samples = Vec::new();
    for row in first_occurrences(observations) {
        let Some(target_season) = row.season.next() else {
            log::warn!("No season follows {} for {}, skipping", row.season, row.player);
            continue;
        };
        if let Some(&win_shares) = by_key.get(&(row.player.as_str(), target_season)) {
            samples.push(LabeledSample {
                player: row.player.clone(),
                team: row.team.clone(),
                league: row.league.clone(),
                predictor_season: row.season,
                target_season,
                games: row.games,
                minutes_per_game: row.minutes_per_game,
                stats: row.stats,
                win_shares,
            });
        }
    }

    log::debug!(
        "Lagged join: {} rows x {} labels -> {} samples",
        observations.len(),
        labels.len(),
        samples.len()
    );
    samples
}

/// First row of each `(league, player, season)`, in input order
pub fn first_occurrences(observations: &[PlayerSeason]) -> Vec<&PlayerSeason> {
    let mut seen = HashSet::with_capacity(observations.len());
    observations
        .iter()
        .filter(|row| {
            let first = seen.insert((row.league.as_str(), row.player.as_str(), row.season));
            if !first {
                log::warn!(
                    "Duplicate row for {} in {} {}, keeping the first",
                    row.player,
                    row.league,
                    row.season
                );
            }
            first
        })
        .collect()
}

/// Labeled samples ready for model fitting
#[derive(Debug, Clone, Default)]
pub struct LeagueDataset {
    samples: Vec<LabeledSample>,
}

impl LeagueDataset {
    pub fn from_samples(samples: Vec<LabeledSample>) -> Self {
        LeagueDataset { samples }
    }

    /// Join rows with labels and keep predictor rows passing the filter.
    ///
    /// Duplicates are dropped before filtering, so a later duplicate never
    /// stands in for a first row that failed the filter.
    pub fn from_store(
        observations: &[PlayerSeason],
        labels: &[WinSharesLabel],
        filter: RowFilter,
    ) -> Self {
        let eligible: Vec<PlayerSeason> = first_occurrences(observations)
            .into_iter()
            .filter(|row| filter.accepts(row))
            .cloned()
            .collect();
        log::info!(
            "{} of {} rows pass the playing-time filter (GP >= {}, MPG >= {})",
            eligible.len(),
            observations.len(),
            filter.min_games,
            filter.min_minutes_per_game
        );
        LeagueDataset {
            samples: lagged_join(&eligible, labels),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    /// Win Shares targets in sample order
    pub fn targets(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.win_shares).collect()
    }

    /// New dataset holding the samples at `indices`
    pub fn subset(&self, indices: &[usize]) -> Self {
        LeagueDataset {
            samples: indices
                .iter()
                .filter_map(|&i| self.samples.get(i).cloned())
                .collect(),
        }
    }

    /// Shuffled split into (train, test); both sides are non-empty for n >= 2
    pub fn train_test_split(&self, test_fraction: f64, seed: u64) -> Result<(Self, Self)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(LeagueError::InvalidParameter(format!(
                "test fraction must be in (0, 1), got {}",
                test_fraction
            )));
        }
        let n = self.samples.len();
        if n < 2 {
            return Err(LeagueError::EmptyDataset(format!(
                "need at least 2 samples to split, have {}",
                n
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let n_test = ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1);
        let (test_idx, train_idx) = indices.split_at(n_test);

        log::info!(
            "Split {} samples: train={}, test={}",
            n,
            train_idx.len(),
            test_idx.len()
        );

        Ok((self.subset(train_idx), self.subset(test_idx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{League, StatLine};

    fn row(league: &str, player: &str, season: u16, games: u32, mpg: f64) -> PlayerSeason {
        PlayerSeason {
            player: player.to_string(),
            team: "TM".to_string(),
            league: League::new(league),
            season: Season(season),
            games,
            minutes_per_game: mpg,
            stats: StatLine {
                pts: season as f64,
                ..StatLine::default()
            },
        }
    }

    fn label(player: &str, season: u16, ws: f64) -> WinSharesLabel {
        WinSharesLabel {
            player: player.to_string(),
            season: Season(season),
            win_shares: ws,
        }
    }

    #[test]
    fn test_lagged_join_pairs_next_season() {
        let rows = vec![
            row("NBA", "A", 2012, 60, 30.0),
            row("NBA", "A", 2013, 60, 30.0),
            row("Euroleague", "B", 2012, 25, 20.0),
            row("NBA", "C", 2012, 60, 30.0),
        ];
        let labels = vec![
            label("A", 2013, 5.0),
            label("A", 2014, 6.0),
            label("B", 2013, 1.5),
            // Same-season label must not join
            label("C", 2012, 9.0),
        ];

        let samples = lagged_join(&rows, &labels);
        assert_eq!(samples.len(), 3);

        assert_eq!(samples[0].player, "A");
        assert_eq!(samples[0].predictor_season, Season(2012));
        assert_eq!(samples[0].target_season, Season(2013));
        assert_eq!(samples[0].win_shares, 5.0);
        assert_eq!(samples[0].stats.pts, 2012.0);

        assert_eq!(samples[1].win_shares, 6.0);
        assert_eq!(samples[2].league, League::new("Euroleague"));
        assert_eq!(samples[2].win_shares, 1.5);

        for s in &samples {
            assert_eq!(Some(s.target_season), s.predictor_season.next());
        }
    }

    #[test]
    fn test_lagged_join_cardinality_bounded() {
        let rows: Vec<PlayerSeason> = (0..20)
            .map(|i| row("NBA", &format!("P{}", i % 5), 2010 + (i / 5) as u16, 50, 20.0))
            .collect();
        let labels: Vec<WinSharesLabel> = (0..5)
            .flat_map(|p| (2011..2013).map(move |s| label(&format!("P{}", p), s, p as f64)))
            .collect();

        let samples = lagged_join(&rows, &labels);
        // Seasons 2010 and 2011 have labels in 2011 and 2012
        assert_eq!(samples.len(), 10);
        // One league, so each label is used at most once
        assert!(samples.len() <= labels.len());
    }

    #[test]
    fn test_lagged_join_keeps_first_duplicate_label() {
        let rows = vec![row("NBA", "A", 2015, 60, 30.0)];
        let labels = vec![label("A", 2016, 3.0), label("A", 2016, 8.0)];
        let samples = lagged_join(&rows, &labels);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].win_shares, 3.0);
    }

    #[test]
    fn test_same_player_in_two_leagues_joins_twice() {
        let rows = vec![
            row("Euroleague", "A", 2015, 20, 25.0),
            row("Spanish ACB", "A", 2015, 30, 24.0),
            row("Spanish ACB", "A", 2015, 31, 24.0),
        ];
        let labels = vec![label("A", 2016, 2.0)];
        let samples = lagged_join(&rows, &labels);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].games, 30);
    }

    #[test]
    fn test_from_store_applies_filter() {
        let rows = vec![
            row("NBA", "A", 2012, 60, 30.0),
            row("NBA", "B", 2012, 5, 30.0),
            row("NBA", "C", 2012, 60, 4.0),
        ];
        let labels = vec![label("A", 2013, 1.0), label("B", 2013, 1.0), label("C", 2013, 1.0)];
        let filter = RowFilter {
            min_games: 10,
            min_minutes_per_game: 10.0,
        };

        let dataset = LeagueDataset::from_store(&rows, &labels, filter);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.samples()[0].player, "A");
        assert!(filter.accepts_sample(&dataset.samples()[0]));

        let all = LeagueDataset::from_store(&rows, &labels, RowFilter::none());
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_from_store_drops_duplicates_before_filtering() {
        let rows = vec![
            row("Euroleague", "A", 2015, 5, 25.0),
            row("Euroleague", "A", 2015, 30, 25.0),
            row("Euroleague", "B", 2015, 30, 25.0),
        ];
        let labels = vec![label("A", 2016, 2.0), label("B", 2016, 1.0)];
        let filter = RowFilter {
            min_games: 10,
            min_minutes_per_game: 10.0,
        };

        let dataset = LeagueDataset::from_store(&rows, &labels, filter);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.samples()[0].player, "B");
    }

    #[test]
    fn test_last_representable_season_is_skipped() {
        let rows = vec![row("NBA", "A", u16::MAX, 60, 30.0), row("NBA", "B", 2015, 60, 30.0)];
        let labels = vec![label("A", u16::MAX, 4.0), label("B", 2016, 1.0)];
        let samples = lagged_join(&rows, &labels);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].player, "B");
    }

    #[test]
    fn test_train_test_split_is_partition() {
        let rows: Vec<PlayerSeason> = (0..50)
            .map(|i| row("NBA", &format!("P{}", i), 2012, 50, 20.0))
            .collect();
        let labels: Vec<WinSharesLabel> = (0..50)
            .map(|i| label(&format!("P{}", i), 2013, i as f64))
            .collect();
        let dataset = LeagueDataset::from_store(&rows, &labels, RowFilter::none());

        let (train, test) = dataset.train_test_split(0.2, 7).unwrap();
        assert_eq!(train.len(), 40);
        assert_eq!(test.len(), 10);

        let mut players: Vec<&str> = train
            .samples()
            .iter()
            .chain(test.samples())
            .map(|s| s.player.as_str())
            .collect();
        players.sort();
        players.dedup();
        assert_eq!(players.len(), 50);

        // Same seed, same split
        let (train2, _) = dataset.train_test_split(0.2, 7).unwrap();
        assert_eq!(train.targets(), train2.targets());
    }

    #[test]
    fn test_train_test_split_rejects_bad_input() {
        let dataset = LeagueDataset::from_samples(vec![]);
        assert!(dataset.train_test_split(0.2, 1).is_err());

        let rows = vec![row("NBA", "A", 2012, 50, 20.0), row("NBA", "B", 2012, 50, 20.0)];
        let labels = vec![label("A", 2013, 1.0), label("B", 2013, 2.0)];
        let dataset = LeagueDataset::from_store(&rows, &labels, RowFilter::none());
        assert!(dataset.train_test_split(1.5, 1).is_err());
        let (train, test) = dataset.train_test_split(0.01, 1).unwrap();
        assert_eq!((train.len(), test.len()), (1, 1));
    }
}
