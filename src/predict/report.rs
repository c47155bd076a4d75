//! Text, JSON and CSV rendering of predictions and rankings

use serde::Serialize;
use std::io::Write;

use super::ranking::{median, LeagueRanking};
use crate::{League, PlayerPrediction, Result};

/// Widest histogram bar in characters
const BAR_WIDTH: usize = 40;

pub fn render_ranking_table(ranking: &LeagueRanking) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>4}  {:<32} {:>6} {:>8} {:>8} {:>8} {:>8}\n",
        "Rank", "League", "N", "Median", "Mean", "Q1", "Q3"
    ));
    out.push_str(&format!("{}\n", "-".repeat(80)));
    for (i, entry) in ranking.entries.iter().enumerate() {
        out.push_str(&format!(
            "{:>4}  {:<32} {:>6} {:>8.3} {:>8.3} {:>8.3} {:>8.3}\n",
            i + 1,
            truncate(&entry.league.to_string(), 32),
            entry.count,
            entry.median,
            entry.mean,
            entry.q1,
            entry.q3
        ));
    }
    out
}

/// Predictions sorted high to low, at most `limit` rows when given
pub fn render_predictions_table(predictions: &[PlayerPrediction], limit: Option<usize>) -> String {
    let mut sorted: Vec<&PlayerPrediction> = predictions.iter().collect();
    sorted.sort_by(|a, b| b.prediction.total_cmp(&a.prediction));
    let shown = limit.unwrap_or(sorted.len()).min(sorted.len());

    let mut out = String::new();
    out.push_str(&format!(
        "{:<26} {:<20} {:<24} {:>8} {:>8}\n",
        "Player", "Team", "League", "Season", "Pred WS"
    ));
    out.push_str(&format!("{}\n", "-".repeat(90)));
    for p in &sorted[..shown] {
        out.push_str(&format!(
            "{:<26} {:<20} {:<24} {:>8} {:>8.3}\n",
            truncate(&p.player, 26),
            truncate(&p.team, 20),
            truncate(&p.league.to_string(), 24),
            p.season.to_string(),
            p.prediction
        ));
    }
    if shown < sorted.len() {
        out.push_str(&format!("... {} more rows\n", sorted.len() - shown));
    }
    out
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn write_ranking_csv<W: Write>(writer: W, ranking: &LeagueRanking) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Rank", "LEAGUE", "N", "Median", "Mean", "Q1", "Q3", "Min", "Max"])?;
    for (i, e) in ranking.entries.iter().enumerate() {
        wtr.write_record([
            (i + 1).to_string(),
            e.league.as_str().to_string(),
            e.count.to_string(),
            format!("{:.4}", e.median),
            format!("{:.4}", e.mean),
            format!("{:.4}", e.q1),
            format!("{:.4}", e.q3),
            format!("{:.4}", e.min),
            format!("{:.4}", e.max),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Side-by-side text histogram of two leagues' predictions.
///
/// Bars show each league's share of its own in-range predictions, so leagues
/// of different sizes compare directly. Values outside `range` are counted
/// but not binned.
pub fn distribution_plot(
    a: (&League, &[f64]),
    b: (&League, &[f64]),
    bins: usize,
    range: (f64, f64),
) -> String {
    let bins = bins.max(1);
    let (lo, hi) = range;
    let width = (hi - lo) / bins as f64;

    let histogram = |values: &[f64]| {
        let mut counts = vec![0usize; bins];
        let mut outside = 0;
        for &v in values {
            if !(v >= lo && v <= hi) {
                outside += 1;
                continue;
            }
            let idx = (((v - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        let total = counts.iter().sum::<usize>().max(1) as f64;
        let shares: Vec<f64> = counts.iter().map(|c| *c as f64 / total).collect();
        (shares, outside)
    };
    let (share_a, outside_a) = histogram(a.1);
    let (share_b, outside_b) = histogram(b.1);
    let peak = share_a
        .iter()
        .chain(&share_b)
        .fold(0.0f64, |m, v| m.max(*v))
        .max(f64::EPSILON);
    let bar = |share: f64, symbol: char| {
        let len = ((share / peak) * BAR_WIDTH as f64).round() as usize;
        symbol.to_string().repeat(len)
    };

    let mut out = String::new();
    out.push_str(&format!(
        "Predicted NBA Win Shares: {} (#) vs {} (o)\n",
        a.0, b.0
    ));
    for (league, values, outside, symbol) in [(a.0, a.1, outside_a, '#'), (b.0, b.1, outside_b, 'o')] {
        let med = median(values)
            .map(|m| format!("{:.3}", m))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "  {} {}: n={}, median={}, outside range={}\n",
            symbol, league, values.len(), med, outside
        ));
    }
    out.push('\n');

    for i in 0..bins {
        let start = lo + width * i as f64;
        let label = format!("[{:>6.2}, {:>6.2})", start, start + width);
        out.push_str(&format!("{} {:<w$} |\n", label, bar(share_a[i], '#'), w = BAR_WIDTH));
        out.push_str(&format!(
            "{:>lw$} {:<w$} |\n",
            "",
            bar(share_b[i], 'o'),
            lw = label.len(),
            w = BAR_WIDTH
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Season;

    fn pred(league: &str, player: &str, value: f64) -> PlayerPrediction {
        PlayerPrediction {
            player: player.to_string(),
            team: "TM".to_string(),
            league: League::new(league),
            season: Season(2019),
            prediction: value,
        }
    }

    #[test]
    fn test_ranking_table_and_csv() {
        let ranking = LeagueRanking::from_predictions(&[
            pred("NBA", "A", 3.0),
            pred("Spanish_ACB", "B", 1.0),
        ]);
        let table = render_ranking_table(&ranking);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("NBA"));
        assert!(lines[3].contains("Spanish ACB"));

        let mut buf = Vec::new();
        write_ranking_csv(&mut buf, &ranking).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Rank,LEAGUE,N,Median"));
        assert!(text.contains("2,Spanish_ACB,1,1.0000"));
    }

    #[test]
    fn test_predictions_table_sorted_and_limited() {
        let preds = vec![pred("NBA", "Low", 0.5), pred("NBA", "High", 6.0), pred("NBA", "Mid", 2.0)];
        let table = render_predictions_table(&preds, Some(2));
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[2].starts_with("High"));
        assert!(lines[3].starts_with("Mid"));
        assert_eq!(lines[4], "... 1 more rows");
    }

    #[test]
    fn test_json_output() {
        let preds = vec![pred("NBA", "A", 1.25)];
        let json = to_json(&preds).unwrap();
        let parsed: Vec<PlayerPrediction> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, preds);
    }

    #[test]
    fn test_distribution_plot_bins() {
        let nba = League::nba();
        let euro = League::new("Euroleague");
        let a = vec![-9.5, 9.5, 9.9, 25.0];
        let b = vec![0.1, 0.2];
        let plot = distribution_plot((&nba, &a), (&euro, &b), 4, (-10.0, 10.0));

        assert!(plot.contains("NBA: n=4"));
        assert!(plot.contains("outside range=1"));
        let rows: Vec<&str> = plot.lines().filter(|l| l.contains('|')).collect();
        assert_eq!(rows.len(), 8);
        // Both leagues peak in one bin, so the longest bars are full width
        assert!(rows.iter().any(|r| r.contains(&"o".repeat(BAR_WIDTH))));
        assert!(rows[0].contains('#'));
        assert!(!rows[1].contains('o'));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
