//! League Strength CLI
//!
//! Scrape player statistics from every professional league, project them onto
//! next-season NBA Win Shares and rank leagues by their median projection.

use clap::{Parser, Subcommand};
use league_strength::{Config, Result};

#[derive(Parser)]
#[command(name = "league-strength")]
#[command(about = "Rank basketball leagues by projected NBA Win Shares", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Grid-search and train the ridge model
    Train {
        /// Override number of cross-validation folds
        #[arg(long)]
        folds: Option<usize>,
        /// Override random seed for splits
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Predict next-season Win Shares for every eligible player season
    Predict {
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
        /// Write output to a file instead of stdout
        #[arg(long)]
        output: Option<String>,
        /// Rows to show in table format
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Rank leagues by median prediction
    Rank {
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
        /// Only use predictions from this season (ending year)
        #[arg(long)]
        season: Option<u16>,
    },
    /// Compare the prediction distributions of two leagues
    Compare {
        league_a: String,
        league_b: String,
        /// Number of histogram bins
        #[arg(long, default_value = "20")]
        bins: usize,
        /// Lower edge of the plotted range
        #[arg(long, default_value = "-10", allow_hyphen_values = true)]
        min: f64,
        /// Upper edge of the plotted range
        #[arg(long, default_value = "10")]
        max: f64,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Scrape league tables and Win Shares into the database
    Sync {
        /// Only sync one league
        #[arg(long)]
        league: Option<String>,
        /// Do not fetch NBA Win Shares
        #[arg(long)]
        skip_targets: bool,
        /// Cache directory for HTML files
        #[arg(long)]
        cache: Option<String>,
        /// Use only cached files (no network requests)
        #[arg(long)]
        offline: bool,
    },
    /// Load CSV snapshots into the database
    Import {
        /// Directory of per-league CSV files
        #[arg(long)]
        leagues: Option<String>,
        /// CSV file of Win Shares labels
        #[arg(long)]
        targets: Option<String>,
    },
    /// Write per-league, combined and target CSV snapshots
    Export {
        /// Output directory
        dir: String,
    },
    /// Show database status
    Status,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show model information
    Info,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Sync {
                league,
                skip_targets,
                cache,
                offline,
            } => commands::data_sync(&config, league, skip_targets, cache, offline),
            DataCommands::Import { leagues, targets } => {
                commands::data_import(&config, leagues, targets)
            }
            DataCommands::Export { dir } => commands::data_export(&config, &dir),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Train { folds, seed } => commands::train(&config, folds, seed),
        Commands::Predict {
            format,
            output,
            limit,
        } => commands::predict(&config, format, output, limit),
        Commands::Rank { format, season } => commands::rank(&config, format, season),
        Commands::Compare {
            league_a,
            league_b,
            bins,
            min,
            max,
        } => commands::compare(&config, &league_a, &league_b, bins, (min, max)),
        Commands::Model { action } => match action {
            ModelCommands::Info => commands::model_info(&config),
        },
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use league_strength::data::scrapers::{RealGmScraper, UrlMapping};
    use league_strength::data::{snapshot, Database, LeagueDataset, RowFilter};
    use league_strength::predict::{report, LeagueRanking, Predictor};
    use league_strength::training::{ModelArtifact, Trainer};
    use league_strength::{League, LeagueError, PlayerPrediction, Season};
    use std::path::Path;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        // Create data directories
        std::fs::create_dir_all("data/url_mapping")?;
        std::fs::create_dir_all("model")?;
        println!("Created data/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Put the league URL mapping at {}", config.scrape.url_mapping_path);
        println!("  2. Run 'league-strength data sync' to scrape player statistics");
        println!("  3. Run 'league-strength train' to fit the model");
        println!("  4. Run 'league-strength predict' then 'league-strength rank'");

        Ok(())
    }

    pub fn data_sync(
        config: &Config,
        league: Option<String>,
        skip_targets: bool,
        cache: Option<String>,
        offline: bool,
    ) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;

        let mapping = if Path::new(&config.scrape.url_mapping_path).exists() {
            UrlMapping::load(&config.scrape.url_mapping_path)?
        } else {
            log::warn!(
                "No URL mapping at {}, only the NBA can be scraped",
                config.scrape.url_mapping_path
            );
            UrlMapping::default()
        };

        let leagues: Vec<League> = match league {
            Some(name) => vec![League::new(name)],
            None => {
                let mut leagues = vec![League::nba()];
                leagues.extend(mapping.leagues().iter().filter(|l| !l.is_nba()).cloned());
                leagues
            }
        };

        let mut scraper = RealGmScraper::new(&config.scrape, mapping)?;
        if let Some(cache_dir) = cache {
            println!("Using cache directory: {}", cache_dir);
            scraper = scraper.with_cache(&cache_dir);
        }
        if offline {
            println!("Offline mode: using cached files only");
            scraper = scraper.offline_only(true);
        }

        println!(
            "Syncing {} leagues for seasons {} to {}...",
            leagues.len(),
            Season(config.scrape.first_season),
            Season(config.scrape.last_season)
        );
        let mut total = 0;
        for league in &leagues {
            match scraper.fetch_league(league) {
                Ok(rows) => {
                    let count = db.upsert_player_seasons(&rows)?;
                    println!("  {:<32} {:>6} rows", league.to_string(), count);
                    total += count;
                }
                Err(e) => println!("  {:<32} skipped: {}", league.to_string(), e),
            }
        }
        println!("Stored {} player seasons", total);

        if !skip_targets {
            println!("Fetching NBA Win Shares...");
            let labels = scraper.fetch_targets()?;
            let count = db.upsert_labels(&labels)?;
            println!("Stored {} Win Shares labels", count);
        }

        Ok(())
    }

    pub fn data_import(
        config: &Config,
        leagues: Option<String>,
        targets: Option<String>,
    ) -> Result<()> {
        if leagues.is_none() && targets.is_none() {
            println!("Nothing to import. Pass --leagues DIR and/or --targets FILE.");
            return Ok(());
        }

        let db = Database::open(&config.data.database_path)?;

        if let Some(dir) = leagues {
            println!("Importing league tables from {}...", dir);
            let rows = snapshot::combine_directory(&dir)?;
            let count = db.upsert_player_seasons(&rows)?;
            println!("Stored {} player seasons", count);
        }

        if let Some(file) = targets {
            println!("Importing Win Shares from {}...", file);
            let labels = snapshot::read_labels(std::fs::File::open(&file)?)?;
            let count = db.upsert_labels(&labels)?;
            println!("Stored {} Win Shares labels", count);
        }

        Ok(())
    }

    pub fn data_export(config: &Config, dir: &str) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let rows = db.get_player_seasons()?;
        let labels = db.get_labels()?;

        let league_count = snapshot::export_leagues(dir, &rows)?;
        std::fs::create_dir_all(Path::new(dir).join("targets"))?;
        let targets_path = Path::new(dir).join("targets").join("targets.csv");
        snapshot::write_labels(std::fs::File::create(&targets_path)?, &labels)?;

        println!(
            "Exported {} rows across {} leagues and {} labels to {}",
            rows.len(),
            league_count,
            labels.len(),
            dir
        );
        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:         {}", config.data.database_path);
        println!("  Leagues:      {}", stats.rows_per_league.len());
        println!("  Rows:         {}", stats.row_count());
        println!("  Labels:       {}", stats.label_count);
        println!("  Predictions:  {}", stats.prediction_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_season, stats.latest_season) {
            println!("  Seasons:      {} to {}", earliest, latest);
        }
        if !stats.rows_per_league.is_empty() {
            println!();
            for (league, count) in &stats.rows_per_league {
                println!("  {:<32} {:>6}", league.to_string(), count);
            }
        }

        Ok(())
    }

    pub fn train(config: &Config, folds: Option<usize>, seed: Option<u64>) -> Result<()> {
        let mut model_config = config.model.clone();
        if let Some(k) = folds {
            model_config.folds = k;
        }
        if let Some(s) = seed {
            model_config.seed = s;
        }

        println!("Initializing training...");

        let db = Database::open(&config.data.database_path)?;
        let rows = db.get_player_seasons()?;
        let labels = db.get_labels()?;
        if rows.is_empty() || labels.is_empty() {
            return Err(LeagueError::Config(
                "No data in database. Run 'league-strength data sync' first.".to_string(),
            ));
        }
        println!("Loaded {} player seasons and {} labels", rows.len(), labels.len());

        let dataset = LeagueDataset::from_store(&rows, &labels, RowFilter::from(config.filter));
        if dataset.len() < 2 {
            return Err(LeagueError::EmptyDataset(format!(
                "only {} labeled samples after the lagged join",
                dataset.len()
            )));
        }
        println!("  {} labeled samples", dataset.len());

        println!(
            "\nSearching {} alphas x {} solvers with {}-fold CV...\n",
            model_config.alphas.len(),
            model_config.solvers.len(),
            model_config.folds
        );
        let artifact = Trainer::new(model_config).train(&dataset)?;

        let mut ranked: Vec<_> = artifact.cv_results.iter().collect();
        ranked.sort_by(|a, b| {
            let a = a.mean_mse.unwrap_or(f64::INFINITY);
            let b = b.mean_mse.unwrap_or(f64::INFINITY);
            a.total_cmp(&b)
        });

        println!("=== Cross-Validation Results (best 10) ===\n");
        println!("{:>10} {:>20} {:>12} {:>10}", "Alpha", "Solver", "Mean MSE", "Std");
        println!("{}", "-".repeat(56));
        for r in ranked.iter().take(10) {
            let marker = if r.params == artifact.best_params { " *" } else { "" };
            match (r.mean_mse, r.std_mse) {
                (Some(mean), Some(std)) => println!(
                    "{:>10} {:>20} {:>12.4} {:>10.4}{}",
                    r.params.alpha,
                    r.params.solver.to_string(),
                    mean,
                    std,
                    marker
                ),
                _ => println!(
                    "{:>10} {:>20} {:>12} {:>10}",
                    r.params.alpha,
                    r.params.solver.to_string(),
                    "failed",
                    "-"
                ),
            }
        }

        println!("\nBest parameters: {}", artifact.best_params);
        println!("  Train   ({} rows): {}", artifact.n_train, artifact.train_metrics);
        println!("  Holdout ({} rows): {}", artifact.n_test, artifact.holdout_metrics);

        println!("\nSaving model to {}...", config.data.model_path);
        artifact.save(&config.data.model_path)?;
        println!("Training complete!");

        Ok(())
    }

    pub fn predict(
        config: &Config,
        format: OutputFormat,
        output: Option<String>,
        limit: usize,
    ) -> Result<()> {
        let predictor = Predictor::load(&config.data.model_path, RowFilter::from(config.inference))?;

        let db = Database::open(&config.data.database_path)?;
        let rows = db.get_player_seasons()?;
        let predictions = predictor.predict_rows(&rows)?;
        db.replace_predictions(&predictions)?;
        println!("Stored {} predictions", predictions.len());

        match output {
            Some(path) => {
                write_predictions(std::fs::File::create(&path)?, &predictions, &format, None)?;
                println!("Wrote predictions to {}", path);
            }
            None => write_predictions(std::io::stdout(), &predictions, &format, Some(limit))?,
        }

        Ok(())
    }

    fn write_predictions<W: std::io::Write>(
        mut writer: W,
        predictions: &[PlayerPrediction],
        format: &OutputFormat,
        limit: Option<usize>,
    ) -> Result<()> {
        match format {
            OutputFormat::Table => {
                write!(writer, "{}", report::render_predictions_table(predictions, limit))?
            }
            OutputFormat::Json => writeln!(writer, "{}", report::to_json(predictions)?)?,
            OutputFormat::Csv => snapshot::write_predictions(writer, predictions)?,
        }
        Ok(())
    }

    fn stored_predictions(config: &Config) -> Result<Vec<PlayerPrediction>> {
        let db = Database::open(&config.data.database_path)?;
        let predictions = db.get_predictions()?;
        if predictions.is_empty() {
            return Err(LeagueError::Config(
                "No predictions stored. Run 'league-strength predict' first.".to_string(),
            ));
        }
        Ok(predictions)
    }

    pub fn rank(config: &Config, format: OutputFormat, season: Option<u16>) -> Result<()> {
        let predictions = stored_predictions(config)?;
        let ranking = match season {
            Some(year) => LeagueRanking::for_season(&predictions, Season(year)),
            None => LeagueRanking::from_predictions(&predictions),
        };

        match format {
            OutputFormat::Table => {
                println!("\n=== League Strength (median predicted NBA Win Shares) ===\n");
                print!("{}", report::render_ranking_table(&ranking));
            }
            OutputFormat::Json => println!("{}", report::to_json(&ranking)?),
            OutputFormat::Csv => report::write_ranking_csv(std::io::stdout(), &ranking)?,
        }

        Ok(())
    }

    pub fn compare(
        config: &Config,
        league_a: &str,
        league_b: &str,
        bins: usize,
        range: (f64, f64),
    ) -> Result<()> {
        if !(range.0 < range.1) {
            return Err(LeagueError::InvalidParameter(format!(
                "plot range must satisfy min < max, got {} to {}",
                range.0, range.1
            )));
        }

        let predictions = stored_predictions(config)?;
        let values_for = |name: &str| -> Result<(League, Vec<f64>)> {
            let league = League::new(name);
            let values: Vec<f64> = predictions
                .iter()
                .filter(|p| p.league == league)
                .map(|p| p.prediction)
                .collect();
            if values.is_empty() {
                return Err(LeagueError::UnknownLeague(name.to_string()));
            }
            Ok((league, values))
        };

        let (a, a_values) = values_for(league_a)?;
        let (b, b_values) = values_for(league_b)?;
        let ranking = LeagueRanking::from_predictions(&predictions);
        for league in [&a, &b] {
            if let Some(rank) = ranking.rank_of(league) {
                println!("{}: rank {} of {}", league, rank, ranking.len());
            }
        }
        println!();
        print!(
            "{}",
            report::distribution_plot((&a, &a_values), (&b, &b_values), bins, range)
        );

        Ok(())
    }

    pub fn model_info(config: &Config) -> Result<()> {
        let artifact = ModelArtifact::load(&config.data.model_path)?;

        println!("Model Information");
        println!("───────────────────────────────");
        println!("  Path:        {}", config.data.model_path);
        println!("  Trained:     {}", artifact.trained_at.format("%Y-%m-%d %H:%M UTC"));
        println!("  Alpha:       {}", artifact.best_params.alpha);
        println!("  Solver:      {}", artifact.best_params.solver);
        println!("  Samples:     {} train / {} test", artifact.n_train, artifact.n_test);
        println!("  Leagues:     {}", artifact.leagues().len());
        println!("  Holdout:     {}", artifact.holdout_metrics);
        println!("\n  {:<28} {:>10}", "Feature", "Coef");
        println!("  {:<28} {:>10.4}", "(intercept)", artifact.model.intercept);
        for (name, coef) in artifact.coefficients() {
            println!("  {:<28} {:>10.4}", name, coef);
        }

        Ok(())
    }
}
