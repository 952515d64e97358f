//! DuelingBook replay analytics CLI
//!
//! Scrape replays, build the match dataset and starting-hand features, and
//! benchmark classifiers on game-1 outcomes.

use clap::{Args, Parser, Subcommand};
use ygo::{Config, OutputFormat, Result};

#[derive(Parser)]
#[command(name = "ygo")]
#[command(about = "Yu-Gi-Oh! replay scraping and match outcome analysis", long_about = None)]
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
    /// Initialize a new project with default config
    Init,
    /// Download replays into the replays directory
    Scrape {
        /// Replay id, id_matchN, or replay URL (repeatable)
        #[arg(long = "replay")]
        replays: Vec<String>,
        /// CSV (first column) or text file of replay links
        #[arg(long)]
        links_file: Option<String>,
        /// Output directory
        #[arg(long)]
        out_dir: Option<String>,
        #[command(flatten)]
        browser: BrowserArgs,
        /// Succeed as long as at least one replay was saved
        #[arg(long)]
        allow_partial: bool,
    },
    /// Extract replay links from a saved duel-records page
    Links {
        /// Saved HTML page
        #[arg(long)]
        html: String,
        /// Write links to this CSV instead of stdout
        #[arg(long)]
        out: Option<String>,
    },
    /// Build the per-match dataset from stored replays
    Dataset {
        #[arg(long)]
        replays_dir: Option<String>,
        /// Output CSV
        #[arg(long)]
        out: Option<String>,
        /// Player to place in the player1 seat
        #[arg(long)]
        provider: Option<String>,
    },
    /// Build the starting-hand feature table
    Features {
        /// Dataset CSV
        #[arg(long)]
        csv: Option<String>,
        /// Replays directory used by the deck filter
        #[arg(long)]
        replays_dir: Option<String>,
        #[arg(long)]
        features_out: Option<String>,
        #[arg(long)]
        target_out: Option<String>,
        /// Row index to exclude after label filtering (repeatable)
        #[arg(long = "drop-index")]
        drop_indices: Vec<usize>,
        /// Keep every row regardless of deck
        #[arg(long)]
        no_deck_filter: bool,
        #[arg(long)]
        provider: Option<String>,
    },
    /// Fit the classifier roster and report test accuracy
    Bench {
        #[arg(long)]
        features: Option<String>,
        #[arg(long)]
        target: Option<String>,
        /// Held-out fraction
        #[arg(long)]
        test_size: Option<f64>,
        /// Split and model seed
        #[arg(long)]
        random_state: Option<u64>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
        /// Write {model: accuracy} JSON here
        #[arg(long)]
        scores_out: Option<String>,
    },
    /// Run several stages in one go
    Pipeline {
        #[command(subcommand)]
        action: PipelineCommands,
    },
}

/// Browser session flags shared by the scraping commands
#[derive(Args, Debug)]
struct BrowserArgs {
    /// Browser profile directory (for replays that need a login)
    #[arg(long)]
    profile_dir: Option<String>,
    /// Show the browser window
    #[arg(long)]
    headful: bool,
    /// Drop the user prefix from "user-duel" identifiers
    #[arg(long)]
    strip_user_prefix: bool,
}

impl BrowserArgs {
    fn apply(self, config: &mut Config) {
        if self.profile_dir.is_some() {
            config.scrape.profile_dir = self.profile_dir;
        }
        if self.headful {
            config.scrape.headless = false;
        }
        if self.strip_user_prefix {
            config.scrape.strip_user_prefix = true;
        }
    }
}

#[derive(Subcommand)]
enum PipelineCommands {
    /// dataset → features → bench over the existing replays directory
    Offline {
        /// Reuse the existing dataset CSV
        #[arg(long)]
        skip_dataset: bool,
        #[arg(long)]
        provider: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Scrape every link in a file, then run the offline pipeline
    Scrape {
        #[arg(long)]
        links_file: String,
        #[arg(long)]
        provider: Option<String>,
        /// Where replays are saved and read back from
        #[arg(long, alias = "out-dir")]
        replays_dir: Option<String>,
        #[command(flatten)]
        browser: BrowserArgs,
        #[arg(long)]
        allow_partial: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let mut config = if std::path::Path::new(&cli.config).exists() {
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
        Commands::Init => commands::init(&cli.config),
        Commands::Scrape {
            replays,
            links_file,
            out_dir,
            browser,
            allow_partial,
        } => {
            if let Some(dir) = out_dir {
                config.data.replays_dir = dir;
            }
            browser.apply(&mut config);
            commands::scrape(&config, replays, links_file, allow_partial)
        }
        Commands::Links { html, out } => commands::links(&config, &html, out),
        Commands::Dataset {
            replays_dir,
            out,
            provider,
        } => {
            if let Some(dir) = replays_dir {
                config.data.replays_dir = dir;
            }
            if let Some(path) = out {
                config.data.matches_csv = path;
            }
            if let Some(p) = provider {
                config.set_provider(&p);
            }
            commands::dataset(&config)
        }
        Commands::Features {
            csv,
            replays_dir,
            features_out,
            target_out,
            drop_indices,
            no_deck_filter,
            provider,
        } => {
            if let Some(path) = csv {
                config.data.matches_csv = path;
            }
            if let Some(dir) = replays_dir {
                config.data.replays_dir = dir;
            }
            if let Some(path) = features_out {
                config.data.features_csv = path;
            }
            if let Some(path) = target_out {
                config.data.target_csv = path;
            }
            if no_deck_filter {
                config.deck_filter.enabled = false;
            }
            if let Some(p) = provider {
                config.set_provider(&p);
            }
            commands::features(&config, &drop_indices)
        }
        Commands::Bench {
            features,
            target,
            test_size,
            random_state,
            format,
            scores_out,
        } => {
            if let Some(path) = features {
                config.data.features_csv = path;
            }
            if let Some(path) = target {
                config.data.target_csv = path;
            }
            if let Some(t) = test_size {
                config.bench.test_size = t;
            }
            if let Some(seed) = random_state {
                config.bench.random_state = seed;
            }
            if scores_out.is_some() {
                config.data.scores_json = scores_out;
            }
            commands::bench(&config, format)
        }
        Commands::Pipeline { action } => match action {
            PipelineCommands::Offline {
                skip_dataset,
                provider,
                format,
            } => {
                if let Some(p) = provider {
                    config.set_provider(&p);
                }
                commands::pipeline_offline(&config, skip_dataset, format)
            }
            PipelineCommands::Scrape {
                links_file,
                provider,
                replays_dir,
                browser,
                allow_partial,
                format,
            } => {
                if let Some(p) = provider {
                    config.set_provider(&p);
                }
                if let Some(dir) = replays_dir {
                    config.data.replays_dir = dir;
                }
                browser.apply(&mut config);
                commands::pipeline_scrape(&config, &links_file, allow_partial, format)
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use std::path::Path;
    use ygo::data::scrapers::browser::ChromeSession;
    use ygo::data::scrapers::duelingbook::{ReplayFetcher, ScrapeSummary};
    use ygo::data::scrapers::links::{read_links_file, write_links_csv, ReplayLinkExtractor};
    use ygo::pipeline::Pipeline;
    use ygo::YgoError;

    /// R.B. deck allow-lists written into a fresh config.toml
    const STARTER_PLAY_KINDS: [&str; 7] = [
        "Normal Summon",
        "Declare",
        "Activate ST",
        "To GY",
        "SS ATK",
        "Banish",
        "SS DEF",
    ];
    const STARTER_CARD_NAMES: [&str; 10] = [
        "R.B. Ga10 Driller",
        "Jet Synchron",
        "R.B. Last Stand",
        "R.B. Ga10 Cutter",
        "Scrap Recycler",
        "R.B. Funk Dock",
        "R.B. Stage Landing",
        "R.B. Lambda Cannon",
        "R.B. Lambda Blade",
        "R.B. Ga10 Pile Bunker",
    ];

    pub fn starter_config() -> Config {
        let mut config = Config::default();
        config.deck_filter.play_kinds = STARTER_PLAY_KINDS.iter().map(|s| s.to_string()).collect();
        config.deck_filter.card_names = STARTER_CARD_NAMES.iter().map(|s| s.to_string()).collect();
        config
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = starter_config();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.replays_dir)?;
        println!("Created {}", config.data.replays_dir);

        println!("\nNext steps:");
        println!("  1. Set data.provider and deck_filter.provider in {}", config_path);
        println!("     and adjust the deck_filter lists to the deck under study");
        println!("  2. Run 'ygo scrape --links-file links.csv' to download replays");
        println!("  3. Run 'ygo pipeline offline' to build features and bench models");

        Ok(())
    }

    fn run_scrape(config: &Config, inputs: &[String], allow_partial: bool) -> Result<ScrapeSummary> {
        if inputs.is_empty() {
            return Err(YgoError::Config(
                "no replay identifiers given; use --replay or --links-file".to_string(),
            ));
        }

        let session = ChromeSession::from_config(config);
        let fetcher = ReplayFetcher::from_config(session, config);
        let out_dir = Path::new(&config.data.replays_dir);

        println!("Fetching {} replays into {}...", inputs.len(), out_dir.display());
        let summary = fetcher.fetch_all(inputs, out_dir, config.scrape.strip_user_prefix);

        println!(
            "Saved {} of {} replays",
            summary.saved.len(),
            summary.attempted()
        );
        for (input, reason) in &summary.failures {
            println!("  failed: {} ({})", input, reason);
        }

        if summary.is_failure(allow_partial) {
            return Err(YgoError::Service {
                message: format!(
                    "{} of {} replay fetches failed",
                    summary.failures.len(),
                    summary.attempted()
                ),
            });
        }
        Ok(summary)
    }

    pub fn scrape(
        config: &Config,
        mut replays: Vec<String>,
        links_file: Option<String>,
        allow_partial: bool,
    ) -> Result<()> {
        if let Some(path) = links_file {
            let links = read_links_file(&path)?;
            println!("Read {} links from {}", links.len(), path);
            replays.extend(links);
        }
        run_scrape(config, &replays, allow_partial)?;
        Ok(())
    }

    pub fn links(config: &Config, html: &str, out: Option<String>) -> Result<()> {
        let extractor = ReplayLinkExtractor::new(&config.scrape.base_url);
        let links = extractor.parse_file(html)?;

        match out {
            Some(path) => {
                write_links_csv(&links, &path)?;
                println!("Wrote {} links to {}", links.len(), path);
            }
            None => {
                for link in &links {
                    println!("{}", link);
                }
            }
        }
        Ok(())
    }

    pub fn dataset(config: &Config) -> Result<()> {
        let build = Pipeline::new(config).build_dataset()?;

        println!("\n=== Dataset ===\n");
        println!("Rows:    {}", build.rows.len());
        println!("Skipped: {}", build.skipped.len());
        for (file, reason) in &build.skipped {
            println!("  {}: {}", file, reason);
        }
        println!("Written to {}", config.data.matches_csv);

        if build.rows.is_empty() {
            println!("No usable replays found in {}", config.data.replays_dir);
        }
        Ok(())
    }

    pub fn features(config: &Config, drop_indices: &[usize]) -> Result<()> {
        let set = Pipeline::new(config).build_features_from_csv(&config.data.matches_csv, drop_indices)?;

        let wins = set.labels.iter().filter(|&&l| l).count();
        println!("\n=== Features ===\n");
        println!("Rows:    {}", set.table.n_samples());
        println!("Columns: {} ({} cards)", set.table.n_features(), set.cards.len());
        println!("Wins:    {} / {}", wins, set.labels.len());
        println!("Written to {} and {}", config.data.features_csv, config.data.target_csv);
        Ok(())
    }

    fn print_report(report: &ygo::training::BenchReport, format: OutputFormat) -> Result<()> {
        print!("{}", report.render(format)?);
        if format == OutputFormat::Json {
            println!();
        }
        Ok(())
    }

    pub fn bench(config: &Config, format: OutputFormat) -> Result<()> {
        let report = Pipeline::new(config)
            .bench_from_csv(&config.data.features_csv, &config.data.target_csv)?;
        print_report(&report, format)
    }

    pub fn pipeline_offline(config: &Config, skip_dataset: bool, format: OutputFormat) -> Result<()> {
        let report = Pipeline::new(config).run_offline(skip_dataset)?;
        print_report(&report, format)
    }

    pub fn pipeline_scrape(
        config: &Config,
        links_file: &str,
        allow_partial: bool,
        format: OutputFormat,
    ) -> Result<()> {
        let links = read_links_file(links_file)?;
        println!("Read {} links from {}", links.len(), links_file);
        run_scrape(config, &links, allow_partial)?;
        pipeline_offline(config, false, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_scrape_accepts_session_flags() {
        let cli = Cli::try_parse_from([
            "ygo",
            "pipeline",
            "scrape",
            "--links-file",
            "links.csv",
            "--out-dir",
            "replays",
            "--profile-dir",
            "profile",
            "--headful",
            "--strip-user-prefix",
        ])
        .unwrap();

        let Commands::Pipeline {
            action: PipelineCommands::Scrape { replays_dir, browser, .. },
        } = cli.command
        else {
            panic!("expected pipeline scrape");
        };
        assert_eq!(replays_dir.as_deref(), Some("replays"));

        let mut config = Config::default();
        browser.apply(&mut config);
        assert_eq!(config.scrape.profile_dir.as_deref(), Some("profile"));
        assert!(!config.scrape.headless);
        assert!(config.scrape.strip_user_prefix);
    }

    #[test]
    fn test_scrape_flags_unchanged() {
        let cli = Cli::try_parse_from(["ygo", "scrape", "--replay", "745183-77512517", "--headful"]).unwrap();
        let Commands::Scrape { replays, browser, .. } = cli.command else {
            panic!("expected scrape");
        };
        assert_eq!(replays, vec!["745183-77512517"]);
        assert!(browser.headful);
        assert!(browser.profile_dir.is_none());
    }

    #[test]
    fn test_init_writes_deck_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        commands::starter_config().save(path).unwrap();

        let loaded = Config::load(path).unwrap();
        assert!(loaded.deck_filter.card_names.contains(&"Jet Synchron".to_string()));
        assert_eq!(loaded.deck_filter.play_kinds.len(), 7);
        assert!(Config::default().deck_filter.card_names.is_empty());
    }
}
