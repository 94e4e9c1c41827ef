//! Movie-Spider main entry point
//!
//! This is the command-line interface for the Movie-Spider crawler.

use anyhow::Context;
use clap::Parser;
use movie_spider::config::{load_config_with_hash, validate, Config};
use movie_spider::output::{load_statistics, print_statistics};
use movie_spider::storage::{SqliteStore, Store};
use movie_spider::url::MovieSite;
use movie_spider::Spider;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

const DEFAULT_SEED_URL: &str = "http://movie.douban.com/subject/3266615/";

/// Movie-Spider: a resumable movie page crawler
///
/// Starting from a seed movie page, Movie-Spider follows related-movie links
/// depth first, stores every movie and its credited people in SQLite, and
/// keeps the ids it didn't get to so the next run can continue.
#[derive(Parser, Debug)]
#[command(name = "movie-spider")]
#[command(version)]
#[command(about = "A resumable movie page crawler", long_about = None)]
struct Cli {
    /// Write logs to this file instead of stderr
    #[arg(short, long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Path to the SQLite database
    #[arg(short, long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Movie page to start from
    #[arg(short, long = "seed-url", value_name = "URL", default_value = DEFAULT_SEED_URL)]
    seed_url: String,

    /// Maximum number of movies to crawl, 0 for no limit
    #[arg(short, long = "max-movies", value_name = "N")]
    max_movies: Option<usize>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, config_hash) = match load_settings(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = setup_logging(cli.verbose, cli.quiet, config.output.log_path.as_deref()) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }
    if let Some(hash) = config_hash {
        tracing::info!("Configuration loaded (hash: {})", hash);
    }

    let result = if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, &cli.seed_url).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("FATAL: {:#}", e);
            eprintln!("Error: {}. Check log for details.", e);
            ExitCode::FAILURE
        }
    }
}

/// Builds the effective configuration: file values, then command-line overrides
fn load_settings(cli: &Cli) -> anyhow::Result<(Config, Option<String>)> {
    let (mut config, hash) = match &cli.config {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    if let Some(db) = &cli.db {
        config.output.database_path = db.display().to_string();
    }
    if let Some(log) = &cli.log {
        config.output.log_path = Some(log.display().to_string());
    }
    if let Some(max_movies) = cli.max_movies {
        config.crawler.max_movies = max_movies;
    }

    validate(&config).context("Invalid configuration")?;
    Ok((config, hash))
}

/// Sets up the tracing subscriber based on verbosity level and log destination
fn setup_logging(verbose: u8, quiet: bool, log_path: Option<&str>) -> anyhow::Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("movie_spider=info,warn"),
            1 => EnvFilter::new("movie_spider=debug,info"),
            2 => EnvFilter::new("movie_spider=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    match log_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(Path::new(path))
                .with_context(|| format!("Failed to open log file {}", path))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_existing_store(Path::new(&config.output.database_path))?;

    let stats = load_statistics(&store).context("Failed to load statistics")?;
    print_statistics(&stats);
    Ok(())
}

/// Opens a database for reading without creating it when it is missing
fn open_existing_store(path: &Path) -> anyhow::Result<SqliteStore> {
    if !path.is_file() {
        anyhow::bail!("Database {} does not exist", path.display());
    }

    let mut store = SqliteStore::new(path);
    store.open().context("Failed to open database")?;
    Ok(store)
}

/// Handles the main crawl operation
///
/// Ctrl-C asks the spider to stop; the process exits once the remaining
/// frontier has been saved.
async fn handle_crawl(config: Config, seed_url: &str) -> anyhow::Result<()> {
    let site = MovieSite::new(&config.site.base_url).context("Failed to start spider")?;
    let seed = site
        .parse_movie_id(seed_url)
        .with_context(|| format!("Seed URL {} is not a movie page", seed_url))
        .context("Failed to start spider")?;

    tracing::info!(
        "Crawling from movie {} into {} (max movies: {}, fetch gap: {}ms)",
        seed,
        config.output.database_path,
        config.crawler.max_movies,
        config.crawler.fetch_gap_ms
    );

    let spider = Arc::new(Spider::from_config(&config).context("Failed to start spider")?);
    spider.set_seed(seed).context("Failed to start spider")?;
    spider.on_complete(|| tracing::info!("Spider stopped"));

    let completion = spider.completion();
    spider.start().context("Failed to start spider")?;

    let stopper = Arc::clone(&spider);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping spider");
            stopper.stop();
        }
    });

    completion.wait().await;
    Ok(())
}
