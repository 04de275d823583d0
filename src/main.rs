//! # Verse Scraper
//!
//! Collects Bhagavad-gita verses (Devanagari, transliteration, translation
//! and purport) from vedabase.io into an ordered, deduplicated JSON dataset
//! that survives interrupted runs.
//!
//! ## Features
//!
//! - Fetches only the verses still missing from the progress file, trying
//!   short missing runs as combined-verse pages first
//! - Replays previously saved HTML pages without touching the network
//! - Rewrites the progress file after every verse, and writes a separate
//!   release file once a pass completes
//! - Exports CSV after a fetch and prints a per-chapter completeness table
//!
//! ## Usage
//!
//! ```sh
//! verse_scraper run
//! verse_scraper fetch --chapter 2 --save-html
//! ```
//!
//! ## Architecture
//!
//! Every pass runs the same pipeline (see [`ingest`]):
//! 1. **Load**: Read the progress file into an ordered store
//! 2. **Enumerate**: Gaps to fetch (live) or files to read (replay)
//! 3. **Extract**: Parse each page into a verse record
//! 4. **Insert**: Place the record by chapter and verse, persist immediately
//! 5. **Release**: Write the completed snapshot and print the summary

use clap::Parser;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod codec;
mod config;
mod extract;
mod fetch;
mod gaps;
mod ingest;
mod models;
mod outputs;
mod store;
mod utils;

use cli::{Cli, Command};
use config::ScraperConfig;
use extract::Extractor;
use ingest::cache::CacheSource;
use ingest::live::LiveSource;
use ingest::run_pass;
use outputs::{csv, summary};
use store::VerseStore;
use utils::{ensure_writable_dir, ensure_writable_parent};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("verse_scraper starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.command, "Parsed CLI arguments");

    let mut config = ScraperConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    // Early check: both snapshot locations must be writable
    if !matches!(args.command, Command::Summary) {
        for file in [&config.store.progress, &config.store.release] {
            if let Err(e) = ensure_writable_parent(file).await {
                error!(
                    path = %file.display(),
                    error = %e,
                    "Output location is not writable (fix perms or choose a different path)"
                );
                return Err(e);
            }
        }
    }

    let (store, expected) = match &args.command {
        Command::Fetch { chapters, .. } => {
            let store = fetch_pass(&config, chapters).await?;
            (store, config.expected_counts(chapters))
        }
        Command::Replay { dirs } => {
            let dirs = if dirs.is_empty() {
                vec![config.store.cache_dir.clone(), config.store.raw_dir.clone()]
            } else {
                dirs.clone()
            };
            let mut store = None;
            for dir in &dirs {
                store = Some(replay_pass(&config, dir).await?);
            }
            let store = match store {
                Some(store) => store,
                None => VerseStore::load(config.store.paths()).await?,
            };
            (store, config.chapters.clone())
        }
        Command::Run { chapters } => {
            replay_pass(&config, &config.store.cache_dir).await?;
            replay_pass(&config, &config.store.raw_dir).await?;
            let store = fetch_pass(&config, chapters).await?;
            (store, config.expected_counts(chapters))
        }
        Command::Summary => (
            VerseStore::load(config.store.paths()).await?,
            config.chapters.clone(),
        ),
    };

    print_summary(&store, &expected);

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Fill missing verses from the site, then export CSV.
#[instrument(level = "info", skip(config))]
async fn fetch_pass(config: &ScraperConfig, chapters: &[u32]) -> Result<VerseStore, Box<dyn Error>> {
    let expected = config.expected_counts(chapters);
    if expected.is_empty() {
        return Err(format!("no configured chapter matches {chapters:?}").into());
    }

    let client = fetch::http_client(&config.http_settings())?;
    let extractor = Extractor::vedabase(config.work.clone())?;
    let mut live = LiveSource::new(client, extractor, expected)
        .with_max_combined_span(config.max_combined_span);
    if config.save_html {
        ensure_writable_dir(&config.store.cache_dir).await?;
        live = live.save_html_to(config.store.cache_dir.clone());
    }

    let (store, stats) = run_pass(&live, config.store.paths()).await?;
    info!(%stats, total = store.len(), "Live pass finished");

    if let Err(e) = csv::write_records(&config.store.csv, store.records()).await {
        error!(path = %config.store.csv.display(), error = %e, "Failed to write CSV export");
    }
    Ok(store)
}

/// Merge every saved page found in `dir`.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
async fn replay_pass(config: &ScraperConfig, dir: &Path) -> Result<VerseStore, Box<dyn Error>> {
    let label = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());
    let extractor = Extractor::vedabase(config.work.clone())?;
    let source = CacheSource::new(label, dir, extractor);

    let (store, stats) = run_pass(&source, config.store.paths()).await?;
    info!(%stats, total = store.len(), "Replay pass finished");
    Ok(store)
}

fn print_summary(store: &VerseStore, expected: &BTreeMap<u32, u32>) {
    if store.is_empty() {
        warn!("No verses recorded yet");
    }
    let summaries = summary::chapter_summaries(store, expected);
    let incomplete = summaries.iter().filter(|s| !s.is_complete()).count();
    info!(records = store.len(), incomplete, "Summary computed");
    print!("{}", summary::render(&summaries));
}
