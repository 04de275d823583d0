//! Command-line interface definitions for the verse scraper.
//!
//! This module defines the CLI arguments and subcommands using the `clap` crate.
//! Store locations and the site base URL can also be provided via environment
//! variables. Flags override values from the config file.

use crate::config::ScraperConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the verse scraper.
///
/// # Examples
///
/// ```sh
/// # Replay saved pages, then fetch whatever is still missing
/// verse_scraper run
///
/// # Fill gaps in chapters 1 and 2 only, keeping every fetched page
/// verse_scraper fetch --chapter 1 --chapter 2 --save-html
///
/// # Replay a directory of raw page dumps into a separate store
/// verse_scraper --progress-file dump.json replay --dir ./raw_html
///
/// # Print per-chapter completeness
/// verse_scraper summary
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true, env = "VERSE_SCRAPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Progress file rewritten after every insertion
    #[arg(long, global = true, env = "VERSE_PROGRESS_FILE")]
    pub progress_file: Option<PathBuf>,

    /// Release file written when a pass completes
    #[arg(long, global = true, env = "VERSE_RELEASE_FILE")]
    pub release_file: Option<PathBuf>,

    /// Base URL of the verse pages
    #[arg(long, global = true, env = "VERSE_BASE_URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch missing verses from the site
    Fetch {
        /// Restrict to these chapters (repeatable; default: all)
        #[arg(long = "chapter")]
        chapters: Vec<u32>,

        /// Save every fetched page into the HTML cache directory
        #[arg(long)]
        save_html: bool,
    },
    /// Merge verses from saved HTML pages
    Replay {
        /// Directories to replay (repeatable; default: the cache and raw directories)
        #[arg(long = "dir")]
        dirs: Vec<PathBuf>,
    },
    /// Replay the cache and raw directories, then fetch what is still missing
    Run {
        /// Restrict the live pass to these chapters
        #[arg(long = "chapter")]
        chapters: Vec<u32>,
    },
    /// Print per-chapter completeness of the progress file
    Summary,
}

impl Cli {
    /// Apply flag overrides on top of `config`.
    pub fn apply(&self, config: &mut ScraperConfig) {
        if let Some(path) = &self.progress_file {
            config.store.progress = path.clone();
        }
        if let Some(path) = &self.release_file {
            config.store.release = path.clone();
        }
        if let Some(url) = &self.base_url {
            config.work.base_url = url.clone();
        }
        if let Command::Fetch { save_html: true, .. } = self.command {
            config.save_html = true;
        }
    }
}
