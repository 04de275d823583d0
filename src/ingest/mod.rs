//! Ingestion passes that merge extracted verses into the store.
//!
//! Every pass follows the same sequence, implemented once in [`ingest`]:
//!
//! 1. **Enumerate**: the source lists its candidates (URLs to fetch, files to read)
//! 2. **Skip**: candidates whose URL is already stored, or whose verses are
//!    already covered, are skipped without any network or file work
//! 3. **Extract**: the source turns the candidate into a [`VerseRecord`]
//! 4. **Insert**: the record goes to its chapter/verse position and the
//!    progress file is rewritten
//!
//! A failing candidate is logged and the pass moves on. Only a failure to
//! persist the store aborts the pass.
//!
//! # Sources
//!
//! | Source | Module | Candidates |
//! |--------|--------|------------|
//! | Live site | [`live`] | Missing verse runs computed by [`crate::gaps`] |
//! | Saved pages | [`cache`] | `*.html` files in a directory |

pub mod cache;
pub mod live;

use crate::models::{VerseRecord, VerseRef};
use crate::store::{StorePaths, VerseStore};
use std::error::Error;
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// One unit of work for a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// URL to fetch or path to read.
    pub location: String,
    /// Canonical URL, when it is known before extraction.
    pub url: Option<String>,
    /// Verses the candidate is expected to hold.
    pub verse: Option<VerseRef>,
}

/// A source of verse pages.
pub trait VerseSource {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// List candidates in processing order.
    async fn candidates(&self, store: &VerseStore) -> Result<Vec<Candidate>, Box<dyn Error>>;

    /// Turn a candidate into a record.
    ///
    /// `Ok(None)` means the candidate holds no verse (not found, or no
    /// identifier). `Err` is an unexpected failure for this candidate only.
    async fn extract(&self, candidate: &Candidate) -> Result<Option<VerseRecord>, Box<dyn Error>>;
}

/// Counters for a finished pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub candidates: usize,
    pub added: usize,
    pub skipped: usize,
    pub not_found: usize,
    /// Extracted, but without a usable URL or position.
    pub unresolved: usize,
    pub failed: usize,
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} candidates: {} added, {} skipped, {} not found, {} unresolved, {} failed",
            self.candidates, self.added, self.skipped, self.not_found, self.unresolved, self.failed
        )
    }
}

/// Merge every new record from `source` into `store`.
#[instrument(level = "info", skip_all, fields(source = source.name()))]
pub async fn ingest<S: VerseSource>(
    source: &S,
    store: &mut VerseStore,
) -> Result<IngestStats, Box<dyn Error>> {
    let candidates = source.candidates(store).await?;
    info!(count = candidates.len(), "Enumerated candidates");

    let mut stats = IngestStats::default();
    for candidate in candidates {
        stats.candidates += 1;

        if let Some(url) = candidate.url.as_deref().filter(|u| store.contains(u)) {
            info!(%url, "Skipping already processed");
            stats.skipped += 1;
            continue;
        }
        if let Some(verse) = candidate.verse.filter(|v| store.covers(*v)) {
            debug!(%verse, location = %candidate.location, "Skipping covered verses");
            stats.skipped += 1;
            continue;
        }

        let record = match source.extract(&candidate).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!(location = %candidate.location, "No verse data extracted");
                stats.not_found += 1;
                continue;
            }
            Err(e) => {
                warn!(location = %candidate.location, error = %e, "Failed to process source; continuing");
                stats.failed += 1;
                continue;
            }
        };

        let Some(url) = record.url.clone() else {
            warn!(verse_id = %record.verse_id, location = %candidate.location, "No URL found for extracted verse");
            stats.unresolved += 1;
            continue;
        };
        if store.contains(&url) {
            info!(%url, "Skipping already processed");
            stats.skipped += 1;
            continue;
        }
        let Some(position) = record.verse_ref().or(candidate.verse) else {
            warn!(
                verse_id = %record.verse_id,
                location = %candidate.location,
                "Could not determine chapter and verse"
            );
            stats.unresolved += 1;
            continue;
        };

        let verse_id = record.verse_id.clone();
        let index = store.insert_ordered(record, position).await?;
        info!(%verse_id, %url, index, "Added verse");
        stats.added += 1;
    }

    info!(%stats, total = store.len(), "Pass complete");
    Ok(stats)
}

/// Run one full pass: load the store, ingest, write the release snapshot.
pub async fn run_pass<S: VerseSource>(
    source: &S,
    paths: StorePaths,
) -> Result<(VerseStore, IngestStats), Box<dyn Error>> {
    let mut store = VerseStore::load(paths).await?;
    let stats = ingest(source, &mut store).await?;
    store.write_release().await?;
    Ok((store, stats))
}
