//! Ordered, deduplicated verse collection backed by JSON files.
//!
//! The store keeps every record in ascending `(chapter, start verse)` order
//! and refuses a second record with an already-known URL. Two files are
//! involved:
//!
//! - **progress**: rewritten after every single insertion so an interrupted
//!   run loses at most the record being processed
//! - **release**: written once when a pass finishes, so a partial progress
//!   file is never mistaken for a completed snapshot
//!
//! Progress writes go through a temporary sibling file and a rename, so the
//! file on disk is always a complete JSON document.

use crate::models::{VerseRecord, VerseRef};
use crate::outputs::json;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Locations of the in-progress and completed snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub progress: PathBuf,
    pub release: PathBuf,
}

/// In-memory view of the persisted verse collection.
#[derive(Debug)]
pub struct VerseStore {
    paths: StorePaths,
    records: Vec<VerseRecord>,
    known_urls: HashSet<String>,
}

/// Index of the first record whose `(chapter, verse)` is greater than the target.
///
/// Records whose identifier cannot be parsed are skipped but keep their
/// place. Returns `records.len()` when the target sorts after everything.
pub fn find_insert_position(records: &[VerseRecord], chapter: u32, verse: u32) -> usize {
    records
        .iter()
        .position(|record| {
            record
                .verse_ref()
                .is_some_and(|r| (r.chapter, r.start) > (chapter, verse))
        })
        .unwrap_or(records.len())
}

impl VerseStore {
    /// Create an empty store without touching the filesystem.
    pub fn empty(paths: StorePaths) -> Self {
        Self {
            paths,
            records: Vec::new(),
            known_urls: HashSet::new(),
        }
    }

    /// Load the progress file, or start empty if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a
    /// JSON array of verse records.
    #[instrument(level = "info", skip_all, fields(progress = %paths.progress.display()))]
    pub async fn load(paths: StorePaths) -> Result<Self, Box<dyn Error>> {
        if !fs::try_exists(&paths.progress).await? {
            info!("Progress file not found; starting with an empty collection");
            return Ok(Self::empty(paths));
        }

        let text = fs::read_to_string(&paths.progress).await?;
        let records: Vec<VerseRecord> = serde_json::from_str(&text)?;
        let known_urls = records.iter().filter_map(|r| r.url.clone()).collect();
        info!(count = records.len(), "Loaded verses from progress file");

        Ok(Self {
            paths,
            records,
            known_urls,
        })
    }

    pub fn records(&self) -> &[VerseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a record with this URL is already stored.
    pub fn contains(&self, url: &str) -> bool {
        self.known_urls.contains(url)
    }

    /// See [`find_insert_position`].
    pub fn find_insert_position(&self, chapter: u32, verse: u32) -> usize {
        find_insert_position(&self.records, chapter, verse)
    }

    /// Insert at `index` without reordering the other records.
    ///
    /// An index past the end appends.
    pub fn insert(&mut self, record: VerseRecord, index: usize) {
        if let Some(url) = &record.url {
            self.known_urls.insert(url.clone());
        }
        let index = index.min(self.records.len());
        self.records.insert(index, record);
    }

    /// Verses covered per chapter; a combined record covers its whole range.
    pub fn coverage(&self) -> BTreeMap<u32, BTreeSet<u32>> {
        let mut covered: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
        for verse in self.records.iter().filter_map(VerseRecord::verse_ref) {
            covered.entry(verse.chapter).or_default().extend(verse.verses());
        }
        covered
    }

    /// Whether every verse of `verse` is already covered by some record.
    pub fn covers(&self, verse: VerseRef) -> bool {
        let covered = self.records.iter().filter_map(VerseRecord::verse_ref);
        let mut remaining: BTreeSet<u32> = verse.verses().collect();
        for r in covered.filter(|r| r.chapter == verse.chapter) {
            for v in r.verses() {
                remaining.remove(&v);
            }
            if remaining.is_empty() {
                return true;
            }
        }
        remaining.is_empty()
    }

    /// Insert at the sorted position for `verse` and persist immediately.
    ///
    /// Returns the index the record was placed at.
    pub async fn insert_ordered(
        &mut self,
        record: VerseRecord,
        verse: VerseRef,
    ) -> Result<usize, Box<dyn Error>> {
        let index = self.find_insert_position(verse.chapter, verse.start);
        debug!(%verse, index, "Inserting verse");
        self.insert(record, index);
        self.persist().await?;
        Ok(index)
    }

    /// Overwrite the progress file with the full collection.
    pub async fn persist(&self) -> Result<(), Box<dyn Error>> {
        let tmp = self.paths.progress.with_extension("json.tmp");
        json::write_records(&tmp, &self.records).await?;
        fs::rename(&tmp, &self.paths.progress).await?;
        Ok(())
    }

    /// Write the completed snapshot to the release file.
    #[instrument(level = "info", skip_all, fields(release = %self.paths.release.display()))]
    pub async fn write_release(&self) -> Result<(), Box<dyn Error>> {
        self.persist().await?;
        json::write_records(&self.paths.release, &self.records).await?;
        info!(count = self.records.len(), "Wrote release snapshot");
        Ok(())
    }
}
