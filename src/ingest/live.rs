//! Live gap fill against the verse site.
//!
//! Candidates are derived from the gaps between the expected verse table and
//! what the store already covers. A gap run of two or more verses may be a
//! single combined-verse page on the site (`1/16-18/`), so short runs are
//! tried as one combined URL first, followed by one candidate per verse.
//! When the combined page exists the per-verse candidates are already
//! covered by the time they come up and are skipped without a request; when
//! it does not, the anomaly is logged and the verses are fetched one by one.

use super::{Candidate, VerseSource};
use crate::codec;
use crate::extract::{Extractor, SourceDescriptor};
use crate::fetch::{FetchError, FetchPage};
use crate::gaps::find_gaps;
use crate::models::{VerseRecord, VerseRef};
use crate::store::VerseStore;
use crate::utils::truncate_for_log;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

/// Fetches missing verses from the site.
pub struct LiveSource<F> {
    fetcher: F,
    extractor: Extractor,
    expected: BTreeMap<u32, u32>,
    max_combined_span: u32,
    save_dir: Option<PathBuf>,
}

impl<F: FetchPage> LiveSource<F> {
    pub fn new(fetcher: F, extractor: Extractor, expected: BTreeMap<u32, u32>) -> Self {
        Self {
            fetcher,
            extractor,
            expected,
            max_combined_span: 6,
            save_dir: None,
        }
    }

    /// Longest gap run tried as a combined page; `0` or `1` disables combined fetches.
    pub fn with_max_combined_span(mut self, span: u32) -> Self {
        self.max_combined_span = span;
        self
    }

    /// Save every fetched page under `dir` using its cache filename.
    pub fn save_html_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    #[cfg(test)]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn candidate(&self, verse: VerseRef) -> Candidate {
        let url = codec::verse_url(&self.extractor.work().base_url, verse);
        Candidate {
            location: url.clone(),
            url: Some(url),
            verse: Some(verse),
        }
    }

    /// Expand gap runs into fetch candidates, combined page first for short runs.
    pub fn plan(&self, gaps: &[VerseRef]) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for gap in gaps {
            if gap.is_range() && gap.span() <= self.max_combined_span {
                candidates.push(self.candidate(*gap));
            }
            candidates.extend(
                gap.verses()
                    .map(|verse| self.candidate(VerseRef::single(gap.chapter, verse))),
            );
        }
        candidates
    }

    async fn save(&self, verse: VerseRef, body: &str) -> Result<(), Box<dyn Error>> {
        let Some(dir) = &self.save_dir else {
            return Ok(());
        };
        let path = dir.join(codec::cache_file_name(verse));
        fs::create_dir_all(dir).await?;
        fs::write(&path, body).await?;
        debug!(path = %path.display(), "Saved page");
        Ok(())
    }
}

impl<F: FetchPage> VerseSource for LiveSource<F> {
    fn name(&self) -> &str {
        "live"
    }

    async fn candidates(&self, store: &VerseStore) -> Result<Vec<Candidate>, Box<dyn Error>> {
        let gaps = find_gaps(&store.coverage(), &self.expected);
        let missing: u32 = gaps.iter().map(VerseRef::span).sum();
        info!(runs = gaps.len(), missing, "Computed missing verses");
        for gap in gaps.iter().filter(|g| g.is_range()) {
            debug!(%gap, "Missing run");
        }
        Ok(self.plan(&gaps))
    }

    async fn extract(&self, candidate: &Candidate) -> Result<Option<VerseRecord>, Box<dyn Error>> {
        let combined = candidate.verse.is_some_and(|v| v.is_range());

        let page = match self.fetcher.fetch(&candidate.location).await {
            Ok(page) => page,
            Err(e) => {
                match (&e, combined) {
                    (_, true) => warn!(
                        url = %candidate.location,
                        error = %e,
                        "Combined verse page unavailable; falling back to single verses"
                    ),
                    (FetchError::NotFound { .. }, false) => {
                        info!(url = %candidate.location, "Verse page not found")
                    }
                    (_, false) => warn!(url = %candidate.location, error = %e, "Giving up on verse page"),
                }
                return Ok(None);
            }
        };

        // A final URL that is not a verse page falls back to the requested one
        let final_verse = codec::parse_url(&page.final_url);
        let url = match final_verse {
            Some(_) => page.final_url.as_str(),
            None => candidate.location.as_str(),
        };
        if let Some(verse) = final_verse.or(candidate.verse) {
            if let Err(e) = self.save(verse, &page.body).await {
                warn!(%url, error = %e, "Failed to save fetched page; continuing");
            }
        }

        let record = self
            .extractor
            .extract_html(&page.body, SourceDescriptor::Live { url });
        if record.is_none() {
            warn!(
                %url,
                preview = %truncate_for_log(&page.body, 200),
                "No verse identifier on fetched page"
            );
        }
        Ok(record)
    }
}
