//! Replay of verse pages saved on disk.
//!
//! Two directories are replayed with the same source: the live pass's
//! response cache (`2-47.html`, `1-16-18.html`) and raw page dumps
//! (`bg_2_47.html`). Files are processed in verse order when their names
//! decode, then by name. Bytes that are not valid UTF-8 are replaced rather
//! than rejected.

use super::{Candidate, VerseSource};
use crate::codec;
use crate::extract::{Extractor, SourceDescriptor};
use crate::models::{VerseRecord, VerseRef};
use crate::store::VerseStore;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Reads `*.html` files from one directory.
pub struct CacheSource {
    label: String,
    dir: PathBuf,
    extractor: Extractor,
}

impl CacheSource {
    pub fn new(label: impl Into<String>, dir: impl Into<PathBuf>, extractor: Extractor) -> Self {
        Self {
            label: label.into(),
            dir: dir.into(),
            extractor,
        }
    }
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html"))
}

impl VerseSource for CacheSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn candidates(&self, _store: &VerseStore) -> Result<Vec<Candidate>, Box<dyn Error>> {
        if !fs::try_exists(&self.dir).await? {
            warn!(dir = %self.dir.display(), "Directory not found; nothing to replay");
            return Ok(Vec::new());
        }

        let mut files: Vec<(Option<VerseRef>, PathBuf)> = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_html(&path) || entry.file_type().await?.is_dir() {
                continue;
            }
            let hint = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(codec::parse_file_name);
            files.push((hint, path));
        }
        // Decodable names first, in verse order
        files.sort_by(|a, b| (a.0.is_none(), a.0, &a.1).cmp(&(b.0.is_none(), b.0, &b.1)));
        info!(dir = %self.dir.display(), files = files.len(), "Found HTML files");

        Ok(files
            .into_iter()
            .map(|(verse, path)| Candidate {
                location: path.display().to_string(),
                url: None,
                verse,
            })
            .collect())
    }

    async fn extract(&self, candidate: &Candidate) -> Result<Option<VerseRecord>, Box<dyn Error>> {
        let path = Path::new(&candidate.location);
        let bytes = fs::read(path).await?;
        let html = String::from_utf8_lossy(&bytes);
        debug!(path = %path.display(), bytes = bytes.len(), "Read cached page");
        Ok(self
            .extractor
            .extract_html(&html, SourceDescriptor::File { path }))
    }
}
