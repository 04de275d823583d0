//! Verse field extraction from HTML pages.
//!
//! An [`Extractor`] turns a parsed verse page into a [`VerseRecord`]. The
//! identifier is mandatory: when no rule finds it and it cannot be recovered
//! from the page's URL or filename, extraction yields `None` and the caller
//! skips the page. The four text fields are best effort and fall back to an
//! empty string.
//!
//! The record URL depends on where the page came from (see
//! [`SourceDescriptor`]):
//! - a live fetch uses the fetched URL, canonicalized when it decodes to a verse
//! - a file on disk goes through [`codec::recover`]: breadcrumb trail,
//!   identifier, then filename

pub mod rules;

use crate::codec;
use crate::models::{VerseRecord, VerseRef, Work};
use rules::{first_match, parse_selector, FieldRules, Strategy};
use scraper::{Html, Selector};
use std::error::Error;
use std::path::Path;
use tracing::debug;

/// Where a page came from.
#[derive(Debug, Clone, Copy)]
pub enum SourceDescriptor<'a> {
    /// Fetched from the site; `url` is the final URL after redirects.
    Live { url: &'a str },
    /// Read from a saved HTML file.
    File { path: &'a Path },
}

impl SourceDescriptor<'_> {
    /// Verse reference implied by the URL or filename alone.
    pub fn verse_hint(&self) -> Option<VerseRef> {
        match self {
            SourceDescriptor::Live { url } => codec::parse_url(url),
            SourceDescriptor::File { path } => path.to_str().and_then(codec::parse_file_name),
        }
    }

    fn file_name(&self) -> Option<&str> {
        match self {
            SourceDescriptor::Live { .. } => None,
            SourceDescriptor::File { path } => path.file_name().and_then(|n| n.to_str()),
        }
    }
}

/// Compiled extraction rules for one work.
#[derive(Debug)]
pub struct Extractor {
    work: Work,
    verse_id: Vec<Strategy>,
    devanagari: Vec<Strategy>,
    verse_text: Vec<Strategy>,
    translation: Vec<Strategy>,
    purport: Vec<Strategy>,
    breadcrumb_links: Selector,
}

impl Extractor {
    /// Compile `rules` for `work`.
    ///
    /// # Errors
    ///
    /// Returns an error if any selector in the tables is invalid CSS.
    pub fn new(work: Work, rules: &FieldRules) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            work,
            verse_id: Strategy::compile_all(&rules.verse_id)?,
            devanagari: Strategy::compile_all(&rules.devanagari)?,
            verse_text: Strategy::compile_all(&rules.verse_text)?,
            translation: Strategy::compile_all(&rules.translation)?,
            purport: Strategy::compile_all(&rules.purport)?,
            breadcrumb_links: parse_selector(rules.breadcrumb_links)?,
        })
    }

    /// Extractor with the default vedabase.io rules.
    pub fn vedabase(work: Work) -> Result<Self, Box<dyn Error>> {
        Self::new(work, &FieldRules::default())
    }

    pub fn work(&self) -> &Work {
        &self.work
    }

    /// Parse `html` and extract a record from it.
    pub fn extract_html(&self, html: &str, source: SourceDescriptor<'_>) -> Option<VerseRecord> {
        let document = Html::parse_document(html);
        self.extract(&document, source)
    }

    /// Extract a record from a parsed page, or `None` without an identifier.
    pub fn extract(&self, document: &Html, source: SourceDescriptor<'_>) -> Option<VerseRecord> {
        let verse_id = match first_match(&self.verse_id, document) {
            Some(id) => id,
            None => {
                let recovered = self.work.verse_id(source.verse_hint()?);
                debug!(?source, verse_id = %recovered, "Recovered verse id from source name");
                recovered
            }
        };

        let field = |strategies: &[Strategy]| first_match(strategies, document).unwrap_or_default();
        let url = self.resolve_url(document, &verse_id, source);

        Some(VerseRecord {
            devanagari: field(&self.devanagari),
            verse_text: field(&self.verse_text),
            translation: field(&self.translation),
            purport: field(&self.purport),
            url,
            verse_id,
        })
    }

    fn resolve_url(&self, document: &Html, verse_id: &str, source: SourceDescriptor<'_>) -> Option<String> {
        match source {
            SourceDescriptor::Live { url } => Some(
                codec::parse_url(url)
                    .map(|verse| codec::verse_url(&self.work.base_url, verse))
                    .unwrap_or_else(|| url.to_string()),
            ),
            SourceDescriptor::File { .. } => {
                codec::recover(self.breadcrumb_chapter(document), verse_id, source.file_name())
                    .map(|verse| codec::verse_url(&self.work.base_url, verse))
            }
        }
    }

    /// Chapter from the navigation trail, when it has at least three links.
    fn breadcrumb_chapter(&self, document: &Html) -> Option<u32> {
        let links: Vec<_> = document.select(&self.breadcrumb_links).collect();
        if links.len() < 3 {
            return None;
        }
        links[links.len() - 2]
            .value()
            .attr("href")
            .and_then(codec::parse_chapter_link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CURRENT_2_47: &str = include_str!("../../tests/fixtures/current_2_47.html");
    const LEGACY_2_47: &str = include_str!("../../tests/fixtures/legacy_2_47.html");
    const COMBINED_1_16_18: &str = include_str!("../../tests/fixtures/combined_1_16_18.html");
    const NO_HEADING: &str = include_str!("../../tests/fixtures/no_heading.html");

    fn extractor() -> Extractor {
        Extractor::vedabase(Work::default()).unwrap()
    }

    #[test]
    fn test_current_layout_all_fields() {
        let record = extractor()
            .extract_html(CURRENT_2_47, SourceDescriptor::File { path: Path::new("2-47.html") })
            .unwrap();

        assert_eq!(record.verse_id, "Bg. 2.47");
        assert_eq!(record.devanagari, "कर्मण्येवाधिकारस्ते मा फलेषु कदाचन ।");
        assert_eq!(record.verse_text, "karmaṇy evādhikāras te mā phaleṣu kadācana");
        assert_eq!(
            record.translation,
            "You have a right to perform your prescribed duty, but you are not entitled to the fruits of action."
        );
        assert_eq!(
            record.purport,
            "There are three considerations here.\n\nPrescribed duties are activities."
        );
        assert_eq!(
            record.url.as_deref(),
            Some("https://vedabase.io/en/library/bg/2/47/")
        );
    }

    #[test]
    fn test_legacy_layout_live() {
        let url = "https://vedabase.io/en/library/bg/2/47/";
        let record = extractor()
            .extract_html(LEGACY_2_47, SourceDescriptor::Live { url })
            .unwrap();

        assert_eq!(record.verse_id, "Bg. 2.47");
        assert_eq!(record.devanagari, "कर्मण्येवाधिकारस्ते");
        assert_eq!(record.verse_text, "karmaṇy evādhikāras te");
        assert_eq!(record.translation, "You have a right to perform your prescribed duty.");
        assert_eq!(record.purport, "Legacy purport text.");
        assert_eq!(record.url.as_deref(), Some(url));
    }

    #[test]
    fn test_live_url_is_canonicalized() {
        let record = extractor()
            .extract_html(
                LEGACY_2_47,
                SourceDescriptor::Live { url: "https://vedabase.io/en/library/bg/2/47" },
            )
            .unwrap();
        assert_eq!(
            record.url.as_deref(),
            Some("https://vedabase.io/en/library/bg/2/47/")
        );
    }

    #[test]
    fn test_combined_verse_page() {
        let record = extractor()
            .extract_html(
                COMBINED_1_16_18,
                SourceDescriptor::File { path: Path::new("html_cache/1-16-18.html") },
            )
            .unwrap();
        assert_eq!(record.verse_id, "Bg. 1.16-18");
        assert_eq!(record.verse_ref(), Some(VerseRef::range(1, 16, 18)));
        assert_eq!(
            record.url.as_deref(),
            Some("https://vedabase.io/en/library/bg/1/16-18/")
        );
    }

    #[test]
    fn test_missing_heading_recovers_from_filename() {
        let record = extractor()
            .extract_html(NO_HEADING, SourceDescriptor::File { path: Path::new("raw_html/bg_2_47.html") })
            .unwrap();
        assert_eq!(record.verse_id, "Bg. 2.47");
        assert_eq!(
            record.url.as_deref(),
            Some("https://vedabase.io/en/library/bg/2/47/")
        );
    }

    #[test]
    fn test_missing_purport_is_empty() {
        let record = extractor()
            .extract_html(NO_HEADING, SourceDescriptor::File { path: Path::new("bg_2_47.html") })
            .unwrap();
        assert_eq!(record.purport, "");
        assert_eq!(record.translation, "Translation without commentary.");
        assert_eq!(record.devanagari, "");
    }

    #[test]
    fn test_missing_identifier_everywhere_is_none() {
        let extracted = extractor()
            .extract_html(NO_HEADING, SourceDescriptor::File { path: Path::new("page.html") });
        assert_eq!(extracted, None);
    }

    #[test]
    fn test_live_identifier_recovered_from_url() {
        let record = extractor()
            .extract_html(
                NO_HEADING,
                SourceDescriptor::Live { url: "https://vedabase.io/en/library/bg/1/16-18/" },
            )
            .unwrap();
        assert_eq!(record.verse_id, "Bg. 1.16-18");
    }

    #[test]
    fn test_source_verse_hint() {
        assert_eq!(
            SourceDescriptor::File { path: Path::new("cache/bg_1_16_18.html") }.verse_hint(),
            Some(VerseRef::range(1, 16, 18))
        );
        assert_eq!(
            SourceDescriptor::Live { url: "https://vedabase.io/en/library/bg/2/47/" }.verse_hint(),
            Some(VerseRef::single(2, 47))
        );
    }
}
