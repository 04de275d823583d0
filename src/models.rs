//! Data models for scraped verses and the expected scripture structure.
//!
//! This module defines the core data structures used throughout the application:
//! - [`VerseRecord`]: One extracted verse (or combined verse range) as persisted on disk
//! - [`VerseRef`]: A parsed `(chapter, start, end)` reference used for ordering and URLs
//! - [`Work`]: The scripture being scraped (identifier label, base URL)
//!
//! The JSON field names of [`VerseRecord`] are part of the on-disk format and
//! must not change; older progress files may lack some of them, so every
//! field has a serde default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Expected verse count per chapter of the Bhagavad-gita As It Is.
pub const BHAGAVAD_GITA_VERSE_COUNTS: [(u32, u32); 18] = [
    (1, 46),
    (2, 72),
    (3, 43),
    (4, 42),
    (5, 29),
    (6, 47),
    (7, 30),
    (8, 28),
    (9, 34),
    (10, 42),
    (11, 55),
    (12, 20),
    (13, 35),
    (14, 27),
    (15, 20),
    (16, 24),
    (17, 28),
    (18, 78),
];

/// The default chapter → verse count table, in chapter-ascending order.
pub fn default_chapter_counts() -> BTreeMap<u32, u32> {
    BHAGAVAD_GITA_VERSE_COUNTS.into_iter().collect()
}

/// A single verse, or a combined verse range, as extracted from a page.
///
/// Records are created once by extraction and never modified afterwards.
/// The `url` acts as the identity key inside the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct VerseRecord {
    /// Human-readable label such as `"Bg. 2.47"` or `"Bg. 1.16-18"`.
    #[serde(default)]
    pub verse_id: String,
    /// Original-script (Devanagari) text.
    #[serde(default)]
    pub devanagari: String,
    /// Transliteration of the verse.
    #[serde(default)]
    pub verse_text: String,
    /// English translation.
    #[serde(default)]
    pub translation: String,
    /// Commentary; paragraphs are separated by a blank line.
    #[serde(default)]
    pub purport: String,
    /// Canonical source URL, `None` when it could not be determined.
    #[serde(default)]
    pub url: Option<String>,
}

impl VerseRecord {
    /// The `(chapter, start, end)` reference encoded in `verse_id`, if any.
    pub fn verse_ref(&self) -> Option<VerseRef> {
        crate::codec::parse_verse_id(&self.verse_id)
    }
}

/// A chapter plus a verse or an inclusive range of verses.
///
/// `start == end` denotes a single verse. Ordering is chapter-major, then
/// start verse, then end verse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VerseRef {
    pub chapter: u32,
    pub start: u32,
    pub end: u32,
}

impl VerseRef {
    pub fn single(chapter: u32, verse: u32) -> Self {
        Self {
            chapter,
            start: verse,
            end: verse,
        }
    }

    /// Build a range reference. An `end` before `start` collapses to a single verse.
    pub fn range(chapter: u32, start: u32, end: u32) -> Self {
        Self {
            chapter,
            start,
            end: end.max(start),
        }
    }

    pub fn is_range(&self) -> bool {
        self.end > self.start
    }

    /// Number of verses covered.
    pub fn span(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn verses(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

impl fmt::Display for VerseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_range() {
            write!(f, "{}.{}-{}", self.chapter, self.start, self.end)
        } else {
            write!(f, "{}.{}", self.chapter, self.start)
        }
    }
}

/// The scripture being scraped.
///
/// `label` prefixes verse identifiers (`"Bg"` → `"Bg. 2.47"`); chapter and
/// verse path segments are appended to `base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Work {
    pub label: String,
    pub base_url: String,
}

impl Default for Work {
    fn default() -> Self {
        Self {
            label: "Bg".to_string(),
            base_url: "https://vedabase.io/en/library/bg/".to_string(),
        }
    }
}

impl Work {
    /// Format a verse identifier, e.g. `"Bg. 1.16-18"`.
    pub fn verse_id(&self, verse: VerseRef) -> String {
        format!("{}. {}", self.label, verse)
    }
}
