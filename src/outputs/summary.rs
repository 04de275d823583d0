//! Per-chapter completeness report.

use crate::store::VerseStore;
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSummary {
    pub chapter: u32,
    pub expected: u32,
    /// Distinct verses covered, counting every verse of a combined record.
    pub covered: u32,
    /// Records whose identifier falls in this chapter.
    pub records: usize,
}

impl ChapterSummary {
    pub fn is_complete(&self) -> bool {
        self.covered >= self.expected
    }
}

/// Compare the store against the expected verse counts, chapter-ascending.
pub fn chapter_summaries(store: &VerseStore, expected: &BTreeMap<u32, u32>) -> Vec<ChapterSummary> {
    let coverage = store.coverage();
    let mut records: BTreeMap<u32, usize> = BTreeMap::new();
    for verse in store.records().iter().filter_map(|r| r.verse_ref()) {
        *records.entry(verse.chapter).or_default() += 1;
    }

    expected
        .iter()
        .map(|(&chapter, &count)| ChapterSummary {
            chapter,
            expected: count,
            covered: coverage
                .get(&chapter)
                .map(|vs| vs.iter().filter(|&&v| v >= 1 && v <= count).count() as u32)
                .unwrap_or(0),
            records: records.get(&chapter).copied().unwrap_or(0),
        })
        .collect()
}

/// Render the summary as console lines, one per chapter.
pub fn render(summaries: &[ChapterSummary]) -> String {
    let mut out = String::from("Verse count summary:\n");
    for s in summaries {
        let status = if s.is_complete() { "✓" } else { "✗" };
        let _ = writeln!(
            out,
            "Chapter {}: {}/{} verses ({} records) {}",
            s.chapter, s.covered, s.expected, s.records, status
        );
    }
    let total_expected: u32 = summaries.iter().map(|s| s.expected).sum();
    let total_covered: u32 = summaries.iter().map(|s| s.covered).sum();
    let _ = writeln!(out, "Total: {}/{} verses", total_covered, total_expected);
    out
}
