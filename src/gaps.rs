//! Missing-verse detection.
//!
//! Compares the expected verse count of each chapter against the verses
//! already present in the store and reports every maximal run of missing
//! verses as a [`VerseRef`]. A run of length one is a single missing verse; a
//! longer run is a candidate combined-verse page.

use crate::models::VerseRef;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};

/// Compute missing verse runs, ascending by chapter then start verse.
///
/// Chapters missing from `recorded` are treated as empty. Chapters in
/// `recorded` but not in `expected` are ignored, as are recorded verse
/// numbers beyond the expected count.
pub fn find_gaps(
    recorded: &BTreeMap<u32, BTreeSet<u32>>,
    expected: &BTreeMap<u32, u32>,
) -> Vec<VerseRef> {
    let empty = BTreeSet::new();
    let mut gaps = Vec::new();

    for (&chapter, &count) in expected {
        let present = recorded.get(&chapter).unwrap_or(&empty);
        let missing = (1..=count).filter(|v| !present.contains(v));

        // Consecutive numbers share the same `verse - index` key
        for (_, run) in &missing
            .enumerate()
            .chunk_by(|(i, verse)| *verse as i64 - *i as i64)
        {
            let run: Vec<u32> = run.map(|(_, verse)| verse).collect();
            if let (Some(&start), Some(&end)) = (run.first(), run.last()) {
                gaps.push(VerseRef::range(chapter, start, end));
            }
        }
    }

    gaps
}
