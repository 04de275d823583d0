//! JSON dataset files.
//!
//! Records are written as a pretty-printed array (two-space indentation) with
//! non-ASCII text such as Devanagari kept literal, so the files stay readable
//! and diffable by hand.

use crate::models::VerseRecord;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, error, instrument};

/// Serialize `records` to `path`, creating parent directories as needed.
#[instrument(level = "debug", skip_all, fields(path = %path.display(), count = records.len()))]
pub async fn write_records(path: &Path, records: &[VerseRecord]) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(records)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    debug!("Wrote JSON file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_records_pretty_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("verses.json");
        let records = vec![VerseRecord {
            verse_id: "Bg. 2.47".to_string(),
            devanagari: "कर्मण्येवाधिकारस्ते".to_string(),
            url: Some("https://vedabase.io/en/library/bg/2/47/".to_string()),
            ..Default::default()
        }];

        write_records(&path, &records).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n  {\n    \"verse_id\": \"Bg. 2.47\""));
        assert!(text.contains("कर्मण्येवाधिकारस्ते"));

        let back: Vec<VerseRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, records);
    }

    #[tokio::test]
    async fn test_write_empty_collection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");
        write_records(&path, &[]).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }
}
