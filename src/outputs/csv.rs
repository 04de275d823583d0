//! Flat CSV export of the verse collection.
//!
//! One header row with the record field names, then one row per record.
//! Fields containing a comma, quote or line break are quoted and inner
//! quotes doubled, which purports (multi-paragraph) always need.

use crate::models::VerseRecord;
use std::error::Error;
use std::io::{self, Write};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

pub const HEADERS: [&str; 6] = [
    "verse_id",
    "devanagari",
    "verse_text",
    "translation",
    "purport",
    "url",
];

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row to any writer.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\n")
}

/// Render the whole collection, header row first.
pub fn to_csv_string(records: &[VerseRecord]) -> io::Result<String> {
    let mut buf = Vec::new();
    write_row(&mut buf, &HEADERS)?;
    for r in records {
        let url = r.url.as_deref().unwrap_or("");
        write_row(
            &mut buf,
            &[
                r.verse_id.as_str(),
                r.devanagari.as_str(),
                r.verse_text.as_str(),
                r.translation.as_str(),
                r.purport.as_str(),
                url,
            ],
        )?;
    }
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write the collection to `path`, creating parent directories as needed.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_records(path: &Path, records: &[VerseRecord]) -> Result<(), Box<dyn Error>> {
    let contents = to_csv_string(records)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, contents).await?;
    info!(count = records.len(), "Wrote CSV export");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_and_plain_row() {
        let records = vec![VerseRecord {
            verse_id: "Bg. 2.47".to_string(),
            translation: "You have a right".to_string(),
            url: Some("https://vedabase.io/en/library/bg/2/47/".to_string()),
            ..Default::default()
        }];
        let csv = to_csv_string(&records).unwrap();
        assert_eq!(
            csv,
            "verse_id,devanagari,verse_text,translation,purport,url\n\
             Bg. 2.47,,,You have a right,,https://vedabase.io/en/library/bg/2/47/\n"
        );
    }

    #[test]
    fn test_quotes_multiline_and_commas() {
        let records = vec![VerseRecord {
            verse_id: "Bg. 1.1".to_string(),
            translation: "Dhṛtarāṣṭra said: O Sañjaya, what did they do?".to_string(),
            purport: "First \"paragraph\".\n\nSecond.".to_string(),
            url: None,
            ..Default::default()
        }];
        let csv = to_csv_string(&records).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("Bg. 1.1,,,\"Dhṛtarāṣṭra said: O Sañjaya, what did they do?\",\"First \"\"paragraph\"\"."));
        assert!(csv.ends_with("Second.\",\n"));
    }

    #[tokio::test]
    async fn test_write_records_creates_nested_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out/nested/gita_verses.csv");
        let records = vec![VerseRecord {
            verse_id: "Bg. 2.47".to_string(),
            translation: "You have a right".to_string(),
            ..Default::default()
        }];

        write_records(&path, &records).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("verse_id,devanagari,verse_text,translation,purport,url\n"));
        assert_eq!(written, to_csv_string(&records).unwrap());
    }
}
