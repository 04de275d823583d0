//! Conversions between verse references, source URLs and cache filenames.
//!
//! Encoding always produces the canonical form:
//!
//! | Reference | URL | Cache filename |
//! |-----------|-----|----------------|
//! | `2.47` | `<base>2/47/` | `2-47.html` |
//! | `1.16-18` | `<base>1/16-18/` | `1-16-18.html` |
//!
//! Decoding is lenient and accepts identifiers (`Bg. 1.16-18`), URLs, and
//! both filename families found in the wild (`bg_1_16_18.html` from raw page
//! dumps, `1-16-18.html` from the response cache).

use crate::models::VerseRef;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::Path;

static VERSE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z]+\.\s*(\d+)\.(\d+)(?:\s*[-–]\s*(\d+))?").expect("valid verse id regex")
});
static URL_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d+)/(\d+)(?:-(\d+))?/?$").expect("valid url regex"));
static SLUG_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z]+_(\d+)_(\d+)(?:_(\d+))?").expect("valid slug filename regex")
});
static DASH_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)-(\d+)(?:-(\d+))?").expect("valid dash filename regex"));
static CHAPTER_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d+)/?$").expect("valid chapter link regex"));
static TRAILING_VERSES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)(?:\s*[-–]\s*(\d+))?\s*$").expect("valid trailing verse regex"));

/// Canonical page URL for a verse or verse range.
pub fn verse_url(base_url: &str, verse: VerseRef) -> String {
    let base = base_url.trim_end_matches('/');
    if verse.is_range() {
        format!("{}/{}/{}-{}/", base, verse.chapter, verse.start, verse.end)
    } else {
        format!("{}/{}/{}/", base, verse.chapter, verse.start)
    }
}

/// Filename under which a fetched page is cached.
pub fn cache_file_name(verse: VerseRef) -> String {
    if verse.is_range() {
        format!("{}-{}-{}.html", verse.chapter, verse.start, verse.end)
    } else {
        format!("{}-{}.html", verse.chapter, verse.start)
    }
}

fn number(caps: &Captures<'_>, i: usize) -> Option<u32> {
    caps.get(i).and_then(|m| m.as_str().parse().ok())
}

fn from_captures(caps: &Captures<'_>) -> Option<VerseRef> {
    let chapter = number(caps, 1)?;
    let start = number(caps, 2)?;
    Some(match number(caps, 3) {
        Some(end) => VerseRef::range(chapter, start, end),
        None => VerseRef::single(chapter, start),
    })
}

/// Parse an identifier such as `"Bg. 2.47"` or `"Bg. 1.16-18"`.
///
/// The pattern may appear anywhere in the string, so breadcrumb text like
/// `"Chapter 2 » Bg. 2.47"` also parses.
pub fn parse_verse_id(verse_id: &str) -> Option<VerseRef> {
    VERSE_ID_RE.captures(verse_id).and_then(|c| from_captures(&c))
}

/// Parse a verse page URL (`.../bg/1/16-18/`).
pub fn parse_url(url: &str) -> Option<VerseRef> {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    URL_PATH_RE.captures(&path).and_then(|c| from_captures(&c))
}

/// Parse a cached page filename or path.
///
/// `bg_2_47.html`, `bg_1_16_18.html`, `2-47.html` and `1-16-18` are all
/// accepted; only the final path component is inspected.
pub fn parse_file_name(file_name: &str) -> Option<VerseRef> {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);
    SLUG_FILE_RE
        .captures(name)
        .or_else(|| DASH_FILE_RE.captures(name))
        .and_then(|c| from_captures(&c))
}

/// Chapter number from a breadcrumb chapter link (`/en/library/bg/2/`).
pub fn parse_chapter_link(href: &str) -> Option<u32> {
    let path = url::Url::parse(href)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| href.to_string());
    CHAPTER_LINK_RE
        .captures(&path)
        .and_then(|c| number(&c, 1))
}

/// Recover a verse reference for a page with no live URL.
///
/// Tried in order, first success wins:
/// 1. chapter from the breadcrumb trail plus the verse number(s) ending the identifier
/// 2. the identifier itself
/// 3. the filename
pub fn recover(
    breadcrumb_chapter: Option<u32>,
    verse_id: &str,
    file_name: Option<&str>,
) -> Option<VerseRef> {
    breadcrumb_chapter
        .and_then(|chapter| {
            let caps = TRAILING_VERSES_RE.captures(verse_id)?;
            let start = number(&caps, 1)?;
            Some(match number(&caps, 2) {
                Some(end) => VerseRef::range(chapter, start, end),
                None => VerseRef::single(chapter, start),
            })
        })
        .or_else(|| parse_verse_id(verse_id))
        .or_else(|| file_name.and_then(parse_file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://vedabase.io/en/library/bg/";

    #[test]
    fn test_verse_url_single_and_range() {
        assert_eq!(
            verse_url(BASE, VerseRef::single(2, 47)),
            "https://vedabase.io/en/library/bg/2/47/"
        );
        assert_eq!(
            verse_url(BASE, VerseRef::range(1, 16, 18)),
            "https://vedabase.io/en/library/bg/1/16-18/"
        );
        // Missing trailing slash on the base is tolerated
        assert_eq!(
            verse_url("https://vedabase.io/en/library/bg", VerseRef::single(3, 1)),
            "https://vedabase.io/en/library/bg/3/1/"
        );
    }

    #[test]
    fn test_combined_verse_roundtrip() {
        let verse = VerseRef::range(1, 16, 18);
        let url = verse_url(BASE, verse);
        assert!(url.ends_with("/1/16-18/"));
        assert_eq!(parse_url(&url), Some(verse));
        assert_eq!(parse_file_name("bg_1_16_18.html"), Some(verse));
        assert_eq!(parse_file_name("1-16-18"), Some(verse));
        assert_eq!(parse_file_name(&cache_file_name(verse)), Some(verse));
    }

    #[test]
    fn test_cache_file_name() {
        assert_eq!(cache_file_name(VerseRef::single(2, 47)), "2-47.html");
        assert_eq!(cache_file_name(VerseRef::range(1, 16, 18)), "1-16-18.html");
    }

    #[test]
    fn test_parse_verse_id() {
        assert_eq!(parse_verse_id("Bg. 2.47"), Some(VerseRef::single(2, 47)));
        assert_eq!(parse_verse_id("Bg.2.47"), Some(VerseRef::single(2, 47)));
        assert_eq!(
            parse_verse_id("Bg. 1.16-18"),
            Some(VerseRef::range(1, 16, 18))
        );
        assert_eq!(
            parse_verse_id("Bhagavad-gītā As It Is » Chapter 2 » Bg. 2.47"),
            Some(VerseRef::single(2, 47))
        );
        assert_eq!(parse_verse_id("Chapter Two"), None);
        assert_eq!(parse_verse_id(""), None);
    }

    #[test]
    fn test_parse_url() {
        assert_eq!(
            parse_url("https://vedabase.io/en/library/bg/18/78/"),
            Some(VerseRef::single(18, 78))
        );
        assert_eq!(
            parse_url("https://vedabase.io/en/library/bg/18/78"),
            Some(VerseRef::single(18, 78))
        );
        assert_eq!(parse_url("https://vedabase.io/en/library/bg/"), None);
        assert_eq!(parse_url("not a url"), None);
    }

    #[test]
    fn test_parse_file_name() {
        assert_eq!(parse_file_name("bg_2_47.html"), Some(VerseRef::single(2, 47)));
        assert_eq!(parse_file_name("2-47.html"), Some(VerseRef::single(2, 47)));
        assert_eq!(
            parse_file_name("raw_html/bg_2_47.html"),
            Some(VerseRef::single(2, 47))
        );
        assert_eq!(parse_file_name("index.html"), None);
    }

    #[test]
    fn test_parse_chapter_link() {
        assert_eq!(parse_chapter_link("/en/library/bg/2/"), Some(2));
        assert_eq!(
            parse_chapter_link("https://vedabase.io/en/library/bg/11/"),
            Some(11)
        );
        assert_eq!(parse_chapter_link("/en/library/bg/"), None);
    }

    #[test]
    fn test_recover_prefers_breadcrumb() {
        // Breadcrumb chapter wins over a mismatching identifier chapter
        assert_eq!(
            recover(Some(4), "Bg. 2.47", Some("bg_9_9.html")),
            Some(VerseRef::single(4, 47))
        );
        assert_eq!(
            recover(Some(1), "Bg. 1.16-18", None),
            Some(VerseRef::range(1, 16, 18))
        );
    }

    #[test]
    fn test_recover_falls_back_in_order() {
        assert_eq!(
            recover(None, "Bg. 2.47", Some("bg_9_9.html")),
            Some(VerseRef::single(2, 47))
        );
        assert_eq!(
            recover(None, "Text", Some("bg_9_9.html")),
            Some(VerseRef::single(9, 9))
        );
        assert_eq!(recover(None, "Text", Some("index.html")), None);
        assert_eq!(recover(None, "Text", None), None);
    }
}
