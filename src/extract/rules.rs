//! Extraction strategies and the vedabase.io rule tables.
//!
//! Every field is described by an ordered list of [`TextRule`]s. The first
//! rule that yields non-empty text wins; when none does the field is empty.
//! Supporting a markup change on the site means adding a rule to a table,
//! not touching the extractor.

use scraper::{ElementRef, Html, Selector};
use std::error::Error;

/// A declarative way to pull one text value out of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRule {
    /// Text of the first element matching the selector.
    First(&'static str),
    /// Inside the first `container`, text of the first element matching one
    /// of `inner`, tried in order.
    Within {
        container: &'static str,
        inner: &'static [&'static str],
    },
    /// Inside the first `container`, text of every `item`, in document order,
    /// separated by a blank line.
    JoinedWithin {
        container: &'static str,
        item: &'static str,
    },
    /// Text of the first element matching `selector`, keeping only what
    /// follows the last `separator` (breadcrumb trails).
    LastSegment {
        selector: &'static str,
        separator: char,
    },
}

/// Rule tables for every field of a verse page.
#[derive(Debug, Clone)]
pub struct FieldRules {
    pub verse_id: Vec<TextRule>,
    pub devanagari: Vec<TextRule>,
    pub verse_text: Vec<TextRule>,
    pub translation: Vec<TextRule>,
    pub purport: Vec<TextRule>,
    /// Links of the navigation trail; the second to last one points at the chapter.
    pub breadcrumb_links: &'static str,
}

impl Default for FieldRules {
    /// Current vedabase.io markup first, then the older `.verse-*` layout.
    fn default() -> Self {
        Self {
            verse_id: vec![
                TextRule::First(r#"h1[id^="bb"]"#),
                TextRule::First(r#".text-center[id^="bb"]"#),
                TextRule::First(r#"[id^="bb"]"#),
                TextRule::LastSegment {
                    selector: ".wrapper-breadcrumbs",
                    separator: '»',
                },
            ],
            devanagari: vec![
                TextRule::Within {
                    container: ".av-devanagari",
                    inner: &[r".em\:text-lg", ".text-center"],
                },
                TextRule::First(".verse-sanskrit"),
            ],
            verse_text: vec![
                TextRule::Within {
                    container: ".av-verse_text",
                    inner: &[".text-center.italic", ".italic"],
                },
                TextRule::First(".verse-transliteration"),
            ],
            translation: vec![
                TextRule::Within {
                    container: ".av-translation",
                    inner: &[".s-justify"],
                },
                TextRule::First(".verse-translation"),
            ],
            purport: vec![
                TextRule::JoinedWithin {
                    container: ".av-purport",
                    item: ".s-justify",
                },
                TextRule::First(".verse-purport"),
            ],
            breadcrumb_links: ".breadcrumb a",
        }
    }
}

/// A [`TextRule`] with its selectors parsed.
#[derive(Debug)]
pub enum Strategy {
    First(Selector),
    Within { container: Selector, inner: Vec<Selector> },
    JoinedWithin { container: Selector, item: Selector },
    LastSegment { selector: Selector, separator: char },
}

pub(crate) fn parse_selector(css: &'static str) -> Result<Selector, Box<dyn Error>> {
    Ok(Selector::parse(css)?)
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

impl Strategy {
    pub fn compile(rule: &TextRule) -> Result<Self, Box<dyn Error>> {
        Ok(match *rule {
            TextRule::First(css) => Strategy::First(parse_selector(css)?),
            TextRule::Within { container, inner } => Strategy::Within {
                container: parse_selector(container)?,
                inner: inner
                    .iter()
                    .copied()
                    .map(parse_selector)
                    .collect::<Result<_, _>>()?,
            },
            TextRule::JoinedWithin { container, item } => Strategy::JoinedWithin {
                container: parse_selector(container)?,
                item: parse_selector(item)?,
            },
            TextRule::LastSegment {
                selector,
                separator,
            } => Strategy::LastSegment {
                selector: parse_selector(selector)?,
                separator,
            },
        })
    }

    pub fn compile_all(rules: &[TextRule]) -> Result<Vec<Self>, Box<dyn Error>> {
        rules.iter().map(Strategy::compile).collect()
    }

    /// Trimmed text for this strategy, `None` when absent or blank.
    pub fn apply(&self, document: &Html) -> Option<String> {
        let text = match self {
            Strategy::First(sel) => document.select(sel).next().map(element_text),
            Strategy::Within { container, inner } => {
                let root = document.select(container).next()?;
                inner
                    .iter()
                    .find_map(|sel| root.select(sel).next())
                    .map(element_text)
            }
            Strategy::JoinedWithin { container, item } => {
                let root = document.select(container).next()?;
                let paragraphs: Vec<String> = root
                    .select(item)
                    .map(element_text)
                    .filter(|p| !p.is_empty())
                    .collect();
                Some(paragraphs.join("\n\n"))
            }
            Strategy::LastSegment {
                selector,
                separator,
            } => document.select(selector).next().and_then(|el| {
                element_text(el)
                    .rsplit(*separator)
                    .next()
                    .map(|s| s.trim().to_string())
            }),
        };
        text.and_then(non_empty)
    }
}

/// Apply strategies in order and return the first non-empty value.
pub fn first_match(strategies: &[Strategy], document: &Html) -> Option<String> {
    strategies.iter().find_map(|s| s.apply(document))
}
