//! Runtime configuration.
//!
//! Everything has a default matching the vedabase.io Bhagavad-gita layout,
//! so the scraper runs without a config file. A YAML file can override any
//! subset of fields:
//!
//! ```yaml
//! store:
//!   progress: data/gita_verses_progress.json
//!   release: data/gita_verses.json
//! http:
//!   max_attempts: 5
//!   pace_min_ms: 1000
//! save_html: true
//! ```
//!
//! Command-line flags are applied on top of the file (see [`crate::cli`]).

use crate::fetch::HttpSettings;
use crate::models::{default_chapter_counts, Work};
use crate::store::StorePaths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub work: Work,
    pub store: StoreConfig,
    pub http: HttpConfig,
    /// Save every fetched page into `store.cache_dir`.
    pub save_html: bool,
    /// Longest gap run (in verses) tried as a single combined-verse page.
    pub max_combined_span: u32,
    /// Expected verse count per chapter.
    pub chapters: BTreeMap<u32, u32>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            work: Work::default(),
            store: StoreConfig::default(),
            http: HttpConfig::default(),
            save_html: false,
            max_combined_span: 6,
            chapters: default_chapter_counts(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub progress: PathBuf,
    pub release: PathBuf,
    pub csv: PathBuf,
    /// Responses saved by the live pass (`2-47.html`, `1-16-18.html`).
    pub cache_dir: PathBuf,
    /// Raw page dumps (`bg_2_47.html`).
    pub raw_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            progress: PathBuf::from("gita_verses_progress.json"),
            release: PathBuf::from("gita_verses.json"),
            csv: PathBuf::from("gita_verses.csv"),
            cache_dir: PathBuf::from("html_cache"),
            raw_dir: PathBuf::from("raw_html"),
        }
    }
}

impl StoreConfig {
    pub fn paths(&self) -> StorePaths {
        StorePaths {
            progress: self.progress.clone(),
            release: self.release.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_attempts: usize,
    pub backoff_base_ms: u64,
    pub backoff_factor: u32,
    pub max_backoff_secs: u64,
    pub pace_min_ms: u64,
    pub pace_max_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            timeout_secs: 30,
            max_attempts: 3,
            backoff_base_ms: 1500,
            backoff_factor: 2,
            max_backoff_secs: 30,
            pace_min_ms: 2500,
            pace_max_ms: 5000,
        }
    }
}

impl ScraperConfig {
    /// Read a YAML config file, or return the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
                let config = Self::from_yaml(&text)?;
                info!(path = %path.display(), "Loaded configuration");
                Ok(config)
            }
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, Box<dyn Error>> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.http.pace_min_ms > self.http.pace_max_ms {
            return Err(format!(
                "http.pace_min_ms ({}) exceeds http.pace_max_ms ({})",
                self.http.pace_min_ms, self.http.pace_max_ms
            )
            .into());
        }
        if self.store.progress == self.store.release {
            return Err("store.progress and store.release must be different files".into());
        }
        if self.chapters.is_empty() {
            return Err("chapters table is empty".into());
        }
        Ok(())
    }

    /// Expected counts restricted to `only` (all chapters when empty).
    pub fn expected_counts(&self, only: &[u32]) -> BTreeMap<u32, u32> {
        self.chapters
            .iter()
            .filter(|(c, _)| only.is_empty() || only.contains(c))
            .map(|(&c, &n)| (c, n))
            .collect()
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            user_agent: self.http.user_agent.clone(),
            referer: self.work.base_url.clone(),
            timeout: Duration::from_secs(self.http.timeout_secs),
            pacing: Duration::from_millis(self.http.pace_min_ms)
                ..=Duration::from_millis(self.http.pace_max_ms),
            max_attempts: self.http.max_attempts,
            backoff_base: Duration::from_millis(self.http.backoff_base_ms),
            backoff_factor: self.http.backoff_factor,
            max_backoff: Duration::from_secs(self.http.max_backoff_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScraperConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chapters.len(), 18);
        assert_eq!(config.store.progress, PathBuf::from("gita_verses_progress.json"));
        assert_eq!(config.work.base_url, "https://vedabase.io/en/library/bg/");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
store:
  progress: data/progress.json
http:
  max_attempts: 5
save_html: true
"#;
        let config = ScraperConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.store.progress, PathBuf::from("data/progress.json"));
        assert_eq!(config.store.release, PathBuf::from("gita_verses.json"));
        assert_eq!(config.http.max_attempts, 5);
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.save_html);
        assert_eq!(config.chapters[&18], 78);
    }

    #[test]
    fn test_chapters_override() {
        let yaml = "chapters:\n  1: 3\n  2: 4\n";
        let config = ScraperConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.chapters, BTreeMap::from([(1, 3), (2, 4)]));
    }

    #[test]
    fn test_invalid_pacing_rejected() {
        let yaml = "http:\n  pace_min_ms: 10\n  pace_max_ms: 5\n";
        assert!(ScraperConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_same_progress_and_release_rejected() {
        let yaml = "store:\n  progress: a.json\n  release: a.json\n";
        assert!(ScraperConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_expected_counts_filter() {
        let config = ScraperConfig::default();
        assert_eq!(config.expected_counts(&[]).len(), 18);
        assert_eq!(
            config.expected_counts(&[2, 18]),
            BTreeMap::from([(2, 72), (18, 78)])
        );
    }

    #[test]
    fn test_http_settings() {
        let settings = ScraperConfig::default().http_settings();
        assert_eq!(settings.pacing, Duration::from_millis(2500)..=Duration::from_millis(5000));
        assert_eq!(settings.backoff_base, Duration::from_millis(1500));
        assert_eq!(settings.referer, "https://vedabase.io/en/library/bg/");
    }
}
