//! Configuration file parser for `govfeeds.toml`.
//!
//! The config file is optional: a missing or empty file yields
//! `Config::default()`, whose values target the gov.hk RSS directory pages.
//! Unknown keys are accepted but logged as warnings, since they are usually typos.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::pipeline::InsertMode;
use crate::summarize::SummaryMethod;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory pages listing the feeds to harvest.
    pub directory_urls: Vec<String>,

    /// SQLite file holding the `rss_feed` table.
    pub database_path: String,

    /// Class an anchor must carry on a directory page to count as a feed link.
    pub link_class: String,

    /// Path suffix a feed link must end with.
    pub feed_suffix: String,

    /// Hosts whose feeds are skipped.
    pub excluded_hosts: Vec<String>,

    /// CSS selector for the main-content container of article pages.
    pub content_selector: String,

    /// Timeout for directory, feed and article requests.
    pub request_timeout_secs: u64,

    pub insert_mode: InsertMode,

    pub summarizer: SummarizerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory_urls: vec![
                "https://www.gov.hk/tc/about/rss.htm".to_string(),
                "https://www.gov.hk/en/about/rss.htm".to_string(),
            ],
            database_path: "rss_feeds.db".to_string(),
            link_class: "contentLink".to_string(),
            feed_suffix: "rss.xml".to_string(),
            excluded_hosts: vec!["www.lcsd.gov.hk".to_string(), "www.edb.gov.hk".to_string()],
            content_selector: "main".to_string(),
            request_timeout_secs: 30,
            insert_mode: InsertMode::default(),
            summarizer: SummarizerConfig::default(),
        }
    }
}

/// `[summarizer]` table: the local Ollama model and how texts are chunked.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Summaries are off unless enabled here or with `run --summarize`.
    pub enabled: bool,
    pub model: String,
    pub temperature: f32,
    pub base_url: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub method: SummaryMethod,
    /// Generation is slow on CPU, so this is separate from `request_timeout_secs`.
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "llama3".to_string(),
            temperature: 0.3,
            base_url: "http://localhost:11434".to_string(),
            chunk_size: 4000,
            chunk_overlap: 200,
            method: SummaryMethod::default(),
            timeout_secs: 300,
        }
    }
}

const KNOWN_KEYS: &[&str] = &[
    "directory_urls",
    "database_path",
    "link_class",
    "feed_suffix",
    "excluded_hosts",
    "content_selector",
    "request_timeout_secs",
    "insert_mode",
    "summarizer",
];

const KNOWN_SUMMARIZER_KEYS: &[&str] = &[
    "enabled",
    "model",
    "temperature",
    "base_url",
    "chunk_size",
    "chunk_overlap",
    "method",
    "timeout_secs",
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            directories = config.directory_urls.len(),
            database = %config.database_path,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses TOML text, warning about keys this version does not know.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
            if let Some(toml::Value::Table(section)) = raw.get("summarizer") {
                for key in section.keys() {
                    if !KNOWN_SUMMARIZER_KEYS.contains(&key.as_str()) {
                        tracing::warn!(key = %key, "Unknown key in [summarizer], ignoring");
                    }
                }
            }
        }

        Ok(toml::from_str(content)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
