//! Configuration file parser for `rss-builder.toml`.
//!
//! The config file is optional: a missing or empty file yields
//! `Config::default()`, which publishes the built-in sources into `output/`.
//! Unknown keys are accepted but logged as warnings, since they are usually
//! typos.
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::sources::{
    builtin_sources, DefinitionError, DescriptionRule, HttpSettings, ListingRules, ListingSource,
    Source,
};
use crate::util::{file_stem, DateFormat};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "rss-builder.toml";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds the maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory the feed files are written to, created if missing.
    pub output_dir: PathBuf,

    /// `User-Agent` header sent on every request.
    pub user_agent: String,

    /// Per-request timeout in seconds. Must be positive.
    pub request_timeout_secs: u64,

    /// Largest accepted response body in bytes. Must be positive.
    pub max_page_bytes: usize,

    /// Extra selector-driven sources, published after the built-in ones.
    pub sources: Vec<SourceDefinition>,
}

impl Default for Config {
    fn default() -> Self {
        let http = HttpSettings::default();
        Self {
            output_dir: PathBuf::from("output"),
            user_agent: http.user_agent,
            request_timeout_secs: http.timeout.as_secs(),
            max_page_bytes: http.max_page_bytes,
            sources: Vec::new(),
        }
    }
}

/// A `[[sources]]` table: a listing page with one CSS selector per field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceDefinition {
    pub name: String,
    pub url: String,
    /// Base for relative links; defaults to the root of `url`
    #[serde(default)]
    pub origin: Option<String>,
    pub entry: String,
    pub title: String,
    pub date: String,
    pub date_format: DateFormat,
    pub link: String,
    /// Description read from the listing entry
    #[serde(default)]
    pub description: Option<String>,
    /// Description read from the entry's own page
    #[serde(default)]
    pub description_page: Option<String>,
}

impl SourceDefinition {
    const KNOWN_KEYS: [&'static str; 10] = [
        "name",
        "url",
        "origin",
        "entry",
        "title",
        "date",
        "date_format",
        "link",
        "description",
        "description_page",
    ];

    pub fn into_source(self, http: HttpSettings) -> Result<ListingSource, DefinitionError> {
        let description = match (self.description, self.description_page) {
            (Some(_), Some(_)) => return Err(DefinitionError::ConflictingDescription(self.name)),
            (Some(css), None) => DescriptionRule::Listing(css),
            (None, Some(css)) => DescriptionRule::Page(css),
            (None, None) => DescriptionRule::None,
        };
        let rules = ListingRules {
            entry: self.entry,
            title: self.title,
            date: self.date,
            date_format: self.date_format,
            link: self.link,
            description,
        };

        let source = ListingSource::new(self.name, self.url, rules, http)?;
        match self.origin {
            Some(origin) => source.with_origin(&origin),
            None => Ok(source),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "output_dir",
        "user_agent",
        "request_timeout_secs",
        "max_page_bytes",
        "sources",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Out-of-range values → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check size before reading so a huge file is never pulled into memory
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

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            warn_unknown_keys(&raw);
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            output_dir = %config.output_dir.display(),
            extra_sources = config.sources.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.max_page_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_page_bytes must be greater than 0".into(),
            ));
        }
        if self.user_agent.trim().is_empty() || self.user_agent.chars().any(char::is_control) {
            return Err(ConfigError::Invalid(
                "user_agent must be non-empty printable text".into(),
            ));
        }
        Ok(())
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            max_page_bytes: self.max_page_bytes,
        }
    }

    /// The built-in sources followed by the configured ones.
    ///
    /// Fails on an unusable definition or when two sources would write the
    /// same feed file.
    pub fn all_sources(&self) -> Result<Vec<Arc<dyn Source>>, ConfigError> {
        let http = self.http_settings();
        let mut sources =
            builtin_sources(&http).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        for definition in &self.sources {
            let name = definition.name.clone();
            let source = definition
                .clone()
                .into_source(http.clone())
                .map_err(|e| ConfigError::Invalid(format!("source {name:?}: {e}")))?;
            sources.push(Arc::new(source));
        }

        let mut seen: HashMap<String, &str> = HashMap::new();
        for source in &sources {
            let key = file_stem(source.name()).to_lowercase();
            if let Some(existing) = seen.insert(key, source.name()) {
                return Err(ConfigError::Invalid(format!(
                    "sources {existing:?} and {:?} would write the same feed file",
                    source.name()
                )));
            }
        }

        Ok(sources)
    }
}

fn warn_unknown_keys(raw: &toml::Table) {
    for key in raw.keys() {
        if !Config::KNOWN_KEYS.contains(&key.as_str()) {
            tracing::warn!(key = %key, "Unknown key in config file, ignoring");
        }
    }

    let Some(toml::Value::Array(tables)) = raw.get("sources") else {
        return;
    };
    for (index, table) in tables.iter().enumerate() {
        let Some(table) = table.as_table() else {
            continue;
        };
        for key in table.keys() {
            if !SourceDefinition::KNOWN_KEYS.contains(&key.as_str()) {
                tracing::warn!(key = %key, source = index, "Unknown key in [[sources]] entry, ignoring");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
