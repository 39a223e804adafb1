//! Application configuration module
//!
//! Loads the per-language translation configuration (YAML) and the provider
//! settings that shape each request.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::default::Default;
use std::fs;
use std::path::Path;
use url::Url;

use crate::errors::ConfigError;

/// Keys every translation configuration must define
pub const REQUIRED_KEYS: [&str; 3] = ["language", "translation_mapping", "bible_verse_translation"];

/// One verbatim override the translator must apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    /// Phrase as it appears in the source
    pub source: String,
    /// Phrase to use in the translation
    pub target: String,
}

/// Per-run translation configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationConfig {
    /// Target language name as it should appear in the instruction
    pub language: String,

    /// Override pairs, in file order
    pub glossary: Vec<GlossaryEntry>,

    /// Canonical Bible translation for quoted verses
    pub bible_verse_translation: String,

    /// Provider settings from the optional `provider` section
    pub provider: ProviderSettings,
}

impl TranslationConfig {
    /// Load and validate a YAML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("Failed to load YAML file {}: {}", path.display(), e)))?;

        debug!("Loading translation configuration from {}", path.display());
        Self::from_yaml_str(&content)
    }

    /// Parse and validate YAML configuration text
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        // Presence is checked on the raw document so the first absent key is reported by name
        for key in REQUIRED_KEYS {
            if value.get(key).is_none() {
                return Err(ConfigError::KeyMissing(key.to_string()));
            }
        }

        let language = required_string(&value, "language")?;
        let bible_verse_translation = required_string(&value, "bible_verse_translation")?;
        let glossary = glossary_from_value(value.get("translation_mapping").unwrap_or(&Value::Null));

        let provider = match value.get("provider") {
            Some(Value::Null) | None => ProviderSettings::default(),
            Some(section) => serde_yaml::from_value(section.clone())
                .map_err(|e| ConfigError::Parse(format!("invalid 'provider' section: {}", e)))?,
        };
        provider.validate()?;

        Ok(Self {
            language,
            glossary,
            bible_verse_translation,
            provider,
        })
    }
}

fn required_string(value: &Value, key: &str) -> Result<String, ConfigError> {
    let text = value.get(key).and_then(scalar_to_string).unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            expected: "a non-empty string".to_string(),
        });
    }
    Ok(text.trim().to_string())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Collect override pairs from the `translation_mapping` value.
///
/// Anything other than a mapping yields an empty glossary.
fn glossary_from_value(value: &Value) -> Vec<GlossaryEntry> {
    let map = match value {
        Value::Mapping(map) => map,
        Value::Null => return Vec::new(),
        other => {
            warn!("'translation_mapping' is not a mapping ({:?}), no overrides will be applied", other);
            return Vec::new();
        }
    };

    let mut glossary = Vec::with_capacity(map.len());
    for (key, target) in map {
        match (scalar_to_string(key), scalar_to_string(target)) {
            (Some(source), Some(target)) => glossary.push(GlossaryEntry { source, target }),
            _ => warn!("Ignoring translation mapping entry {:?}: {:?}", key, target),
        }
    }
    glossary
}

/// Settings for the text-generation provider
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProviderSettings {
    /// Model name
    pub model: String,

    /// Service base URL
    pub endpoint: String,

    /// Output token ceiling per request
    pub max_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Additional attempts for a failed batch (0 disables retry)
    pub retry_count: u32,

    /// Base delay for exponential backoff in milliseconds
    pub retry_backoff_ms: u64,

    /// Batches in flight at once; results are always kept in batch order
    pub concurrent_requests: usize,

    /// Maximum subtitle blocks per request
    pub max_blocks_per_batch: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            model: default_anthropic_model(),
            endpoint: default_anthropic_endpoint(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            concurrent_requests: 1,
            max_blocks_per_batch: default_max_blocks_per_batch(),
        }
    }
}

impl ProviderSettings {
    /// Validate the provider settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(invalid("model", "a non-empty model name"));
        }

        match Url::parse(&self.endpoint) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => return Err(invalid("endpoint", "an http(s) URL")),
        }

        if self.max_tokens == 0 {
            return Err(invalid("max_tokens", "greater than 0"));
        }

        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "greater than 0"));
        }

        if self.concurrent_requests == 0 {
            return Err(invalid("concurrent_requests", "at least 1"));
        }

        if self.max_blocks_per_batch == 0 {
            return Err(invalid("max_blocks_per_batch", "at least 1"));
        }

        Ok(())
    }
}

/// Command-line overrides applied on top of the configuration file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub retry_count: Option<u32>,
    pub concurrent_requests: Option<usize>,
    pub max_blocks_per_batch: Option<usize>,
}

impl SettingsOverrides {
    /// Overwrite every field that was given on the command line
    pub fn apply(&self, settings: &mut ProviderSettings) {
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            settings.endpoint = endpoint.clone();
        }
        if let Some(max_tokens) = self.max_tokens {
            settings.max_tokens = max_tokens;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            settings.timeout_secs = timeout_secs;
        }
        if let Some(retry_count) = self.retry_count {
            settings.retry_count = retry_count;
        }
        if let Some(concurrent_requests) = self.concurrent_requests {
            settings.concurrent_requests = concurrent_requests;
        }
        if let Some(max_blocks_per_batch) = self.max_blocks_per_batch {
            settings.max_blocks_per_batch = max_blocks_per_batch;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn invalid(key: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        expected: expected.to_string(),
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_anthropic_model() -> String {
    "claude-3-7-sonnet-20250219".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_max_blocks_per_batch() -> usize {
    crate::translation::batch::DEFAULT_MAX_BLOCKS_PER_BATCH
}
