//! Generator configuration
//!
//! Single authoritative source for the workflow constants: the poll delays
//! and the input text length bounds live here and nowhere else. Values can
//! be overridden from a TOML file; every field falls back to the compiled
//! default individually.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Input text must be strictly longer than this many characters
pub const DEFAULT_MIN_TEXT_LENGTH: usize = 250;

/// Input text must be at most this many characters
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 500_000;

/// Poll interval while the task is PENDING, STARTED, or RETRY
pub const DEFAULT_POLL_DELAY_LONG_MS: u64 = 3000;

/// Poll interval once the task is confirmed IN_PROGRESS
pub const DEFAULT_POLL_DELAY_SHORT_MS: u64 = 1000;

/// Configuration for the generation workflow
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Base URL of the backend job service
    pub base_url: String,

    /// Idle poll interval in milliseconds (task not yet confirmed running)
    pub poll_delay_long_ms: u64,

    /// Tight poll interval in milliseconds, used once the task is
    /// confirmed IN_PROGRESS
    pub poll_delay_short_ms: u64,

    /// Minimum input text length, exclusive
    pub min_text_length: usize,

    /// Maximum input text length, inclusive
    pub max_text_length: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            poll_delay_long_ms: DEFAULT_POLL_DELAY_LONG_MS,
            poll_delay_short_ms: DEFAULT_POLL_DELAY_SHORT_MS,
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from a TOML file, with defaults for absent fields
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let config: GeneratorConfig = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations with an empty length range or zero delays
    pub fn validate(&self) -> Result<()> {
        if self.min_text_length >= self.max_text_length {
            return Err(Error::Config(format!(
                "min_text_length ({}) must be below max_text_length ({})",
                self.min_text_length, self.max_text_length
            )));
        }
        if self.poll_delay_long_ms == 0 || self.poll_delay_short_ms == 0 {
            return Err(Error::Config("poll delays must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Idle poll interval as a `Duration`
    pub fn poll_delay_long(&self) -> Duration {
        Duration::from_millis(self.poll_delay_long_ms)
    }

    /// Tight poll interval as a `Duration`
    pub fn poll_delay_short(&self) -> Duration {
        Duration::from_millis(self.poll_delay_short_ms)
    }

    /// True when `len` is within the accepted input text range
    /// (strictly above the minimum, at most the maximum)
    pub fn text_length_in_range(&self, len: usize) -> bool {
        len > self.min_text_length && len <= self.max_text_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_constants() {
        let config = GeneratorConfig::default();
        assert_eq!(config.poll_delay_long(), Duration::from_millis(3000));
        assert_eq!(config.poll_delay_short(), Duration::from_millis(1000));
        assert_eq!(config.min_text_length, 250);
        assert_eq!(config.max_text_length, 500_000);
        config.validate().unwrap();
    }

    #[test]
    fn text_length_bounds_are_exclusive_inclusive() {
        let config = GeneratorConfig::default();
        assert!(!config.text_length_in_range(250));
        assert!(config.text_length_in_range(251));
        assert!(config.text_length_in_range(500_000));
        assert!(!config.text_length_in_range(500_001));
    }

    #[test]
    fn load_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url = \"http://backend:8080\"").unwrap();
        writeln!(file, "poll_delay_short_ms = 500").unwrap();

        let config = GeneratorConfig::load(file.path()).unwrap();
        assert_eq!(config.base_url, "http://backend:8080");
        assert_eq!(config.poll_delay_short_ms, 500);
        assert_eq!(config.poll_delay_long_ms, DEFAULT_POLL_DELAY_LONG_MS);
        assert_eq!(config.max_text_length, DEFAULT_MAX_TEXT_LENGTH);
    }

    #[test]
    fn load_rejects_inverted_length_range() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "min_text_length = 100").unwrap();
        writeln!(file, "max_text_length = 50").unwrap();

        assert!(GeneratorConfig::load(file.path()).is_err());
    }
}
