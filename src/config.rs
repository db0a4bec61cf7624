//! Configuration Module
//!
//! Handles configuration loading from Java-style .properties files (KEY=VALUE format),
//! with every key optionally overridden by a `WSBENCH_<KEY>` environment variable.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Prefix for environment variables overriding a property key
pub const ENV_PREFIX: &str = "WSBENCH_";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse property '{key}': {reason}")]
    ParseError { key: String, reason: String },
}

/// When the connections opened by a run are released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosePolicy {
    /// Close each connection at the end of its own iteration
    PerIteration,
    /// Keep every successful connection open until the loop is done
    AtEnd,
}

impl FromStr for ClosePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "per-iteration" => Ok(ClosePolicy::PerIteration),
            "at-end" => Ok(ClosePolicy::AtEnd),
            other => Err(format!("expected 'per-iteration' or 'at-end', got '{}'", other)),
        }
    }
}

impl fmt::Display for ClosePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosePolicy::PerIteration => f.write_str("per-iteration"),
            ClosePolicy::AtEnd => f.write_str("at-end"),
        }
    }
}

/// How the end-of-run summary is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFormat {
    Text,
    Json,
}

impl FromStr for SummaryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(SummaryFormat::Text),
            "json" => Ok(SummaryFormat::Json),
            other => Err(format!("expected 'text' or 'json', got '{}'", other)),
        }
    }
}

/// Load driver configuration
///
/// Property names: URL, TOTAL, CLOSE_POLICY, HANDSHAKE_TIMEOUT_MS, SUMMARY_FORMAT
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub url: String,
    pub total: usize,
    pub close_policy: ClosePolicy,
    /// Zero disables the timeout
    pub handshake_timeout_ms: u64,
    pub summary_format: SummaryFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/websocket".into(),
            total: 6000,
            close_policy: ClosePolicy::PerIteration,
            handshake_timeout_ms: 0,
            summary_format: SummaryFormat::Text,
        }
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
        key: key.into(),
        reason: format!("invalid value '{}': {}", value, e),
    })
}

impl Config {
    /// Parse a Java-style .properties file into a HashMap.
    /// Skips blank lines and lines starting with '#'.
    fn parse_properties(content: &str) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = trimmed.split_once('=') {
                map.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        map
    }

    /// Load configuration from a .properties file (Java KEY=VALUE format).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_properties_str(&content)
    }

    /// Parse config from a properties-format string.
    pub fn from_properties_str(content: &str) -> Result<Self, ConfigError> {
        let props = Self::parse_properties(content);
        Config::default().apply_overrides(|key| props.get(key).cloned())
    }

    /// Replace every field whose key `lookup` yields a value.
    ///
    /// Missing keys keep the current value; a present but unparsable value is an error.
    pub fn apply_overrides<F>(self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            url: lookup("URL")
                .map(|v| v.trim().to_string())
                .unwrap_or(self.url),
            total: lookup("TOTAL")
                .map(|v| parse_value("TOTAL", &v))
                .transpose()?
                .unwrap_or(self.total),
            close_policy: lookup("CLOSE_POLICY")
                .map(|v| parse_value("CLOSE_POLICY", &v))
                .transpose()?
                .unwrap_or(self.close_policy),
            handshake_timeout_ms: lookup("HANDSHAKE_TIMEOUT_MS")
                .map(|v| parse_value("HANDSHAKE_TIMEOUT_MS", &v))
                .transpose()?
                .unwrap_or(self.handshake_timeout_ms),
            summary_format: lookup("SUMMARY_FORMAT")
                .map(|v| parse_value("SUMMARY_FORMAT", &v))
                .transpose()?
                .unwrap_or(self.summary_format),
        })
    }

    /// Apply `WSBENCH_<KEY>` environment variables on top of this config.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    /// Load configuration, searching for config.properties in the current directory,
    /// then applying environment overrides.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = "config.properties";
        let base = if Path::new(path).exists() {
            match Self::load(path) {
                Ok(config) => {
                    log::info!("Loaded configuration from {}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", path, e);
                    Self::default()
                }
            }
        } else {
            log::debug!("No config.properties found, using defaults");
            Self::default()
        };

        base.with_env_overrides()
    }

    /// Handshake timeout, if one is configured
    pub fn handshake_timeout(&self) -> Option<Duration> {
        (self.handshake_timeout_ms > 0).then(|| Duration::from_millis(self.handshake_timeout_ms))
    }

    /// Log all configuration parameters for debugging
    pub fn log_config(&self) {
        log::debug!("Configuration:");
        log::debug!("  url: {}", self.url);
        log::debug!("  total: {}", self.total);
        log::debug!("  close_policy: {}", self.close_policy);
        log::debug!("  handshake_timeout_ms: {}", self.handshake_timeout_ms);
        log::debug!("  summary_format: {:?}", self.summary_format);
    }
}
