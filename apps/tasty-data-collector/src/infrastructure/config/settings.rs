//! Collector Configuration Settings
//!
//! Configuration types for the collector, loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;

use super::credentials::Credentials;

const DEFAULT_BASE_URL: &str = "https://api.tastyworks.com";

/// What the binary collects in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectMode {
    /// One quote snapshot per symbol.
    #[default]
    Quotes,
    /// Candle history over a date range.
    Candles,
}

impl CollectMode {
    /// Parse collect mode from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "candles" => Self::Candles,
            _ => Self::Quotes,
        }
    }

    /// Get the mode name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Quotes => "quotes",
            Self::Candles => "candles",
        }
    }
}

/// DXLink stream tuning.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Deadline for the AUTH handshake.
    pub auth_timeout: Duration,
    /// Deadline for a feed channel to open.
    pub channel_open_timeout: Duration,
    /// Cadence of outbound KEEPALIVE frames.
    pub keepalive_interval: Duration,
    /// Keepalive timeout advertised in the SETUP handshake.
    pub keepalive_timeout: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            auth_timeout: Duration::from_secs(10),
            channel_open_timeout: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(30),
            keepalive_timeout: Duration::from_secs(60),
        }
    }
}

/// Collection run settings.
#[derive(Debug, Clone)]
pub struct CollectSettings {
    /// What to collect.
    pub mode: CollectMode,
    /// Streamer symbols to subscribe.
    pub symbols: Vec<String>,
    /// Candle aggregation period, e.g. "5m".
    pub candle_interval: String,
    /// First day of the candle range (inclusive). Defaults to today.
    pub start_date: NaiveDate,
    /// Last day of the candle range (inclusive). Defaults to today.
    pub end_date: NaiveDate,
    /// Request extended trading hours candles.
    pub extended_hours: bool,
    /// Give up when no event arrives for this long.
    pub idle_timeout: Duration,
    /// Directory CSV output is written to.
    pub output_dir: PathBuf,
}

/// Complete collector configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// tastytrade REST base URL.
    pub base_url: String,
    /// Login credentials.
    pub credentials: Credentials,
    /// DXLink stream tuning.
    pub stream: StreamSettings,
    /// Collection run settings.
    pub collect: CollectSettings,
}

impl Config {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or
    /// unparseable, or if the credentials file is unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url =
            std::env::var("TASTY_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        if base_url.is_empty() {
            return Err(ConfigError::EmptyValue("TASTY_BASE_URL".to_string()));
        }

        let credentials = Credentials::from_env()?;

        let stream = StreamSettings {
            auth_timeout: parse_env_duration_secs(
                "STREAM_AUTH_TIMEOUT_SECS",
                StreamSettings::default().auth_timeout,
            ),
            channel_open_timeout: parse_env_duration_secs(
                "STREAM_CHANNEL_TIMEOUT_SECS",
                StreamSettings::default().channel_open_timeout,
            ),
            keepalive_interval: parse_env_duration_secs(
                "STREAM_KEEPALIVE_INTERVAL_SECS",
                StreamSettings::default().keepalive_interval,
            ),
            keepalive_timeout: parse_env_duration_secs(
                "STREAM_KEEPALIVE_TIMEOUT_SECS",
                StreamSettings::default().keepalive_timeout,
            ),
        };

        let mode = std::env::var("COLLECT_MODE")
            .map(|s| CollectMode::from_str_case_insensitive(&s))
            .unwrap_or_default();

        let symbols_raw = std::env::var("COLLECT_SYMBOLS")
            .map_err(|_| ConfigError::MissingEnvVar("COLLECT_SYMBOLS".to_string()))?;
        let symbols: Vec<String> = symbols_raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();
        if symbols.is_empty() {
            return Err(ConfigError::EmptyValue("COLLECT_SYMBOLS".to_string()));
        }

        let today = chrono::Utc::now().date_naive();
        let collect = CollectSettings {
            mode,
            symbols,
            candle_interval: std::env::var("CANDLE_INTERVAL")
                .unwrap_or_else(|_| "5m".to_string()),
            start_date: parse_env_date("COLLECT_START_DATE", today)?,
            end_date: parse_env_date("COLLECT_END_DATE", today)?,
            extended_hours: parse_env_bool("COLLECT_EXTENDED_HOURS", false),
            idle_timeout: parse_env_duration_secs(
                "COLLECT_TIMEOUT_SECS",
                Duration::from_secs(10),
            ),
            output_dir: std::env::var("OUTPUT_DIR")
                .map_or_else(|_| PathBuf::from("./out"), PathBuf::from),
        };

        Ok(Self {
            base_url,
            credentials,
            stream,
            collect,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),

    /// Environment variable could not be parsed.
    #[error("environment variable {0} has invalid value: {1}")]
    InvalidValue(String, String),

    /// Credentials file could not be read or parsed.
    #[error("credentials file error: {0}")]
    CredentialsFile(#[from] csv::Error),

    /// Credentials file content is unusable.
    #[error("credentials file {0}: {1}")]
    InvalidCredentialsFile(String, String),
}

fn parse_env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_date(key: &str, default: NaiveDate) -> Result<NaiveDate, ConfigError> {
    match std::env::var(key) {
        Ok(value) => NaiveDate::parse_from_str(&value, "%Y-%m-%d")
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), value)),
        Err(_) => Ok(default),
    }
}
