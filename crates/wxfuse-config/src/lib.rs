use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrackerConfig {
    pub timezone: Option<String>,
    pub key_prefix: Option<String>,
    pub ttl_hours: Option<u64>,
    pub store: Option<StoreKind>,
    pub sqlite_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AggregationConfig {
    pub freshness_hours: Option<i64>,
    pub interval_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocationConfig {
    pub key: Option<String>,
}

/// Static per-provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub api_key: Option<String>,
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_enabled() -> bool {
    true
}

fn default_polling_interval() -> u64 {
    300
}

fn default_priority() -> i32 {
    100
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            api_key: None,
            polling_interval_secs: default_polling_interval(),
            priority: default_priority(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub tracker: Option<TrackerConfig>,
    pub aggregation: Option<AggregationConfig>,
    pub location: Option<LocationConfig>,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderSettings>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Longest accepted TTL or freshness window: one year
const MAX_HOURS: i64 = 366 * 24;
/// Longest accepted aggregation interval: one week
const MAX_INTERVAL_MINUTES: i64 = 7 * 24 * 60;
/// Longest accepted provider polling interval: one day
const MAX_POLLING_SECS: i64 = 24 * 60 * 60;

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Unsigned settings beyond `i64::MAX` are reported as `i64::MAX`
fn as_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl AppConfig {
    /// Load configuration from WXFUSE_CONFIG path (TOML) if present, with reasonable defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("WXFUSE_CONFIG").unwrap_or_else(|_| "wxfuse.toml".to_string());
        Self::load_from(path)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let cfg = if path.as_ref().exists() {
            let s = fs::read_to_string(path)?;
            Self::parse(&s)?
        } else {
            AppConfig::default()
        };
        Ok(cfg)
    }

    /// Parse TOML and validate the timezone and numeric ranges up front
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let cfg = toml::from_str::<AppConfig>(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;
        if let Some(hours) = self.tracker().and_then(|t| t.ttl_hours) {
            check_range("tracker.ttl_hours", as_i64(hours), 0, MAX_HOURS)?;
        }
        if let Some(aggregation) = &self.aggregation {
            if let Some(hours) = aggregation.freshness_hours {
                check_range("aggregation.freshness_hours", hours, 0, MAX_HOURS)?;
            }
            if let Some(minutes) = aggregation.interval_minutes {
                check_range("aggregation.interval_minutes", minutes, 1, MAX_INTERVAL_MINUTES)?;
            }
        }
        for settings in self.providers.values() {
            check_range(
                "providers.polling_interval_secs",
                as_i64(settings.polling_interval_secs),
                1,
                MAX_POLLING_SECS,
            )?;
        }
        Ok(())
    }

    fn tracker(&self) -> Option<&TrackerConfig> {
        self.tracker.as_ref()
    }

    /// Tracker timezone (default UTC)
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        match self.tracker().and_then(|t| t.timezone.as_deref()) {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidTimezone(name.to_string())),
            None => Ok(Tz::UTC),
        }
    }

    pub fn key_prefix(&self) -> String {
        self.tracker()
            .and_then(|t| t.key_prefix.clone())
            .unwrap_or_else(|| "daily_weather".to_string())
    }

    /// Bundle expiry (default 48 hours); zero disables expiry
    pub fn ttl(&self) -> Option<std::time::Duration> {
        let hours = self
            .tracker()
            .and_then(|t| t.ttl_hours)
            .unwrap_or(48)
            .min(MAX_HOURS as u64);
        (hours > 0).then(|| std::time::Duration::from_secs(hours * 60 * 60))
    }

    pub fn store_kind(&self) -> StoreKind {
        self.tracker().and_then(|t| t.store).unwrap_or_default()
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.tracker()
            .and_then(|t| t.sqlite_path.clone())
            .unwrap_or_else(|| PathBuf::from("wxfuse-daily.db"))
    }

    /// Provider freshness window (default 3 hours)
    pub fn freshness(&self) -> Duration {
        Duration::hours(
            self.aggregation
                .as_ref()
                .and_then(|a| a.freshness_hours)
                .unwrap_or(3)
                .clamp(0, MAX_HOURS),
        )
    }

    /// Aggregation target interval length (default 60 minutes)
    pub fn aggregation_interval(&self) -> Duration {
        Duration::minutes(
            self.aggregation
                .as_ref()
                .and_then(|a| a.interval_minutes)
                .unwrap_or(60)
                .clamp(1, MAX_INTERVAL_MINUTES),
        )
    }

    pub fn location_key(&self) -> String {
        self.location
            .as_ref()
            .and_then(|l| l.key.clone())
            .unwrap_or_else(|| "default".to_string())
    }

    /// Enabled providers in id order
    pub fn enabled_providers(&self) -> impl Iterator<Item = (&String, &ProviderSettings)> {
        self.providers.iter().filter(|(_, p)| p.enabled)
    }
}
