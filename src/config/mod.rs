//! Configuration module for cryptobot.
//!
//! Structured configuration loading from environment variables (a `.env` file
//! is read by the binary through `dotenvy`), organized by concern: Exchange,
//! Storage, Indicators, Model and Observability. An optional TOML file named
//! by `CRYPTOBOT_CONFIG` overrides the fetch settings.
//!
//! Every loader takes a key lookup so tests can feed a map instead of the
//! process environment.

mod exchange_config;
mod file_overrides;
mod indicator_config;
mod model_config;
mod observability_config;
mod storage_config;

pub use exchange_config::ExchangeEnvConfig;
pub use file_overrides::PipelineFileConfig;
pub use indicator_config::IndicatorEnvConfig;
pub use model_config::ModelEnvConfig;
pub use observability_config::ObservabilityEnvConfig;
pub use storage_config::{StorageBackend, StorageEnvConfig};

use anyhow::{Context, Result};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Key lookup used by all config loaders
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Upper bound of day-valued settings (lookback, retention)
pub const MAX_HISTORY_DAYS: i64 = 3650;
/// Upper bound of hour-valued periods (schedule, forecast step)
pub const MAX_PERIOD_HOURS: i64 = 8760;

/// Checks `min <= value <= max` for a setting named `key`.
pub fn ensure_range(key: &str, value: i64, min: i64, max: i64) -> Result<()> {
    if !(min..=max).contains(&value) {
        anyhow::bail!("{} must be between {} and {}, got {}", key, min, max, value);
    }
    Ok(())
}

/// Parses `key` when set (and non-blank), otherwise returns `default`.
pub(crate) fn parse_or<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {} ({})", key, raw, e)),
        _ => Ok(default),
    }
}

pub(crate) fn string_or(lookup: Lookup<'_>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub exchange: ExchangeEnvConfig,
    pub storage: StorageEnvConfig,
    pub indicators: IndicatorEnvConfig,
    pub model: ModelEnvConfig,
    pub observability: ObservabilityEnvConfig,
    /// Period of the `schedule` command
    pub schedule_interval_hours: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let lookup = |key: &str| env::var(key).ok();
        let mut config = Self::from_lookup(&lookup)?;

        if let Some(path) = lookup("CRYPTOBOT_CONFIG").filter(|p| !p.trim().is_empty()) {
            let overrides = PipelineFileConfig::load(&path)?;
            overrides
                .apply(&mut config.exchange)
                .with_context(|| format!("Invalid pipeline config file: {}", path))?;
        }

        Ok(config)
    }

    /// Compose the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let exchange =
            ExchangeEnvConfig::from_lookup(lookup).context("Failed to load exchange config")?;
        let storage =
            StorageEnvConfig::from_lookup(lookup).context("Failed to load storage config")?;
        let indicators =
            IndicatorEnvConfig::from_lookup(lookup).context("Failed to load indicator config")?;
        let model = ModelEnvConfig::from_lookup(lookup).context("Failed to load model config")?;
        let observability = ObservabilityEnvConfig::from_lookup(lookup);

        let schedule_interval_hours = parse_or(lookup, "SCHEDULE_INTERVAL_HOURS", 4u64)?;
        ensure_range(
            "SCHEDULE_INTERVAL_HOURS",
            i64::try_from(schedule_interval_hours).unwrap_or(i64::MAX),
            1,
            MAX_PERIOD_HOURS,
        )?;

        Ok(Self {
            exchange,
            storage,
            indicators,
            model,
            observability,
            schedule_interval_hours,
        })
    }
}
