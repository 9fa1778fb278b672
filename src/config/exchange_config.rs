//! Exchange and fetch configuration parsing from environment variables.

use super::{Lookup, MAX_HISTORY_DAYS, ensure_range, parse_or, string_or};
use crate::domain::market::KlineInterval;
use crate::infrastructure::core::http_client_factory::HttpClientSettings;
use anyhow::{Result, bail};
use std::time::Duration;

/// Binance access and kline download settings
#[derive(Debug, Clone)]
pub struct ExchangeEnvConfig {
    pub api_key: String,
    pub base_url: String,
    pub symbols: Vec<String>,
    pub interval: KlineInterval,
    /// Rows per kline page
    pub kline_limit: u32,
    /// History fetched for a symbol with nothing stored yet
    pub initial_lookback_days: i64,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
}

impl ExchangeEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let config = Self {
            api_key: lookup("BINANCE_API_KEY").unwrap_or_default(),
            base_url: string_or(lookup, "BINANCE_BASE_URL", "https://api.binance.com"),
            symbols: parse_symbols(&string_or(lookup, "SYMBOLS", "BTCUSDT,ETHUSDT")),
            interval: parse_or(lookup, "KLINE_INTERVAL", KlineInterval::OneHour)?,
            kline_limit: parse_or(lookup, "KLINE_LIMIT", 1000)?,
            initial_lookback_days: parse_or(lookup, "INITIAL_LOOKBACK_DAYS", 30)?,
            request_timeout_secs: parse_or(lookup, "HTTP_TIMEOUT_SECS", 30)?,
            max_retries: parse_or(lookup, "HTTP_MAX_RETRIES", 3)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            bail!("SYMBOLS must name at least one trading pair");
        }
        if !(1..=1000).contains(&self.kline_limit) {
            bail!("KLINE_LIMIT must be between 1 and 1000, got {}", self.kline_limit);
        }
        ensure_range(
            "INITIAL_LOOKBACK_DAYS",
            self.initial_lookback_days,
            1,
            MAX_HISTORY_DAYS,
        )
    }

    pub fn http_settings(&self) -> HttpClientSettings {
        HttpClientSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_retries: self.max_retries,
            ..HttpClientSettings::default()
        }
    }
}

/// Comma-separated, trimmed, upper-cased, blanks and duplicates removed
pub fn parse_symbols(raw: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(|s| s.trim().to_uppercase()) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}
