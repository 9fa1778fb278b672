//! Optional TOML pipeline file, e.g.
//!
//! ```toml
//! symbols = ["BTCUSDT", "ETHUSDT", "SOLUSDT"]
//! interval = "4h"
//! limit = 500
//! ```

use super::ExchangeEnvConfig;
use super::exchange_config::parse_symbols;
use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineFileConfig {
    pub symbols: Option<Vec<String>>,
    pub interval: Option<String>,
    pub limit: Option<u32>,
}

impl PipelineFileConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read pipeline config file: {}", path))?;
        Self::parse(&content).context(format!("Failed to parse pipeline config TOML: {}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overrides the exchange settings with the values present in the file.
    pub fn apply(&self, exchange: &mut ExchangeEnvConfig) -> Result<()> {
        if let Some(symbols) = &self.symbols {
            exchange.symbols = parse_symbols(&symbols.join(","));
        }
        if let Some(interval) = &self.interval {
            exchange.interval = interval.parse()?;
        }
        if let Some(limit) = self.limit {
            exchange.kline_limit = limit;
        }
        exchange.validate()
    }
}
