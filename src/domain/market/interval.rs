use anyhow::{Result, anyhow};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kline bucket size requested from the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KlineInterval {
    OneMin,
    FiveMin,
    FifteenMin,
    OneHour,
    FourHour,
    OneDay,
}

impl KlineInterval {
    /// Returns the duration of this interval in minutes
    pub fn to_minutes(&self) -> i64 {
        match self {
            KlineInterval::OneMin => 1,
            KlineInterval::FiveMin => 5,
            KlineInterval::FifteenMin => 15,
            KlineInterval::OneHour => 60,
            KlineInterval::FourHour => 240,
            KlineInterval::OneDay => 1440,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.to_minutes())
    }

    pub fn to_millis(&self) -> i64 {
        self.to_minutes() * 60_000
    }

    /// Converts to Binance API interval string
    pub fn to_binance_string(&self) -> &'static str {
        match self {
            KlineInterval::OneMin => "1m",
            KlineInterval::FiveMin => "5m",
            KlineInterval::FifteenMin => "15m",
            KlineInterval::OneHour => "1h",
            KlineInterval::FourHour => "4h",
            KlineInterval::OneDay => "1d",
        }
    }
}

impl fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_binance_string())
    }
}

impl FromStr for KlineInterval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" => Ok(KlineInterval::OneMin),
            "5m" => Ok(KlineInterval::FiveMin),
            "15m" => Ok(KlineInterval::FifteenMin),
            "1h" => Ok(KlineInterval::OneHour),
            "4h" => Ok(KlineInterval::FourHour),
            "1d" => Ok(KlineInterval::OneDay),
            other => Err(anyhow!(
                "Invalid kline interval: {}. Must be one of 1m, 5m, 15m, 1h, 4h, 1d",
                other
            )),
        }
    }
}
