use anyhow::{Result, anyhow};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dashboard look-back window, measured back from the latest stored bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "7D")]
    SevenDays,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "ALL")]
    All,
}

impl Timeframe {
    /// `None` means the whole stored history
    pub fn lookback(&self) -> Option<Duration> {
        match self {
            Timeframe::OneDay => Some(Duration::days(1)),
            Timeframe::SevenDays => Some(Duration::days(7)),
            Timeframe::OneMonth => Some(Duration::days(30)),
            Timeframe::ThreeMonths => Some(Duration::days(90)),
            Timeframe::SixMonths => Some(Duration::days(180)),
            Timeframe::OneYear => Some(Duration::days(365)),
            Timeframe::All => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneDay => "1D",
            Timeframe::SevenDays => "7D",
            Timeframe::OneMonth => "1M",
            Timeframe::ThreeMonths => "3M",
            Timeframe::SixMonths => "6M",
            Timeframe::OneYear => "1Y",
            Timeframe::All => "ALL",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1D" => Ok(Timeframe::OneDay),
            "7D" => Ok(Timeframe::SevenDays),
            "1M" => Ok(Timeframe::OneMonth),
            "3M" => Ok(Timeframe::ThreeMonths),
            "6M" => Ok(Timeframe::SixMonths),
            "1Y" => Ok(Timeframe::OneYear),
            "ALL" => Ok(Timeframe::All),
            other => Err(anyhow!(
                "Invalid timeframe: {}. Must be one of 1D, 7D, 1M, 3M, 6M, 1Y, ALL",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parsing() {
        assert_eq!("1y".parse::<Timeframe>().unwrap(), Timeframe::OneYear);
        assert_eq!("ALL".parse::<Timeframe>().unwrap(), Timeframe::All);
        assert!("2W".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_timeframe_lookback() {
        assert_eq!(Timeframe::OneMonth.lookback(), Some(Duration::days(30)));
        assert_eq!(Timeframe::All.lookback(), None);
    }
}
