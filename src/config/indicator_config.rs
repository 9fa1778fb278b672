//! Indicator window configuration parsing from environment variables.

use super::{Lookup, parse_or};

/// Longest accepted indicator window, in bars
pub const MAX_INDICATOR_PERIOD: usize = 1000;
use crate::application::processing::IndicatorParams;
use anyhow::{Result, bail};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone)]
pub struct IndicatorEnvConfig {
    pub bb_period: usize,
    pub bb_std_dev: Decimal,
    pub rsi_period: usize,
}

impl IndicatorEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let config = Self {
            bb_period: parse_or(lookup, "BB_PERIOD", 20)?,
            bb_std_dev: parse_or(lookup, "BB_STD_DEV", dec!(2))?,
            rsi_period: parse_or(lookup, "RSI_PERIOD", 14)?,
        };
        // A sample standard deviation needs two observations
        if !(2..=MAX_INDICATOR_PERIOD).contains(&config.bb_period) {
            bail!(
                "BB_PERIOD must be between 2 and {}, got {}",
                MAX_INDICATOR_PERIOD,
                config.bb_period
            );
        }
        if !(1..=MAX_INDICATOR_PERIOD).contains(&config.rsi_period) {
            bail!(
                "RSI_PERIOD must be between 1 and {}, got {}",
                MAX_INDICATOR_PERIOD,
                config.rsi_period
            );
        }
        if config.bb_std_dev.is_sign_negative() {
            bail!("BB_STD_DEV must not be negative, got {}", config.bb_std_dev);
        }
        Ok(config)
    }

    pub fn params(&self) -> IndicatorParams {
        IndicatorParams {
            bb_period: self.bb_period,
            bb_std_dev: self.bb_std_dev,
            rsi_period: self.rsi_period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_defaults_match_params() {
        let config = IndicatorEnvConfig::from_lookup(&|_| None).unwrap();
        assert_eq!(config.params(), IndicatorParams::default());
    }

    #[test]
    fn test_bb_period_of_one_rejected() {
        let lookup = |key: &str| (key == "BB_PERIOD").then(|| "1".to_string());
        assert!(IndicatorEnvConfig::from_lookup(&lookup).is_err());
    }

    #[test]
    fn test_oversized_rsi_period_rejected() {
        let lookup = |key: &str| (key == "RSI_PERIOD").then(|| "5000000000".to_string());
        assert!(IndicatorEnvConfig::from_lookup(&lookup).is_err());
    }
}
