//! Synchronous processing core: normalizer, indicator engine, pattern
//! detector and the processor chaining them. Nothing here performs I/O.

pub mod indicators;
pub mod normalizer;
pub mod patterns;
pub mod processor;

use rust_decimal::{Decimal, RoundingStrategy};

pub use normalizer::SeriesNormalizer;
pub use patterns::{CandleGeometry, CandlePatternDetector, PatternFlags};
pub use processor::{DataProcessor, IndicatorParams, ProcessedSeries};

/// Half-to-even rounding, the rule every stored value follows
pub fn round_dp(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven)
}

pub fn round2(value: Decimal) -> Decimal {
    round_dp(value, 2)
}

/// Rounds an f64 result at the Decimal boundary; non-finite values are missing
pub fn round_f64(value: f64, dp: u32) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64_retain(value).map(|d| round_dp(d, dp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(round2(dec!(1.005)), dec!(1.00));
        assert_eq!(round2(dec!(1.015)), dec!(1.02));
        assert_eq!(round2(dec!(-2.345)), dec!(-2.34));
        assert_eq!(round_dp(dec!(0.12345), 4), dec!(0.1234));
    }

    #[test]
    fn test_round_f64_rejects_non_finite() {
        assert_eq!(round_f64(f64::NAN, 2), None);
        assert_eq!(round_f64(f64::INFINITY, 2), None);
        assert_eq!(round_f64(12.5, 2), Some(dec!(12.5)));
    }
}
