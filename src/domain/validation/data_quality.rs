use crate::domain::market::NormalizedCandle;
use chrono::Duration;
use tracing::warn;

/// Integrity checks on a normalized series.
///
/// Violations are reported, never repaired: the indicator pass still runs over
/// the series as given.
pub struct SeriesValidator;

impl SeriesValidator {
    /// Checks `low <= min(open, close) <= max(open, close) <= high`.
    /// Candles with a missing price are skipped.
    pub fn validate_candle(candle: &NormalizedCandle) -> bool {
        let (Some(open), Some(high), Some(low), Some(close)) =
            (candle.open, candle.high, candle.low, candle.close)
        else {
            return true;
        };

        if low > open.min(close) || open.max(close) > high {
            warn!(
                "Validation FAILED: Candle for {} at {} violates OHLC bounds (o={} h={} l={} c={})",
                candle.symbol, candle.open_time, open, high, low, close
            );
            return false;
        }

        if let Some(volume) = candle.volume
            && volume.is_sign_negative()
        {
            warn!(
                "Validation FAILED: Candle for {} at {} has negative volume: {}",
                candle.symbol, candle.open_time, volume
            );
            return false;
        }

        true
    }

    /// Number of invalid candles in the series
    pub fn count_invalid(series: &[NormalizedCandle]) -> usize {
        series.iter().filter(|c| !Self::validate_candle(c)).count()
    }

    /// Number of consecutive pairs whose spacing differs from `interval`.
    /// The series must be ascending.
    pub fn count_gaps(series: &[NormalizedCandle], interval: Duration) -> usize {
        series
            .windows(2)
            .filter(|pair| pair[1].open_time - pair[0].open_time != interval)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn candle(hour: u32, o: Decimal, h: Decimal, l: Decimal, c: Decimal) -> NormalizedCandle {
        NormalizedCandle {
            symbol: "BTCUSDT".to_string(),
            open_time: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            close_time: None,
            open: Some(o),
            high: Some(h),
            low: Some(l),
            close: Some(c),
            volume: Some(dec!(1)),
            quote_volume: None,
            trend: -1,
            volume_price_ratio: None,
        }
    }

    #[test]
    fn test_valid_candle() {
        let c = candle(0, dec!(100), dec!(110), dec!(95), dec!(105));
        assert!(SeriesValidator::validate_candle(&c));
    }

    #[test]
    fn test_high_below_close_is_invalid() {
        let c = candle(0, dec!(100), dec!(104), dec!(95), dec!(105));
        assert!(!SeriesValidator::validate_candle(&c));
    }

    #[test]
    fn test_low_above_open_is_invalid() {
        let c = candle(0, dec!(100), dec!(110), dec!(101), dec!(105));
        assert!(!SeriesValidator::validate_candle(&c));
    }

    #[test]
    fn test_missing_price_is_not_flagged() {
        let mut c = candle(0, dec!(100), dec!(90), dec!(95), dec!(105));
        c.high = None;
        assert!(SeriesValidator::validate_candle(&c));
    }

    #[test]
    fn test_gap_counting() {
        let series = vec![
            candle(0, dec!(1), dec!(1), dec!(1), dec!(1)),
            candle(1, dec!(1), dec!(1), dec!(1), dec!(1)),
            candle(3, dec!(1), dec!(1), dec!(1), dec!(1)),
            candle(4, dec!(1), dec!(1), dec!(1), dec!(1)),
        ];
        assert_eq!(SeriesValidator::count_gaps(&series, Duration::hours(1)), 1);
        assert_eq!(SeriesValidator::count_invalid(&series), 0);
    }
}
