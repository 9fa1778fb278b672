use crate::application::processing::{round_dp, round2};
use crate::domain::market::{NormalizedCandle, RawKline};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::warn;

/// Coerces raw exchange rows into typed candles.
///
/// Numeric failures become `None` and never raise; only a row without a usable
/// open time is skipped, since it cannot be placed in the series.
pub struct SeriesNormalizer;

impl SeriesNormalizer {
    /// Sorts ascending by open time and keeps the last copy of duplicated buckets.
    pub fn order_and_dedupe(mut rows: Vec<RawKline>) -> Vec<RawKline> {
        rows.sort_by_key(|r| r.open_time);
        let mut out: Vec<RawKline> = Vec::with_capacity(rows.len());
        for row in rows {
            match out.last_mut() {
                Some(last) if last.open_time == row.open_time => *last = row,
                _ => out.push(row),
            }
        }
        out
    }

    pub fn normalize(symbol: &str, rows: &[RawKline]) -> Vec<NormalizedCandle> {
        rows.iter()
            .filter_map(|row| {
                let Some(open_time) = row.open_datetime() else {
                    warn!(
                        "Skipping {} kline with invalid open time {}",
                        symbol, row.open_time
                    );
                    return None;
                };
                Some(Self::normalize_row(symbol, open_time, row))
            })
            .collect()
    }

    fn normalize_row(
        symbol: &str,
        open_time: chrono::DateTime<chrono::Utc>,
        row: &RawKline,
    ) -> NormalizedCandle {
        let open = coerce_decimal(&row.open);
        let close = coerce_decimal(&row.close);
        let volume = coerce_decimal(&row.volume);

        NormalizedCandle {
            symbol: symbol.to_string(),
            open_time,
            close_time: chrono::DateTime::from_timestamp_millis(row.close_time),
            open,
            high: coerce_decimal(&row.high),
            low: coerce_decimal(&row.low),
            close,
            volume,
            quote_volume: coerce_decimal(&row.quote_volume),
            trend: trend(open, close),
            volume_price_ratio: volume_price_ratio(volume, close),
        }
    }
}

/// Parses exchange text into a 2 dp decimal; anything unparsable is missing.
pub fn coerce_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
        .map(round2)
}

/// +1 for a rising bar; ties and missing prices count as falling.
pub fn trend(open: Option<Decimal>, close: Option<Decimal>) -> i8 {
    match (open, close) {
        (Some(o), Some(c)) if c > o => 1,
        _ => -1,
    }
}

pub fn volume_price_ratio(volume: Option<Decimal>, close: Option<Decimal>) -> Option<Decimal> {
    let (volume, close) = (volume?, close?);
    if close.is_zero() {
        return None;
    }
    volume.checked_div(close).map(|r| round_dp(r, 4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw(open_time: i64, close: &str) -> RawKline {
        RawKline::from_ohlcv(open_time, "100", "110", "95", close, "10")
    }

    #[test]
    fn test_coerce_decimal() {
        assert_eq!(coerce_decimal("0.01634790"), Some(dec!(0.02)));
        assert_eq!(coerce_decimal(" 42650.125 "), Some(dec!(42650.12)));
        assert_eq!(coerce_decimal("1.5e3"), Some(dec!(1500)));
        assert_eq!(coerce_decimal("abc"), None);
        assert_eq!(coerce_decimal(""), None);
    }

    #[test]
    fn test_trend_tie_is_negative() {
        assert_eq!(trend(Some(dec!(100)), Some(dec!(101))), 1);
        assert_eq!(trend(Some(dec!(100)), Some(dec!(100))), -1);
        assert_eq!(trend(Some(dec!(100)), Some(dec!(99))), -1);
        assert_eq!(trend(None, Some(dec!(99))), -1);
    }

    #[test]
    fn test_volume_price_ratio() {
        assert_eq!(
            volume_price_ratio(Some(dec!(10)), Some(dec!(3))),
            Some(dec!(3.3333))
        );
        assert_eq!(volume_price_ratio(Some(dec!(10)), Some(dec!(0))), None);
        assert_eq!(volume_price_ratio(None, Some(dec!(3))), None);
    }

    #[test]
    fn test_normalize_converts_timestamps_and_numbers() {
        let rows = vec![raw(1_704_067_200_000, "100.2")];
        let out = SeriesNormalizer::normalize("BTCUSDT", &rows);
        assert_eq!(out.len(), 1);
        let c = &out[0];
        assert_eq!(c.open_time.timestamp_millis(), 1_704_067_200_000);
        assert_eq!(c.close, Some(dec!(100.2)));
        assert_eq!(c.trend, 1);
        assert_eq!(c.volume_price_ratio, Some(dec!(0.0998)));
    }

    #[test]
    fn test_unparsable_close_becomes_missing() {
        let out = SeriesNormalizer::normalize("BTCUSDT", &[raw(0, "n/a")]);
        assert_eq!(out[0].close, None);
        assert_eq!(out[0].volume_price_ratio, None);
        assert_eq!(out[0].trend, -1);
    }

    #[test]
    fn test_invalid_open_time_is_skipped() {
        let out = SeriesNormalizer::normalize("BTCUSDT", &[raw(i64::MAX, "100")]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_order_and_dedupe_keeps_latest_copy() {
        let rows = vec![raw(3_600_000, "101"), raw(0, "100"), raw(3_600_000, "102")];
        let out = SeriesNormalizer::order_and_dedupe(rows);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].open_time, 0);
        assert_eq!(out[1].close, "102");
    }
}
