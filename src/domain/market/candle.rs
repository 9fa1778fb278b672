use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A kline after type coercion and derived-field computation.
///
/// `None` marks a value that could not be coerced or derived. Such rows are
/// carried through the indicator pass and only eliminated at projection.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCandle {
    pub symbol: String,
    pub open_time: DateTime<Utc>,
    pub close_time: Option<DateTime<Utc>>,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<Decimal>,
    pub quote_volume: Option<Decimal>,
    /// +1 when close > open, -1 otherwise (ties included)
    pub trend: i8,
    pub volume_price_ratio: Option<Decimal>,
}

/// Indicator and pattern sub-document of a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSet {
    #[serde(rename = "BB_MA")]
    pub bb_ma: Decimal,
    #[serde(rename = "BB_UPPER")]
    pub bb_upper: Decimal,
    #[serde(rename = "BB_LOWER")]
    pub bb_lower: Decimal,
    #[serde(rename = "RSI")]
    pub rsi: Decimal,
    #[serde(rename = "DOJI")]
    pub doji: u8,
    #[serde(rename = "HAMMER")]
    pub hammer: u8,
    #[serde(rename = "SHOOTING_STAR")]
    pub shooting_star: u8,
}

/// The persisted market data record, keyed by (symbol, open_time).
///
/// Every field is present: rows with a missing value never reach this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedCandle {
    pub symbol: String,
    #[serde(rename = "openTime")]
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub trend: i8,
    pub volume_price_ratio: Decimal,
    pub indicator: IndicatorSet,
}
