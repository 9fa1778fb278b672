//! Typed exchange kline row.
//!
//! Binance returns klines as positional JSON arrays. The field order below is a
//! schema contract with the exchange; rows are validated against it at the
//! ingestion boundary instead of being zipped blindly onto column names.

use crate::domain::errors::IngestionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Positional column names of a kline row, in exchange order.
pub const KLINE_COLUMNS: [&str; 12] = [
    "openTime",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "closeTime",
    "quoteVolume",
    "numTrades",
    "takerBuyBaseVolume",
    "takerBuyQuoteVolume",
    "ignore",
];

/// One raw kline as reported by the exchange.
///
/// Numeric quantities are kept as the exchange text; coercion to decimals
/// happens in the normalizer, where failures become missing values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawKline {
    /// Epoch milliseconds
    pub open_time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    /// Epoch milliseconds
    pub close_time: i64,
    pub quote_volume: String,
    pub num_trades: u64,
    pub taker_buy_base_volume: String,
    pub taker_buy_quote_volume: String,
    pub ignore: String,
}

impl RawKline {
    /// Parse a positional row, failing fast when the layout does not match.
    pub fn from_row(row: &[Value]) -> Result<Self, IngestionError> {
        if row.len() != KLINE_COLUMNS.len() {
            return Err(IngestionError::SchemaMismatch {
                expected: KLINE_COLUMNS.len(),
                actual: row.len(),
            });
        }

        Ok(Self {
            open_time: cell_millis(&row[0], "openTime")?,
            open: cell_text(&row[1]),
            high: cell_text(&row[2]),
            low: cell_text(&row[3]),
            close: cell_text(&row[4]),
            volume: cell_text(&row[5]),
            close_time: cell_millis(&row[6], "closeTime")?,
            quote_volume: cell_text(&row[7]),
            num_trades: row[8]
                .as_u64()
                .or_else(|| row[8].as_str().and_then(|s| s.parse().ok()))
                .unwrap_or_default(),
            taker_buy_base_volume: cell_text(&row[9]),
            taker_buy_quote_volume: cell_text(&row[10]),
            ignore: cell_text(&row[11]),
        })
    }

    /// Build a row from OHLCV text only; remaining fields are left empty.
    pub fn from_ohlcv(
        open_time: i64,
        open: &str,
        high: &str,
        low: &str,
        close: &str,
        volume: &str,
    ) -> Self {
        Self {
            open_time,
            open: open.to_string(),
            high: high.to_string(),
            low: low.to_string(),
            close: close.to_string(),
            volume: volume.to_string(),
            close_time: open_time,
            quote_volume: String::new(),
            num_trades: 0,
            taker_buy_base_volume: String::new(),
            taker_buy_quote_volume: String::new(),
            ignore: String::new(),
        }
    }

    pub fn open_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.open_time)
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn cell_millis(value: &Value, column: &'static str) -> Result<i64, IngestionError> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|ms| DateTime::from_timestamp_millis(*ms).is_some())
        .ok_or_else(|| IngestionError::MalformedField {
            column,
            value: value.to_string(),
        })
}
