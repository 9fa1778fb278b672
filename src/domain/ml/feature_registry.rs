use crate::domain::market::ProcessedCandle;
use rust_decimal::prelude::ToPrimitive;

/// Ordered list of model input features.
/// This order MUST match the order the sequence model was trained with.
/// Any change here is a breaking change for the model artifacts.
pub const FEATURE_NAMES: &[&str] = &[
    "open",
    "high",
    "low",
    "volume",
    "trend",
    "volume_price_ratio",
    "BB_MA",
    "BB_UPPER",
    "BB_LOWER",
    "RSI",
];

/// Converts a persisted record into the model feature vector (f64, unscaled).
pub fn features_to_vector(candle: &ProcessedCandle) -> Vec<f64> {
    let ind = &candle.indicator;
    vec![
        candle.open.to_f64().unwrap_or(0.0),
        candle.high.to_f64().unwrap_or(0.0),
        candle.low.to_f64().unwrap_or(0.0),
        candle.volume.to_f64().unwrap_or(0.0),
        f64::from(candle.trend),
        candle.volume_price_ratio.to_f64().unwrap_or(0.0),
        ind.bb_ma.to_f64().unwrap_or(0.0),
        ind.bb_upper.to_f64().unwrap_or(0.0),
        ind.bb_lower.to_f64().unwrap_or(0.0),
        ind.rsi.to_f64().unwrap_or(0.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::IndicatorSet;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn record() -> ProcessedCandle {
        ProcessedCandle {
            symbol: "BTCUSDT".to_string(),
            open_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            open: dec!(100),
            high: dec!(110),
            low: dec!(95),
            close: dec!(105),
            volume: dec!(12.5),
            trend: 1,
            volume_price_ratio: dec!(0.119),
            indicator: IndicatorSet {
                bb_ma: dec!(101.5),
                bb_upper: dec!(108.25),
                bb_lower: dec!(94.75),
                rsi: dec!(61.2),
                doji: 0,
                hammer: 0,
                shooting_star: 0,
            },
        }
    }

    #[test]
    fn test_feature_vector_length() {
        assert_eq!(features_to_vector(&record()).len(), FEATURE_NAMES.len());
    }

    #[test]
    fn test_feature_vector_order() {
        let v = features_to_vector(&record());
        assert_eq!(v[0], 100.0);
        assert_eq!(v[3], 12.5);
        assert_eq!(v[4], 1.0);
        assert!((v[5] - 0.119).abs() < 1e-12);
        assert!((v[9] - 61.2).abs() < 1e-12);
    }
}
