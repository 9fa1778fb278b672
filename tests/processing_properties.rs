use cryptobot::application::processing::indicators::{bollinger_bands, relative_strength_index};
use cryptobot::application::processing::{CandlePatternDetector, DataProcessor, IndicatorParams};
use cryptobot::domain::market::RawKline;
use cryptobot::infrastructure::mock::synthetic_klines;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const HOUR_MS: i64 = 3_600_000;

fn processor() -> DataProcessor {
    DataProcessor::new(IndicatorParams::default())
}

#[test]
fn test_indicator_bounds_hold_on_every_record() {
    let series = processor().process("BTCUSDT", synthetic_klines(0, HOUR_MS, 200));

    assert_eq!(series.records.len(), 181);
    for record in &series.records {
        let ind = &record.indicator;
        assert!(ind.bb_upper >= ind.bb_ma, "{:?}", record);
        assert!(ind.bb_ma >= ind.bb_lower, "{:?}", record);
        assert!(ind.rsi >= Decimal::ZERO && ind.rsi <= Decimal::ONE_HUNDRED);
        assert!(ind.doji <= 1 && ind.hammer <= 1 && ind.shooting_star <= 1);
        assert!(record.trend == 1 || record.trend == -1);
    }
}

#[test]
fn test_processing_is_deterministic() {
    let rows = synthetic_klines(0, HOUR_MS, 60);
    let first = processor().process("ETHUSDT", rows.clone());
    let second = processor().process("ETHUSDT", rows);

    assert_eq!(
        serde_json::to_string(&first.records).unwrap(),
        serde_json::to_string(&second.records).unwrap()
    );
}

#[test]
fn test_short_series_yields_nothing() {
    let series = processor().process("BTCUSDT", synthetic_klines(0, HOUR_MS, 19));
    assert!(series.records.is_empty());
    assert_eq!(series.dropped_rows, 19);
}

#[test]
fn test_unordered_duplicated_input_matches_clean_input() {
    let clean = synthetic_klines(0, HOUR_MS, 40);
    let mut shuffled: Vec<RawKline> = clean.iter().rev().cloned().collect();
    shuffled.push(clean[10].clone());

    let expected = processor().process("BTCUSDT", clean).records;
    let actual = processor().process("BTCUSDT", shuffled).records;

    assert_eq!(actual, expected);
}

#[test]
fn test_zero_close_row_is_dropped() {
    let mut rows = synthetic_klines(0, HOUR_MS, 30);
    rows[25].close = "0".to_string();
    rows[25].volume = "10".to_string();

    let series = processor().process("BTCUSDT", rows);

    // Bars 19..=29 have full windows, bar 25 has no volume/price ratio
    assert_eq!(series.records.len(), 10);
    assert!(
        series
            .records
            .iter()
            .all(|r| r.open_time.timestamp_millis() != 25 * HOUR_MS)
    );
}

#[test]
fn test_unparseable_price_is_dropped_not_fatal() {
    let mut rows = synthetic_klines(0, HOUR_MS, 30);
    rows[29].high = "n/a".to_string();

    let series = processor().process("BTCUSDT", rows);

    assert_eq!(series.records.len(), 10);
    assert_eq!(
        series.records.last().map(|r| r.open_time.timestamp_millis()),
        Some(28 * HOUR_MS)
    );
}

#[test]
fn test_small_body_is_doji() {
    let flags = CandlePatternDetector::detect(
        Some(dec!(100)),
        Some(dec!(110)),
        Some(dec!(95)),
        Some(dec!(100.2)),
    );
    assert_eq!((flags.doji, flags.hammer, flags.shooting_star), (1, 0, 0));
}

#[test]
fn test_rsi_without_losses_is_one_hundred() {
    assert_eq!(relative_strength_index(dec!(5), dec!(0)), Some(dec!(100)));
}

#[test]
fn test_constant_typical_price_collapses_bands() {
    let price = vec![Some(dec!(50)); 20];
    let bands = bollinger_bands(&price, &price, &price, 20, dec!(2));

    let last = bands[19];
    assert_eq!(last.ma, Some(dec!(50)));
    assert_eq!(last.upper, Some(dec!(50)));
    assert_eq!(last.lower, Some(dec!(50)));
    assert!(bands[..19].iter().all(|b| b.ma.is_none()));
}

#[test]
fn test_overflowing_prices_are_dropped_not_fatal() {
    let mut rows = synthetic_klines(0, HOUR_MS, 30);
    for row in &mut rows[25..] {
        row.open = "79228162514264337593543950335".to_string();
        row.high = "79228162514264337593543950335".to_string();
        row.low = "79228162514264337593543950335".to_string();
        row.close = "79228162514264337593543950335".to_string();
    }

    let series = processor().process("BTCUSDT", rows);

    // Bars 19..=24 keep clean windows; every window touching bar 25 overflows
    assert_eq!(series.records.len(), 6);
    assert_eq!(
        series.records.last().map(|r| r.open_time.timestamp_millis()),
        Some(24 * HOUR_MS)
    );
}
