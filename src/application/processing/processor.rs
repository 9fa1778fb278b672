use crate::application::processing::indicators::{BollingerPoint, bollinger_bands, rsi};
use crate::application::processing::{CandlePatternDetector, SeriesNormalizer};
use crate::domain::market::{IndicatorSet, NormalizedCandle, ProcessedCandle, RawKline};
use crate::domain::validation::data_quality::SeriesValidator;
use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

/// Window parameters of the stored indicators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorParams {
    pub bb_period: usize,
    pub bb_std_dev: Decimal,
    pub rsi_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            bb_period: 20,
            bb_std_dev: dec!(2),
            rsi_period: 14,
        }
    }
}

impl IndicatorParams {
    /// Bars that must precede the first trusted output row
    pub fn min_history(&self) -> usize {
        self.bb_period.max(self.rsi_period)
    }
}

/// Output of one processing pass
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedSeries {
    pub records: Vec<ProcessedCandle>,
    pub input_rows: usize,
    /// Rows eliminated by the final projection
    pub dropped_rows: usize,
    pub invalid_rows: usize,
    pub gaps: usize,
}

/// Raw rows -> normalized series -> indicators -> patterns -> complete records.
#[derive(Debug, Clone)]
pub struct DataProcessor {
    params: IndicatorParams,
    interval: Option<Duration>,
}

impl DataProcessor {
    pub fn new(params: IndicatorParams) -> Self {
        Self {
            params,
            interval: None,
        }
    }

    /// Enables gap detection against the expected bar spacing.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    pub fn process(&self, symbol: &str, rows: Vec<RawKline>) -> ProcessedSeries {
        let input_rows = rows.len();
        let ordered = SeriesNormalizer::order_and_dedupe(rows);
        let series = SeriesNormalizer::normalize(symbol, &ordered);

        let invalid_rows = SeriesValidator::count_invalid(&series);
        let gaps = match self.interval {
            Some(interval) => SeriesValidator::count_gaps(&series, interval),
            None => 0,
        };
        if gaps > 0 {
            warn!(
                "{}: {} irregular gaps in series, indicators computed over positional windows",
                symbol, gaps
            );
        }

        let records = self.process_normalized(&series);
        let dropped_rows = input_rows - records.len();
        debug!(
            "{}: processed {} rows into {} records ({} dropped)",
            symbol,
            input_rows,
            records.len(),
            dropped_rows
        );

        ProcessedSeries {
            records,
            input_rows,
            dropped_rows,
            invalid_rows,
            gaps,
        }
    }

    /// Runs the indicator and pattern pass over an ascending series and keeps
    /// only the rows where every stored field is present.
    pub fn process_normalized(&self, series: &[NormalizedCandle]) -> Vec<ProcessedCandle> {
        let high: Vec<Option<Decimal>> = series.iter().map(|c| c.high).collect();
        let low: Vec<Option<Decimal>> = series.iter().map(|c| c.low).collect();
        let close: Vec<Option<Decimal>> = series.iter().map(|c| c.close).collect();

        let bands = bollinger_bands(
            &high,
            &low,
            &close,
            self.params.bb_period,
            self.params.bb_std_dev,
        );
        let rsi_values = rsi(&close, self.params.rsi_period);

        series
            .iter()
            .zip(bands)
            .zip(rsi_values)
            .filter_map(|((candle, band), rsi)| project(candle, band, rsi))
            .collect()
    }
}

fn project(
    candle: &NormalizedCandle,
    band: BollingerPoint,
    rsi: Option<Decimal>,
) -> Option<ProcessedCandle> {
    let flags = CandlePatternDetector::detect(candle.open, candle.high, candle.low, candle.close);
    Some(ProcessedCandle {
        symbol: candle.symbol.clone(),
        open_time: candle.open_time,
        open: candle.open?,
        high: candle.high?,
        low: candle.low?,
        close: candle.close?,
        volume: candle.volume?,
        trend: candle.trend,
        volume_price_ratio: candle.volume_price_ratio?,
        indicator: IndicatorSet {
            bb_ma: band.ma?,
            bb_upper: band.upper?,
            bb_lower: band.lower?,
            rsi: rsi?,
            doji: flags.doji,
            hammer: flags.hammer,
            shooting_star: flags.shooting_star,
        },
    })
}
