//! Data side of the dashboard: windowed series, chart overlays, 24h stats.

use crate::application::processing::indicators::{bollinger_bands, ema, macd, rsi, stochastic};
use crate::application::processing::{IndicatorParams, round_f64, round2};
use crate::domain::market::{ProcessedCandle, Timeframe};
use crate::domain::repositories::MarketDataRepository;
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

pub const EMA_SPANS: [usize; 3] = [9, 20, 50];
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const STOCH_K: usize = 14;
const STOCH_D: usize = 3;

/// Chart overlay requested by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Overlay {
    #[serde(rename = "BB")]
    Bollinger,
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "EMA")]
    Ema,
    #[serde(rename = "MACD")]
    Macd,
    #[serde(rename = "STOCH")]
    Stochastic,
}

impl Overlay {
    pub fn as_str(&self) -> &'static str {
        match self {
            Overlay::Bollinger => "BB",
            Overlay::Rsi => "RSI",
            Overlay::Ema => "EMA",
            Overlay::Macd => "MACD",
            Overlay::Stochastic => "STOCH",
        }
    }

    /// Comma-separated list; blank input selects Bollinger Bands only.
    pub fn parse_list(raw: &str) -> Result<Vec<Overlay>> {
        let mut overlays: Vec<Overlay> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<_>>()?;
        if overlays.is_empty() {
            overlays.push(Overlay::Bollinger);
        }
        overlays.sort();
        overlays.dedup();
        Ok(overlays)
    }
}

impl fmt::Display for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Overlay {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BB" => Ok(Overlay::Bollinger),
            "RSI" => Ok(Overlay::Rsi),
            "EMA" => Ok(Overlay::Ema),
            "MACD" => Ok(Overlay::Macd),
            "STOCH" => Ok(Overlay::Stochastic),
            other => Err(anyhow!(
                "Unknown indicator: {}. Must be one of BB, RSI, EMA, MACD, STOCH",
                other
            )),
        }
    }
}

/// One bar of the chart with its overlay values; missing values are omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    #[serde(rename = "openTime")]
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub overlays: BTreeMap<String, Decimal>,
}

/// Statistics over the 24 hours up to the latest bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub current_price: Decimal,
    pub price_change_24h: Decimal,
    /// Missing when the first open of the day is zero
    pub price_change_percentage_24h: Option<Decimal>,
    pub high_24h: Decimal,
    pub low_24h: Decimal,
    pub volume_24h: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub overlays: Vec<Overlay>,
    pub last_update: DateTime<Utc>,
    pub stats: DailyStats,
    pub points: Vec<ChartPoint>,
}

pub struct AnalysisService {
    repository: Arc<dyn MarketDataRepository>,
    params: IndicatorParams,
}

impl AnalysisService {
    pub fn new(repository: Arc<dyn MarketDataRepository>, params: IndicatorParams) -> Self {
        Self { repository, params }
    }

    /// `Ok(None)` when nothing is stored for `symbol`.
    pub async fn analyze(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        overlays: &[Overlay],
    ) -> Result<Option<AnalysisReport>> {
        let Some(latest) = self
            .repository
            .latest_open_time(symbol)
            .await
            .context("Failed to read latest record")?
        else {
            warn!("No stored data for {}", symbol);
            return Ok(None);
        };

        let start = match timeframe.lookback() {
            Some(lookback) => latest - lookback,
            None => DateTime::<Utc>::MIN_UTC,
        };
        let records = self
            .repository
            .find_range(symbol, start, latest)
            .await
            .context(format!("Failed to load {} series", symbol))?;
        let Some(stats) = daily_stats(&records) else {
            return Ok(None);
        };

        let mut overlays = overlays.to_vec();
        overlays.sort();
        overlays.dedup();

        let mut points: Vec<ChartPoint> = records
            .iter()
            .map(|r| ChartPoint {
                open_time: r.open_time,
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
                volume: r.volume,
                overlays: BTreeMap::new(),
            })
            .collect();
        for overlay in &overlays {
            self.apply_overlay(*overlay, &records, &mut points);
        }

        info!(
            "Analysis of {} over {}: {} points, overlays {:?}",
            symbol,
            timeframe,
            points.len(),
            overlays
        );

        Ok(Some(AnalysisReport {
            symbol: symbol.to_string(),
            timeframe,
            overlays,
            last_update: latest,
            stats,
            points,
        }))
    }

    fn apply_overlay(
        &self,
        overlay: Overlay,
        records: &[ProcessedCandle],
        points: &mut [ChartPoint],
    ) {
        match overlay {
            Overlay::Bollinger => {
                let high: Vec<_> = records.iter().map(|r| Some(r.high)).collect();
                let low: Vec<_> = records.iter().map(|r| Some(r.low)).collect();
                let close: Vec<_> = records.iter().map(|r| Some(r.close)).collect();
                let bands = bollinger_bands(
                    &high,
                    &low,
                    &close,
                    self.params.bb_period,
                    self.params.bb_std_dev,
                );
                for (point, band) in points.iter_mut().zip(bands) {
                    insert(point, "BB_MA", band.ma);
                    insert(point, "BB_UPPER", band.upper);
                    insert(point, "BB_LOWER", band.lower);
                }
            }
            Overlay::Rsi => {
                let close: Vec<_> = records.iter().map(|r| Some(r.close)).collect();
                for (point, value) in points.iter_mut().zip(rsi(&close, self.params.rsi_period)) {
                    insert(point, "RSI", value);
                }
            }
            Overlay::Ema => {
                let close = f64_column(records, |r| r.close);
                for span in EMA_SPANS {
                    let name = format!("EMA_{}", span);
                    for (point, value) in points.iter_mut().zip(ema(&close, span)) {
                        insert(point, &name, round_f64(value, 2));
                    }
                }
            }
            Overlay::Macd => {
                let close = f64_column(records, |r| r.close);
                for (point, m) in points
                    .iter_mut()
                    .zip(macd(&close, MACD_FAST, MACD_SLOW, MACD_SIGNAL))
                {
                    insert(point, "MACD_LINE", m.macd);
                    insert(point, "MACD_SIGNAL", m.signal);
                    insert(point, "MACD_HIST", m.histogram);
                }
            }
            Overlay::Stochastic => {
                let high = f64_column(records, |r| r.high);
                let low = f64_column(records, |r| r.low);
                let close = f64_column(records, |r| r.close);
                for (point, s) in points
                    .iter_mut()
                    .zip(stochastic(&high, &low, &close, STOCH_K, STOCH_D))
                {
                    insert(point, "STOCH_K", s.k);
                    insert(point, "STOCH_D", s.d);
                }
            }
        }
    }
}

fn insert(point: &mut ChartPoint, name: &str, value: Option<Decimal>) {
    if let Some(value) = value {
        point.overlays.insert(name.to_string(), value);
    }
}

fn f64_column(
    records: &[ProcessedCandle],
    field: impl Fn(&ProcessedCandle) -> Decimal,
) -> Vec<f64> {
    records
        .iter()
        .map(|r| field(r).to_f64().unwrap_or(f64::NAN))
        .collect()
}

/// 24h statistics relative to the last record of an ascending series.
pub fn daily_stats(records: &[ProcessedCandle]) -> Option<DailyStats> {
    let latest = records.last()?;
    let day_start = latest.open_time - Duration::days(1);
    let day: Vec<&ProcessedCandle> = records
        .iter()
        .filter(|r| r.open_time >= day_start)
        .collect();
    let day_open = day.first()?.open;

    let price_change = latest.close - day_open;
    let price_change_percentage_24h = price_change
        .checked_div(day_open)
        .map(|ratio| round2(ratio * Decimal::ONE_HUNDRED));

    Some(DailyStats {
        current_price: latest.close,
        price_change_24h: price_change,
        price_change_percentage_24h,
        high_24h: day.iter().map(|r| r.high).max()?,
        low_24h: day.iter().map(|r| r.low).min()?,
        volume_24h: day.iter().map(|r| r.volume).sum(),
    })
}
