//! Per-symbol extract -> process -> persist orchestration.

use crate::application::processing::DataProcessor;
use crate::domain::errors::PipelineError;
use crate::domain::market::KlineInterval;
use crate::domain::ports::{KlineRequest, MarketDataSource};
use crate::domain::repositories::MarketDataRepository;
use crate::infrastructure::observability::Metrics;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// What to fetch on each run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub symbols: Vec<String>,
    pub interval: KlineInterval,
    pub kline_limit: u32,
    /// History requested for a symbol with no stored records
    pub initial_lookback_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub fetched: usize,
    pub persisted: usize,
    pub dropped: usize,
    pub invalid: usize,
    pub gaps: usize,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: String,
}

/// Outcome of one pass over all configured symbols
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub succeeded: Vec<SymbolReport>,
    pub failed: Vec<SymbolFailure>,
    pub duration_secs: f64,
}

impl RunReport {
    pub fn total_persisted(&self) -> usize {
        self.succeeded.iter().map(|r| r.persisted).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct PipelineOrchestrator {
    source: Arc<dyn MarketDataSource>,
    repository: Arc<dyn MarketDataRepository>,
    processor: DataProcessor,
    settings: PipelineSettings,
    metrics: Option<Metrics>,
}

impl PipelineOrchestrator {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        repository: Arc<dyn MarketDataRepository>,
        processor: DataProcessor,
        settings: PipelineSettings,
    ) -> Self {
        let processor = processor.with_interval(settings.interval.duration());
        Self {
            source,
            repository,
            processor,
            settings,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Processes every configured symbol in order. A failing symbol is
    /// logged and reported; the remaining symbols still run.
    pub async fn run(&self) -> RunReport {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::default();

        info!(
            "Pipeline run started for {} symbols ({} bars)",
            self.settings.symbols.len(),
            self.settings.interval
        );

        for symbol in &self.settings.symbols {
            match self.run_symbol(symbol, now).await {
                Ok(symbol_report) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_symbol_run(
                            symbol,
                            symbol_report.persisted,
                            symbol_report.dropped,
                        );
                    }
                    report.succeeded.push(symbol_report);
                }
                Err(e) => {
                    error!("Pipeline failed for {}: {}", symbol, e);
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_symbol_failure(symbol);
                    }
                    report.failed.push(SymbolFailure {
                        symbol: e.symbol().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.duration_secs = started.elapsed().as_secs_f64();
        if let Some(metrics) = &self.metrics {
            metrics.observe_pipeline_duration(report.duration_secs);
        }

        info!(
            "Pipeline run finished in {:.2}s: {} ok, {} failed, {} records persisted",
            report.duration_secs,
            report.succeeded.len(),
            report.failed.len(),
            report.total_persisted()
        );
        report
    }

    pub async fn run_symbol(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<SymbolReport, PipelineError> {
        let latest = self
            .repository
            .latest_open_time(symbol)
            .await
            .map_err(|e| PipelineError::Storage {
                symbol: symbol.to_string(),
                reason: format!("{:#}", e),
            })?;

        let start = self
            .window_start(latest, now)
            .ok_or_else(|| PipelineError::Window {
                symbol: symbol.to_string(),
                reason: format!("cannot step back from {:?} (now {})", latest, now),
            })?;
        info!("{}: fetching {} klines from {} to {}", symbol, self.settings.interval, start, now);

        let request = KlineRequest {
            symbol: symbol.to_string(),
            interval: self.settings.interval,
            start,
            end: now,
            limit: self.settings.kline_limit,
        };
        let rows = self
            .source
            .fetch_klines(&request)
            .await
            .map_err(|source| PipelineError::Fetch {
                symbol: symbol.to_string(),
                source,
            })?;
        let fetched = rows.len();

        let series = self.processor.process(symbol, rows);
        if series.invalid_rows > 0 {
            warn!("{}: {} rows violate OHLC bounds", symbol, series.invalid_rows);
        }

        // Warm-up bars before the stored head only seed the indicator windows
        let records: Vec<_> = match latest {
            Some(head) => series
                .records
                .into_iter()
                .filter(|r| r.open_time >= head)
                .collect(),
            None => series.records,
        };

        let persisted = if records.is_empty() {
            0
        } else {
            self.repository
                .save_batch(&records)
                .await
                .map_err(|e| PipelineError::Storage {
                    symbol: symbol.to_string(),
                    reason: format!("{:#}", e),
                })?
        };

        info!(
            "{}: {} fetched, {} persisted, {} dropped",
            symbol, fetched, persisted, series.dropped_rows
        );

        Ok(SymbolReport {
            symbol: symbol.to_string(),
            fetched,
            persisted,
            dropped: series.dropped_rows,
            invalid: series.invalid_rows,
            gaps: series.gaps,
            window_start: start,
            window_end: now,
        })
    }

    /// First-run symbols go back `initial_lookback_days`; otherwise the
    /// window restarts `min_history` bars before the stored head so the
    /// head is recomputed with complete indicator windows. `None` when the
    /// step back leaves the representable time range.
    pub fn window_start(
        &self,
        latest: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match latest {
            Some(head) => {
                let warmup = i32::try_from(self.processor.params().min_history()).ok()?;
                let span = self.settings.interval.duration().checked_mul(warmup)?;
                head.checked_sub_signed(span)
            }
            None => {
                let lookback = TimeDelta::try_days(self.settings.initial_lookback_days)?;
                now.checked_sub_signed(lookback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::processing::IndicatorParams;
    use crate::infrastructure::mock::{MockMarketDataSource, synthetic_klines};
    use crate::infrastructure::repositories::InMemoryMarketDataRepository;
    use chrono::{Duration, TimeZone};

    const HOUR_MS: i64 = 3_600_000;

    fn settings(symbols: &[&str]) -> PipelineSettings {
        PipelineSettings {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            interval: KlineInterval::OneHour,
            kline_limit: 1000,
            initial_lookback_days: 30,
        }
    }

    fn orchestrator(
        source: MockMarketDataSource,
        repository: Arc<InMemoryMarketDataRepository>,
        symbols: &[&str],
    ) -> PipelineOrchestrator {
        PipelineOrchestrator::new(
            Arc::new(source),
            repository,
            DataProcessor::new(IndicatorParams::default()),
            settings(symbols),
        )
    }

    #[tokio::test]
    async fn test_failing_symbol_does_not_abort_run() {
        let source = MockMarketDataSource::new()
            .with_klines("BTCUSDT", synthetic_klines(0, HOUR_MS, 60))
            .with_failure("ETHUSDT");
        let repository = Arc::new(InMemoryMarketDataRepository::new());
        let pipeline = orchestrator(source, repository.clone(), &["ETHUSDT", "BTCUSDT"]);

        let report = pipeline.run().await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].symbol, "ETHUSDT");
        assert_eq!(report.succeeded.len(), 1);
        // 60 bars, the first 19 lack a full Bollinger window
        assert_eq!(report.succeeded[0].persisted, 41);
        assert_eq!(report.succeeded[0].dropped, 19);
        assert_eq!(repository.count("BTCUSDT").await, 41);
    }

    #[tokio::test]
    async fn test_first_run_uses_initial_lookback() {
        let source = MockMarketDataSource::new().with_klines("BTCUSDT", Vec::new());
        let repository = Arc::new(InMemoryMarketDataRepository::new());
        let pipeline = orchestrator(source.clone(), repository, &["BTCUSDT"]);
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();

        let report = pipeline.run_at(now).await;

        assert_eq!(report.succeeded[0].persisted, 0);
        let requests = source.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].start, now - Duration::days(30));
        assert_eq!(requests[0].end, now);
    }

    #[tokio::test]
    async fn test_incremental_run_restarts_before_stored_head() {
        let rows = synthetic_klines(0, HOUR_MS, 60);
        let source = MockMarketDataSource::new().with_klines("BTCUSDT", rows);
        let repository = Arc::new(InMemoryMarketDataRepository::new());
        let pipeline = orchestrator(source.clone(), repository.clone(), &["BTCUSDT"]);

        pipeline.run().await;
        let head = repository.latest_open_time("BTCUSDT").await.unwrap().unwrap();
        let second = pipeline.run().await;

        let requests = source.requests();
        assert_eq!(requests[1].start, head - Duration::hours(20));
        // Only bars at or after the stored head are rewritten
        assert_eq!(second.succeeded[0].persisted, 1);
        assert_eq!(repository.count("BTCUSDT").await, 41);
    }

    #[tokio::test]
    async fn test_unrepresentable_window_fails_only_that_symbol() {
        let source = MockMarketDataSource::new()
            .with_klines("BTCUSDT", synthetic_klines(0, HOUR_MS, 60))
            .with_klines("ETHUSDT", synthetic_klines(0, HOUR_MS, 60));
        let repository = Arc::new(InMemoryMarketDataRepository::new());
        orchestrator(source.clone(), repository.clone(), &["BTCUSDT"])
            .run()
            .await;

        let mut oversized = settings(&["ETHUSDT", "BTCUSDT"]);
        oversized.initial_lookback_days = 100_000_000;
        let pipeline = PipelineOrchestrator::new(
            Arc::new(source),
            repository.clone(),
            DataProcessor::new(IndicatorParams::default()),
            oversized,
        );

        let report = pipeline.run().await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].symbol, "ETHUSDT");
        assert!(report.failed[0].reason.contains("out of range"));
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.succeeded[0].symbol, "BTCUSDT");
        assert_eq!(repository.count("ETHUSDT").await, 0);
    }
}
