//! Prometheus metrics definitions for cryptobot
//!
//! All metrics use the `cryptobot_` prefix.

use prometheus::{CounterVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Prometheus metrics for the data pipeline
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Records written to the store, per symbol
    pub rows_persisted_total: CounterVec,
    /// Fetched rows eliminated by the final projection, per symbol
    pub rows_dropped_total: CounterVec,
    /// Symbols whose pipeline pass failed
    pub symbol_failures_total: CounterVec,
    /// Prediction requests served, per symbol
    pub prediction_requests_total: CounterVec,
    /// Wall time of a full pipeline run
    pub pipeline_duration_seconds: Histogram,
}

impl Metrics {
    /// Create a new Metrics instance with all counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let rows_persisted_total = CounterVec::new(
            Opts::new(
                "cryptobot_rows_persisted_total",
                "Processed records written to the store",
            ),
            &["symbol"],
        )?;
        registry.register(Box::new(rows_persisted_total.clone()))?;

        let rows_dropped_total = CounterVec::new(
            Opts::new(
                "cryptobot_rows_dropped_total",
                "Fetched rows dropped for missing values or warm-up",
            ),
            &["symbol"],
        )?;
        registry.register(Box::new(rows_dropped_total.clone()))?;

        let symbol_failures_total = CounterVec::new(
            Opts::new(
                "cryptobot_symbol_failures_total",
                "Per-symbol pipeline failures",
            ),
            &["symbol"],
        )?;
        registry.register(Box::new(symbol_failures_total.clone()))?;

        let prediction_requests_total = CounterVec::new(
            Opts::new(
                "cryptobot_prediction_requests_total",
                "Prediction requests per symbol",
            ),
            &["symbol"],
        )?;
        registry.register(Box::new(prediction_requests_total.clone()))?;

        let pipeline_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "cryptobot_pipeline_duration_seconds",
                "Duration of a full pipeline run in seconds",
            )
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        )?;
        registry.register(Box::new(pipeline_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            rows_persisted_total,
            rows_dropped_total,
            symbol_failures_total,
            prediction_requests_total,
            pipeline_duration_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn record_symbol_run(&self, symbol: &str, persisted: usize, dropped: usize) {
        self.rows_persisted_total
            .with_label_values(&[symbol])
            .inc_by(persisted as f64);
        self.rows_dropped_total
            .with_label_values(&[symbol])
            .inc_by(dropped as f64);
    }

    pub fn inc_symbol_failure(&self, symbol: &str) {
        self.symbol_failures_total
            .with_label_values(&[symbol])
            .inc();
    }

    pub fn inc_prediction_requests(&self, symbol: &str) {
        self.prediction_requests_total
            .with_label_values(&[symbol])
            .inc();
    }

    pub fn observe_pipeline_duration(&self, seconds: f64) {
        self.pipeline_duration_seconds.observe(seconds);
    }
}
