//! Push-based metrics reporter for cryptobot
//!
//! Outputs a metrics snapshot as one structured JSON line on stdout.

use crate::infrastructure::observability::metrics::Metrics;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

/// Metrics snapshot for JSON output
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub pipeline_runs: u64,
    pub pipeline_duration_seconds_total: f64,
    pub symbols: Vec<SymbolSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub rows_persisted: f64,
    pub rows_dropped: f64,
    pub failures: f64,
    pub prediction_requests: f64,
}

/// Push-based metrics reporter
///
/// No HTTP server, no incoming connections - only outbound data.
pub struct MetricsReporter {
    metrics: Metrics,
    start_time: Instant,
}

impl MetricsReporter {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            metrics,
            start_time: Instant::now(),
        }
    }

    /// Print one `METRICS_JSON:` line covering `symbols`
    pub fn report(&self, symbols: &[String]) {
        let snapshot = self.collect_snapshot(symbols);
        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                // Use a special prefix so logs can be easily filtered
                println!("METRICS_JSON:{}", json);
                info!(
                    "Pipeline runs: {} | Symbols: {} | Uptime: {}s",
                    snapshot.pipeline_runs,
                    snapshot.symbols.len(),
                    snapshot.uptime_seconds
                );
            }
            Err(e) => warn!("Failed to serialize metrics: {}", e),
        }
    }

    /// Collect current metrics snapshot
    pub fn collect_snapshot(&self, symbols: &[String]) -> MetricsSnapshot {
        let m = &self.metrics;
        let symbols = symbols
            .iter()
            .map(|symbol| SymbolSnapshot {
                symbol: symbol.clone(),
                rows_persisted: m.rows_persisted_total.with_label_values(&[symbol.as_str()]).get(),
                rows_dropped: m.rows_dropped_total.with_label_values(&[symbol.as_str()]).get(),
                failures: m.symbol_failures_total.with_label_values(&[symbol.as_str()]).get(),
                prediction_requests: m
                    .prediction_requests_total
                    .with_label_values(&[symbol.as_str()])
                    .get(),
            })
            .collect();

        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            pipeline_runs: m.pipeline_duration_seconds.get_sample_count(),
            pipeline_duration_seconds_total: m.pipeline_duration_seconds.get_sample_sum(),
            symbols,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_snapshot_collection() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.record_symbol_run("BTCUSDT", 10, 19);
        metrics.observe_pipeline_duration(2.0);
        let reporter = MetricsReporter::new(metrics);

        let snapshot = reporter.collect_snapshot(&["BTCUSDT".to_string()]);

        assert_eq!(snapshot.pipeline_runs, 1);
        assert_eq!(snapshot.symbols.len(), 1);
        assert_eq!(snapshot.symbols[0].rows_persisted, 10.0);
        assert!(!snapshot.timestamp.is_empty());
    }

    #[test]
    fn test_snapshot_serialization() {
        let reporter = MetricsReporter::new(Metrics::new().expect("Failed to create metrics"));
        let snapshot = reporter.collect_snapshot(&["ETHUSDT".to_string()]);
        let json = serde_json::to_string(&snapshot).expect("Failed to serialize");
        assert!(json.contains("ETHUSDT"));
        assert!(json.contains("pipeline_runs"));
    }
}
