//! Push-based observability for cryptobot
//!
//! Metrics leave the process only as outbound data: a `METRICS_JSON:` line on
//! stdout after each pipeline run. There is no HTTP server.

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::MetricsReporter;
