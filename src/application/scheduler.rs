use crate::application::pipeline::{PipelineOrchestrator, RunReport};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Repeats pipeline runs on a fixed period until a shutdown signal.
pub struct PipelineScheduler {
    orchestrator: Arc<PipelineOrchestrator>,
    period: Duration,
}

impl PipelineScheduler {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, period: Duration) -> Self {
        Self {
            orchestrator,
            period,
        }
    }

    pub fn every_hours(orchestrator: Arc<PipelineOrchestrator>, hours: u64) -> Self {
        Self::new(orchestrator, Duration::from_secs(hours.saturating_mul(3600)))
    }

    /// The first run starts immediately. `after_run` sees each report (metrics
    /// push, logging). Returns the number of completed runs.
    pub async fn run_until<S, F>(&self, shutdown: S, mut after_run: F) -> usize
    where
        S: Future<Output = ()>,
        F: FnMut(&RunReport),
    {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut runs = 0;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Scheduler stopping after {} runs", runs);
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.orchestrator.run().await;
                    runs += 1;
                    after_run(&report);
                    info!("Next pipeline run in {:?}", self.period);
                }
            }
        }
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pipeline::PipelineSettings;
    use crate::application::processing::{DataProcessor, IndicatorParams};
    use crate::domain::market::KlineInterval;
    use crate::infrastructure::mock::{MockMarketDataSource, synthetic_klines};
    use crate::infrastructure::repositories::InMemoryMarketDataRepository;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_scheduler_stops_on_shutdown() {
        let source = MockMarketDataSource::new()
            .with_klines("BTCUSDT", synthetic_klines(0, 3_600_000, 30));
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            Arc::new(source.clone()),
            Arc::new(InMemoryMarketDataRepository::new()),
            DataProcessor::new(IndicatorParams::default()),
            PipelineSettings {
                symbols: vec!["BTCUSDT".to_string()],
                interval: KlineInterval::OneHour,
                kline_limit: 1000,
                initial_lookback_days: 30,
            },
        ));
        let scheduler = PipelineScheduler::every_hours(orchestrator, 1);

        let (tx, rx) = oneshot::channel::<()>();
        let mut tx = Some(tx);
        let mut persisted = Vec::new();
        let runs = scheduler
            .run_until(
                async {
                    let _ = rx.await;
                },
                |report| {
                    persisted.push(report.total_persisted());
                    if let Some(tx) = tx.take() {
                        let _ = tx.send(());
                    }
                },
            )
            .await;

        assert_eq!(runs, 1);
        assert_eq!(persisted, vec![11]);
        assert_eq!(source.requests().len(), 1);
    }
}
