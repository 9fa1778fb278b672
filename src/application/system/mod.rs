use anyhow::{Context, Result, anyhow};
use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use tracing::{error, info};

use crate::application::bootstrap::{
    PersistenceBootstrap, PersistenceHandle, ServicesBootstrap, ServicesHandle,
};
use crate::application::ml::predictor::ModelLoader;
use crate::application::pipeline::RunReport;
use crate::application::scheduler::PipelineScheduler;
use crate::config::{Config, MAX_HISTORY_DAYS, ensure_range};
use crate::domain::ports::MarketDataSource;
use crate::infrastructure::observability::{Metrics, MetricsReporter};

pub struct Application {
    pub config: Config,
    pub persistence: PersistenceHandle,
    pub services: ServicesHandle,
    pub metrics: Metrics,
    reporter: Option<MetricsReporter>,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self> {
        info!(
            "Building cryptobot ({} symbols, {} bars, {:?} storage)",
            config.exchange.symbols.len(),
            config.exchange.interval,
            config.storage.backend
        );

        let metrics = Metrics::new()?;
        let persistence = PersistenceBootstrap::init(&config.storage).await?;
        let services = ServicesBootstrap::init(&config, &persistence, metrics.clone())?;
        Ok(Self::assemble(config, persistence, services, metrics))
    }

    /// Builds the application around injected collaborators.
    pub fn with_collaborators(
        config: Config,
        persistence: PersistenceHandle,
        market_source: Arc<dyn MarketDataSource>,
        loader: Arc<dyn ModelLoader>,
    ) -> Result<Self> {
        let metrics = Metrics::new()?;
        let services = ServicesBootstrap::with_collaborators(
            &config,
            &persistence,
            market_source,
            loader,
            metrics.clone(),
        );
        Ok(Self::assemble(config, persistence, services, metrics))
    }

    fn assemble(
        config: Config,
        persistence: PersistenceHandle,
        services: ServicesHandle,
        metrics: Metrics,
    ) -> Self {
        let reporter = config
            .observability
            .enabled
            .then(|| MetricsReporter::new(metrics.clone()));
        Self {
            config,
            persistence,
            services,
            metrics,
            reporter,
        }
    }

    /// One pipeline pass over all configured symbols.
    pub async fn run_once(&self) -> RunReport {
        let report = self.services.pipeline.run().await;
        self.report_metrics();
        report
    }

    /// Runs the pipeline every `SCHEDULE_INTERVAL_HOURS` until Ctrl+C.
    pub async fn run_scheduled(&self) -> Result<usize> {
        let scheduler = PipelineScheduler::every_hours(
            self.services.pipeline.clone(),
            self.config.schedule_interval_hours,
        );
        info!(
            "Scheduler started: every {}h, Ctrl+C to stop",
            self.config.schedule_interval_hours
        );

        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C signal.");
        };
        let runs = scheduler
            .run_until(shutdown, |report| {
                if !report.is_success() {
                    error!("{} symbols failed in this run", report.failed.len());
                }
                self.report_metrics();
            })
            .await;
        Ok(runs)
    }

    /// Deletes records older than `days` (default `RETENTION_DAYS`).
    pub async fn prune(&self, days: Option<i64>) -> Result<usize> {
        let days = days.unwrap_or(self.config.storage.retention_days);
        ensure_range("retention days", days, 1, MAX_HISTORY_DAYS)?;
        let cutoff = TimeDelta::try_days(days)
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .ok_or_else(|| anyhow!("Retention of {} days is out of range", days))?;
        let removed = self
            .persistence
            .market_data_repository
            .prune(cutoff)
            .await
            .context("Failed to prune market data")?;
        info!("Pruned {} records older than {}", removed, cutoff);
        Ok(removed)
    }

    pub fn report_metrics(&self) {
        if let Some(reporter) = &self.reporter {
            reporter.report(&self.config.exchange.symbols);
        }
    }

    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        self.persistence.shutdown().await;
        info!("Shutdown sequence completed.");
    }
}
