use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::application::analysis::AnalysisService;
use crate::application::bootstrap::persistence::PersistenceHandle;
use crate::application::ml::onnx_predictor::OnnxModelLoader;
use crate::application::ml::predictor::ModelLoader;
use crate::application::pipeline::{PipelineOrchestrator, PipelineSettings};
use crate::application::prediction_service::PredictionService;
use crate::application::processing::DataProcessor;
use crate::config::Config;
use crate::domain::ports::MarketDataSource;
use crate::infrastructure::binance::BinanceMarketDataService;
use crate::infrastructure::observability::Metrics;

pub struct ServicesHandle {
    pub market_source: Arc<dyn MarketDataSource>,
    pub pipeline: Arc<PipelineOrchestrator>,
    pub prediction: Arc<PredictionService>,
    pub analysis: Arc<AnalysisService>,
}

pub struct ServicesBootstrap;

impl ServicesBootstrap {
    /// Live wiring: Binance REST source and ONNX models from `MODEL_DIR`.
    pub fn init(
        config: &Config,
        persistence: &PersistenceHandle,
        metrics: Metrics,
    ) -> Result<ServicesHandle> {
        info!("Using Binance market data ({})", config.exchange.base_url);
        let market_source: Arc<dyn MarketDataSource> = Arc::new(
            BinanceMarketDataService::builder()
                .api_key(config.exchange.api_key.clone())
                .base_url(config.exchange.base_url.clone())
                .http_settings(config.exchange.http_settings())
                .build(),
        );
        let loader: Arc<dyn ModelLoader> = Arc::new(OnnxModelLoader::new(
            config.model.model_dir.clone(),
            config.model.sequence_length,
        ));
        Ok(Self::with_collaborators(
            config,
            persistence,
            market_source,
            loader,
            metrics,
        ))
    }

    /// Wiring with injected collaborators (tests, offline runs).
    pub fn with_collaborators(
        config: &Config,
        persistence: &PersistenceHandle,
        market_source: Arc<dyn MarketDataSource>,
        loader: Arc<dyn ModelLoader>,
        metrics: Metrics,
    ) -> ServicesHandle {
        let params = config.indicators.params();
        let settings = PipelineSettings {
            symbols: config.exchange.symbols.clone(),
            interval: config.exchange.interval,
            kline_limit: config.exchange.kline_limit,
            initial_lookback_days: config.exchange.initial_lookback_days,
        };

        let pipeline = PipelineOrchestrator::new(
            market_source.clone(),
            persistence.market_data_repository.clone(),
            DataProcessor::new(params),
            settings,
        )
        .with_metrics(metrics.clone());

        let prediction = PredictionService::new(
            persistence.market_data_repository.clone(),
            persistence.prediction_repository.clone(),
            loader,
        )
        .with_metrics(metrics);

        let analysis = AnalysisService::new(persistence.market_data_repository.clone(), params);

        ServicesHandle {
            market_source,
            pipeline: Arc::new(pipeline),
            prediction: Arc::new(prediction),
            analysis: Arc::new(analysis),
        }
    }
}
