use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::{StorageBackend, StorageEnvConfig};
use crate::domain::repositories::{MarketDataRepository, PredictionRepository};
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::json_file::{
    JsonFileMarketDataRepository, JsonFilePredictionRepository,
};
use crate::infrastructure::persistence::repositories::{
    SqliteMarketDataRepository, SqlitePredictionRepository,
};

pub struct PersistenceHandle {
    /// Present for the sqlite backend only
    pub db: Option<Database>,
    pub market_data_repository: Arc<dyn MarketDataRepository>,
    pub prediction_repository: Arc<dyn PredictionRepository>,
}

impl PersistenceHandle {
    /// Releases the connection pool, if any.
    pub async fn shutdown(&self) {
        if let Some(db) = &self.db {
            db.close().await;
            info!("Database pool closed");
        }
    }
}

pub struct PersistenceBootstrap;

impl PersistenceBootstrap {
    pub async fn init(config: &StorageEnvConfig) -> Result<PersistenceHandle> {
        match config.backend {
            StorageBackend::Sqlite => {
                info!("Initializing Database at {}", config.database_url);
                let db = Database::new(&config.database_url)
                    .await
                    .context("Failed to initialize database")?;
                Ok(Self::sqlite(db))
            }
            StorageBackend::Json => {
                info!("Using JSON file storage in {}", config.data_dir.display());
                std::fs::create_dir_all(&config.data_dir).context(format!(
                    "Failed to create data directory {}",
                    config.data_dir.display()
                ))?;
                Ok(PersistenceHandle {
                    db: None,
                    market_data_repository: Arc::new(JsonFileMarketDataRepository::new(
                        config.data_dir.clone(),
                    )),
                    prediction_repository: Arc::new(JsonFilePredictionRepository::new(
                        config.data_dir.clone(),
                    )),
                })
            }
        }
    }

    /// Wraps an open database in sqlite repositories.
    pub fn sqlite(db: Database) -> PersistenceHandle {
        PersistenceHandle {
            market_data_repository: Arc::new(SqliteMarketDataRepository::new(db.pool.clone())),
            prediction_repository: Arc::new(SqlitePredictionRepository::new(db.pool.clone())),
            db: Some(db),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_json_backend_creates_directory() {
        let dir = std::env::temp_dir().join(format!("cryptobot-bootstrap-{}", std::process::id()));
        let config = StorageEnvConfig {
            backend: StorageBackend::Json,
            database_url: String::new(),
            data_dir: PathBuf::from(&dir),
            retention_days: 7,
        };

        let handle = PersistenceBootstrap::init(&config).await.unwrap();

        assert!(handle.db.is_none());
        assert!(dir.is_dir());
        assert!(handle.market_data_repository.symbols().await.unwrap().is_empty());
        handle.shutdown().await;
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_sqlite_handle_from_memory_database() {
        let db = Database::in_memory().await.unwrap();
        let handle = PersistenceBootstrap::sqlite(db);
        assert!(handle.market_data_repository.latest_open_time("BTCUSDT").await.unwrap().is_none());
        handle.shutdown().await;
    }
}
