use crate::domain::market::{IndicatorSet, ProcessedCandle};
use crate::domain::ml::prediction::Prediction;
use crate::domain::repositories::{MarketDataRepository, PredictionRepository};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::debug;

const MARKET_DATA_COLUMNS: &str = "symbol, open_time, open, high, low, close, volume, trend, \
     volume_price_ratio, bb_ma, bb_upper, bb_lower, rsi, doji, hammer, shooting_star";

pub struct SqliteMarketDataRepository {
    pool: SqlitePool,
}

impl SqliteMarketDataRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarketDataRepository for SqliteMarketDataRepository {
    async fn save_batch(&self, records: &[ProcessedCandle]) -> Result<usize> {
        let now = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let ind = &record.indicator;
            sqlx::query(
                r#"
                INSERT INTO market_data (symbol, open_time, open, high, low, close, volume,
                    trend, volume_price_ratio, bb_ma, bb_upper, bb_lower, rsi,
                    doji, hammer, shooting_star, last_updated)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(symbol, open_time) DO UPDATE SET
                    open = excluded.open,
                    high = excluded.high,
                    low = excluded.low,
                    close = excluded.close,
                    volume = excluded.volume,
                    trend = excluded.trend,
                    volume_price_ratio = excluded.volume_price_ratio,
                    bb_ma = excluded.bb_ma,
                    bb_upper = excluded.bb_upper,
                    bb_lower = excluded.bb_lower,
                    rsi = excluded.rsi,
                    doji = excluded.doji,
                    hammer = excluded.hammer,
                    shooting_star = excluded.shooting_star,
                    last_updated = excluded.last_updated
                "#,
            )
            .bind(&record.symbol)
            .bind(record.open_time.timestamp_millis())
            .bind(record.open.to_string())
            .bind(record.high.to_string())
            .bind(record.low.to_string())
            .bind(record.close.to_string())
            .bind(record.volume.to_string())
            .bind(i64::from(record.trend))
            .bind(record.volume_price_ratio.to_string())
            .bind(ind.bb_ma.to_string())
            .bind(ind.bb_upper.to_string())
            .bind(ind.bb_lower.to_string())
            .bind(ind.rsi.to_string())
            .bind(i64::from(ind.doji))
            .bind(i64::from(ind.hammer))
            .bind(i64::from(ind.shooting_star))
            .bind(now)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!(
                    "Failed to upsert market data {} @ {}",
                    record.symbol, record.open_time
                )
            })?;
        }

        tx.commit().await.context("Failed to commit market data")?;
        debug!("Upserted {} market data rows", records.len());
        Ok(records.len())
    }

    async fn latest_open_time(&self, symbol: &str) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT MAX(open_time) AS latest FROM market_data WHERE symbol = ?")
            .bind(symbol)
            .fetch_one(&self.pool)
            .await?;
        let latest: Option<i64> = row.try_get("latest")?;
        latest.map(millis_to_datetime).transpose()
    }

    async fn find_range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProcessedCandle>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM market_data WHERE symbol = ? AND open_time >= ? AND open_time <= ? \
             ORDER BY open_time ASC",
            MARKET_DATA_COLUMNS
        ))
        .bind(symbol)
        .bind(start.timestamp_millis())
        .bind(end.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_market_row).collect()
    }

    async fn find_latest(&self, symbol: &str, limit: usize) -> Result<Vec<ProcessedCandle>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM market_data WHERE symbol = ? ORDER BY open_time DESC LIMIT ?",
            MARKET_DATA_COLUMNS
        ))
        .bind(symbol)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut records = rows
            .iter()
            .map(map_market_row)
            .collect::<Result<Vec<_>>>()?;
        records.reverse();
        Ok(records)
    }

    async fn symbols(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT symbol FROM market_data ORDER BY symbol")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("symbol").map_err(Into::into))
            .collect()
    }

    async fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let result = sqlx::query("DELETE FROM market_data WHERE open_time < ?")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await
            .context("Failed to prune market data")?;

        Ok(result.rows_affected() as usize)
    }
}

fn map_market_row(row: &SqliteRow) -> Result<ProcessedCandle> {
    Ok(ProcessedCandle {
        symbol: row.try_get("symbol")?,
        open_time: millis_to_datetime(row.try_get("open_time")?)?,
        open: decimal_column(row, "open")?,
        high: decimal_column(row, "high")?,
        low: decimal_column(row, "low")?,
        close: decimal_column(row, "close")?,
        volume: decimal_column(row, "volume")?,
        trend: row.try_get::<i64, _>("trend")? as i8,
        volume_price_ratio: decimal_column(row, "volume_price_ratio")?,
        indicator: IndicatorSet {
            bb_ma: decimal_column(row, "bb_ma")?,
            bb_upper: decimal_column(row, "bb_upper")?,
            bb_lower: decimal_column(row, "bb_lower")?,
            rsi: decimal_column(row, "rsi")?,
            doji: row.try_get::<i64, _>("doji")? as u8,
            hammer: row.try_get::<i64, _>("hammer")? as u8,
            shooting_star: row.try_get::<i64, _>("shooting_star")? as u8,
        },
    })
}

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal> {
    let text: String = row.try_get(column)?;
    Decimal::from_str(&text).with_context(|| format!("Invalid decimal in {}: {}", column, text))
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).with_context(|| format!("Invalid timestamp: {}", ms))
}

pub struct SqlitePredictionRepository {
    pool: SqlitePool,
}

impl SqlitePredictionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PredictionRepository for SqlitePredictionRepository {
    async fn find_by_symbol(&self, symbol: &str) -> Result<Vec<Prediction>> {
        let rows = sqlx::query(
            "SELECT symbol, timestamp, prediction FROM predictions WHERE symbol = ? ORDER BY timestamp ASC",
        )
        .bind(symbol)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<Prediction> {
                Ok(Prediction {
                    symbol: row.try_get("symbol")?,
                    timestamp: millis_to_datetime(row.try_get("timestamp")?)?,
                    prediction: decimal_column(row, "prediction")?,
                })
            })
            .collect()
    }

    async fn save_new(&self, predictions: &[Prediction]) -> Result<usize> {
        let mut inserted = 0;
        for p in predictions {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO predictions (symbol, timestamp, prediction)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(&p.symbol)
            .bind(p.timestamp.timestamp_millis())
            .bind(p.prediction.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to save prediction")?;
            inserted += result.rows_affected() as usize;
        }
        Ok(inserted)
    }
}
