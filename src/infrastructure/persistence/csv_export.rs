use crate::domain::market::ProcessedCandle;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Flat row layout of a training dataset export
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    symbol: &'a str,
    #[serde(rename = "openTime")]
    open_time: String,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
    trend: i8,
    volume_price_ratio: Decimal,
    #[serde(rename = "BB_MA")]
    bb_ma: Decimal,
    #[serde(rename = "BB_UPPER")]
    bb_upper: Decimal,
    #[serde(rename = "BB_LOWER")]
    bb_lower: Decimal,
    #[serde(rename = "RSI")]
    rsi: Decimal,
    #[serde(rename = "DOJI")]
    doji: u8,
    #[serde(rename = "HAMMER")]
    hammer: u8,
    #[serde(rename = "SHOOTING_STAR")]
    shooting_star: u8,
}

impl<'a> From<&'a ProcessedCandle> for CsvRow<'a> {
    fn from(c: &'a ProcessedCandle) -> Self {
        Self {
            symbol: &c.symbol,
            open_time: c.open_time.to_rfc3339(),
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
            trend: c.trend,
            volume_price_ratio: c.volume_price_ratio,
            bb_ma: c.indicator.bb_ma,
            bb_upper: c.indicator.bb_upper,
            bb_lower: c.indicator.bb_lower,
            rsi: c.indicator.rsi,
            doji: c.indicator.doji,
            hammer: c.indicator.hammer,
            shooting_star: c.indicator.shooting_star,
        }
    }
}

/// Writes processed records as CSV for offline model training.
pub struct CsvExporter;

impl CsvExporter {
    pub fn write_to<W: std::io::Write>(writer: W, records: &[ProcessedCandle]) -> Result<usize> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(writer);
        for record in records {
            wtr.serialize(CsvRow::from(record))
                .context("Failed to serialize record")?;
        }
        wtr.flush().context("Failed to flush CSV writer")?;
        Ok(records.len())
    }

    pub fn export(path: &Path, records: &[ProcessedCandle]) -> Result<usize> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context("Failed to create export directory")?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create export file {}", path.display()))?;
        let written = Self::write_to(file, records)?;
        info!("Exported {} records to {}", written, path.display());
        Ok(written)
    }
}
