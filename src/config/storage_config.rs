//! Storage configuration parsing from environment variables.

use super::{Lookup, MAX_HISTORY_DAYS, ensure_range, parse_or, string_or};
use anyhow::{Result, bail};
use std::path::PathBuf;
use std::str::FromStr;

/// Where processed records are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Json,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "json" => Ok(StorageBackend::Json),
            _ => bail!("Invalid STORAGE_BACKEND: {}. Must be 'sqlite' or 'json'", s),
        }
    }
}

/// Storage environment configuration
#[derive(Debug, Clone)]
pub struct StorageEnvConfig {
    pub backend: StorageBackend,
    pub database_url: String,
    /// Directory of the JSON file backend
    pub data_dir: PathBuf,
    /// Default age limit for `prune`
    pub retention_days: i64,
}

impl StorageEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let retention_days = parse_or(lookup, "RETENTION_DAYS", 7)?;
        ensure_range("RETENTION_DAYS", retention_days, 1, MAX_HISTORY_DAYS)?;
        Ok(Self {
            backend: parse_or(lookup, "STORAGE_BACKEND", StorageBackend::Sqlite)?,
            database_url: string_or(lookup, "DATABASE_URL", "sqlite://data/cryptobot.db"),
            data_dir: PathBuf::from(string_or(lookup, "DATA_DIR", "data/processed")),
            retention_days,
        })
    }
}
