//! cryptobot - crypto market data pipeline
//!
//! # Usage
//! ```sh
//! cargo run -- run                      # one pipeline pass
//! cargo run -- schedule                 # every SCHEDULE_INTERVAL_HOURS until Ctrl+C
//! cargo run -- predict --symbol BTCUSDT
//! cargo run -- analyze --symbol BTCUSDT --timeframe 7D --indicators BB,RSI,MACD
//! cargo run -- export --symbol BTCUSDT --output btc.csv
//! cargo run -- market --symbol BTCUSDT
//! cargo run -- prune --days 7
//! ```

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use cryptobot::application::analysis::Overlay;
use cryptobot::application::system::Application;
use cryptobot::config::{Config, MAX_PERIOD_HOURS, ensure_range};
use cryptobot::domain::market::Timeframe;
use cryptobot::infrastructure::persistence::CsvExporter;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, process and store every configured symbol once
    Run,

    /// Repeat the pipeline on a fixed period until Ctrl+C
    Schedule {
        /// Period in hours (defaults to SCHEDULE_INTERVAL_HOURS)
        #[arg(long)]
        every_hours: Option<u64>,
    },

    /// Forecast prices from the newest stored records
    Predict {
        #[arg(short, long)]
        symbol: String,

        /// Hours between forecast timestamps (defaults to PREDICTION_INTERVAL_HOURS)
        #[arg(long)]
        interval_hours: Option<i64>,
    },

    /// Dashboard data: windowed series, overlays and 24h statistics as JSON
    Analyze {
        #[arg(short, long)]
        symbol: String,

        /// 1D, 7D, 1M, 3M, 6M, 1Y or ALL
        #[arg(short, long, default_value = "1Y")]
        timeframe: String,

        /// Comma separated: BB, RSI, EMA, MACD, STOCH
        #[arg(short, long, default_value = "BB")]
        indicators: String,
    },

    /// Write stored records of a symbol to CSV
    Export {
        #[arg(short, long)]
        symbol: String,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Live 24h ticker and recent aggregate trades
    Market {
        #[arg(short, long)]
        symbol: String,

        /// Number of aggregate trades
        #[arg(long, default_value = "20")]
        trades: u32,
    },

    /// Delete stored records older than N days
    Prune {
        /// Defaults to RETENTION_DAYS
        #[arg(short, long)]
        days: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();

    info!("cryptobot {} starting...", env!("CARGO_PKG_VERSION"));
    let mut config = Config::from_env()?;
    if let Commands::Schedule {
        every_hours: Some(hours),
    } = &cli.command
    {
        let bounded = i64::try_from(*hours).unwrap_or(i64::MAX);
        ensure_range("--every-hours", bounded, 1, MAX_PERIOD_HOURS)?;
        config.schedule_interval_hours = *hours;
    }
    info!(
        "Configuration loaded: Symbols={:?}, Interval={}, Storage={:?}",
        config.exchange.symbols, config.exchange.interval, config.storage.backend
    );

    let app = Application::build(config).await?;
    let result = execute(&app, cli.command).await;
    app.shutdown().await;
    result
}

async fn execute(app: &Application, command: Commands) -> Result<()> {
    match command {
        Commands::Run => {
            let report = app.run_once().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_success() {
                bail!(
                    "{} of {} symbols failed",
                    report.failed.len(),
                    app.config.exchange.symbols.len()
                );
            }
        }
        Commands::Schedule { .. } => {
            let runs = app.run_scheduled().await?;
            info!("Scheduler completed {} runs", runs);
        }
        Commands::Predict {
            symbol,
            interval_hours,
        } => {
            let symbol = symbol.to_uppercase();
            let hours = interval_hours.unwrap_or(app.config.model.prediction_interval_hours);
            let outcome = app
                .services
                .prediction
                .predict(&symbol, hours)
                .await
                .context(format!("Prediction failed for {}", symbol))?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Analyze {
            symbol,
            timeframe,
            indicators,
        } => {
            let symbol = symbol.to_uppercase();
            let timeframe: Timeframe = timeframe.parse()?;
            let overlays = Overlay::parse_list(&indicators)?;
            match app
                .services
                .analysis
                .analyze(&symbol, timeframe, &overlays)
                .await?
            {
                Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                None => bail!("No stored data for {}", symbol),
            }
        }
        Commands::Export { symbol, output } => {
            let symbol = symbol.to_uppercase();
            let records = app
                .persistence
                .market_data_repository
                .find_range(&symbol, DateTime::<Utc>::MIN_UTC, Utc::now())
                .await?;
            let written = CsvExporter::export(&output, &records)?;
            info!("Exported {} {} records to {}", written, symbol, output.display());
        }
        Commands::Market { symbol, trades } => {
            let symbol = symbol.to_uppercase();
            let source = &app.services.market_source;
            let ticker = source.fetch_ticker_24h(&symbol).await?;
            let agg_trades = source.fetch_agg_trades(&symbol, trades).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "ticker": ticker,
                    "aggTrades": agg_trades,
                }))?
            );
        }
        Commands::Prune { days } => {
            let removed = app.prune(days).await?;
            println!("{}", removed);
        }
    }
    Ok(())
}
