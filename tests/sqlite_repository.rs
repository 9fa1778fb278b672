use chrono::{Duration, TimeZone, Utc};
use cryptobot::application::processing::{DataProcessor, IndicatorParams};
use cryptobot::domain::ml::prediction::Prediction;
use cryptobot::domain::repositories::{MarketDataRepository, PredictionRepository};
use cryptobot::infrastructure::mock::synthetic_klines;
use cryptobot::infrastructure::persistence::{
    Database, SqliteMarketDataRepository, SqlitePredictionRepository,
};
use rust_decimal_macros::dec;

const HOUR_MS: i64 = 3_600_000;

type Repositories = (Database, SqliteMarketDataRepository, SqlitePredictionRepository);

async fn repositories() -> anyhow::Result<Repositories> {
    let db = Database::in_memory().await?;
    let market = SqliteMarketDataRepository::new(db.pool.clone());
    let predictions = SqlitePredictionRepository::new(db.pool.clone());
    Ok((db, market, predictions))
}

#[tokio::test]
async fn test_upsert_and_ordered_reads() -> anyhow::Result<()> {
    let (db, repo, _) = repositories().await?;
    let series = DataProcessor::new(IndicatorParams::default())
        .process("BTCUSDT", synthetic_klines(0, HOUR_MS, 40));
    assert_eq!(series.records.len(), 21);

    repo.save_batch(&series.records).await?;
    let mut changed = series.records[20].clone();
    changed.close = dec!(999.99);
    repo.save_batch(&[changed.clone()]).await?;

    let all = repo
        .find_range("BTCUSDT", Utc.timestamp_millis_opt(0).unwrap(), Utc::now())
        .await?;
    assert_eq!(all.len(), 21);
    assert_eq!(all[..20], series.records[..20]);
    assert_eq!(all[20], changed);

    let latest = repo.find_latest("BTCUSDT", 3).await?;
    assert_eq!(latest.len(), 3);
    assert!(latest[0].open_time < latest[2].open_time);
    assert_eq!(latest[2].open_time, changed.open_time);
    assert_eq!(repo.latest_open_time("BTCUSDT").await?, Some(changed.open_time));
    assert_eq!(repo.latest_open_time("ETHUSDT").await?, None);

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn test_prune_and_symbols() -> anyhow::Result<()> {
    let (db, repo, _) = repositories().await?;
    let processor = DataProcessor::new(IndicatorParams::default());
    let btc = processor.process("BTCUSDT", synthetic_klines(0, HOUR_MS, 30));
    let eth = processor.process("ETHUSDT", synthetic_klines(0, HOUR_MS, 25));
    repo.save_batch(&btc.records).await?;
    repo.save_batch(&eth.records).await?;

    assert_eq!(
        repo.symbols().await?,
        vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]
    );

    // Bars 19..=29 are stored; drop everything before bar 25
    let cutoff = Utc.timestamp_millis_opt(25 * HOUR_MS).unwrap();
    let removed = repo.prune(cutoff).await?;
    assert_eq!(removed, 6 + 6);

    let remaining = repo
        .find_range("BTCUSDT", cutoff - Duration::days(1), Utc::now())
        .await?;
    assert_eq!(remaining.len(), 5);
    assert_eq!(remaining[0].open_time, cutoff);

    db.close().await;
    Ok(())
}

#[test]
fn test_predictions_insert_only_new_keys() {
    tokio_test::block_on(async {
        let (db, _, repo) = repositories().await.unwrap();
        let at = |h: i64| Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::hours(h);
        let first = vec![
            Prediction {
                symbol: "BTCUSDT".to_string(),
                timestamp: at(4),
                prediction: dec!(64210.55),
            },
            Prediction {
                symbol: "BTCUSDT".to_string(),
                timestamp: at(8),
                prediction: dec!(64300.10),
            },
        ];
        assert_eq!(repo.save_new(&first).await.unwrap(), 2);

        let overlapping = vec![
            Prediction {
                symbol: "BTCUSDT".to_string(),
                timestamp: at(8),
                prediction: dec!(1),
            },
            Prediction {
                symbol: "BTCUSDT".to_string(),
                timestamp: at(12),
                prediction: dec!(64400.00),
            },
        ];
        assert_eq!(repo.save_new(&overlapping).await.unwrap(), 1);

        let stored = repo.find_by_symbol("BTCUSDT").await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[1].prediction, dec!(64300.10));
        assert!(repo.find_by_symbol("ETHUSDT").await.unwrap().is_empty());

        db.close().await;
    });
}
