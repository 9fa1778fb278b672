//! Binance Market Data Service
//!
//! REST-only access to public market data:
//! - Historical klines, paginated over an arbitrary time range
//! - Rolling 24h ticker statistics
//! - Recent aggregate trades

use crate::domain::errors::IngestionError;
use crate::domain::market::{AggTrade, RawKline, Ticker24h};
use crate::domain::ports::{KlineRequest, MarketDataSource};
use crate::infrastructure::core::http_client_factory::{
    HttpClientFactory, HttpClientSettings, build_url_with_query,
};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
/// Exchange cap on rows per kline page
pub const MAX_KLINE_LIMIT: u32 = 1000;

pub struct BinanceMarketDataService {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

impl BinanceMarketDataService {
    pub fn builder() -> BinanceMarketDataServiceBuilder {
        BinanceMarketDataServiceBuilder::default()
    }
}

#[derive(Default)]
pub struct BinanceMarketDataServiceBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    http: Option<HttpClientSettings>,
}

impl BinanceMarketDataServiceBuilder {
    pub fn api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn http_settings(mut self, settings: HttpClientSettings) -> Self {
        self.http = Some(settings);
        self
    }

    pub fn build(self) -> BinanceMarketDataService {
        let client = HttpClientFactory::create_client(&self.http.unwrap_or_default());
        BinanceMarketDataService {
            client,
            api_key: self.api_key.unwrap_or_default(),
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

impl BinanceMarketDataService {
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, IngestionError> {
        let url = build_url_with_query(&format!("{}{}", self.base_url, path), params);

        let mut request = self.client.get(&url);
        if !self.api_key.is_empty() {
            request = request.header("X-MBX-APIKEY", &self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IngestionError::Transport {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestionError::HttpStatus {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| IngestionError::Decode {
            endpoint: path.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Validates every row of one kline page against the positional layout.
pub fn parse_kline_page(page: &[Value]) -> Result<Vec<RawKline>, IngestionError> {
    page.iter()
        .map(|row| match row.as_array() {
            Some(fields) => RawKline::from_row(fields),
            None => Err(IngestionError::MalformedField {
                column: "kline",
                value: row.to_string(),
            }),
        })
        .collect()
}

/// Walks `[start_ms, end_ms]` page by page. `fetch_page` receives the start
/// cursor of each page; paging stops on an empty or short page, or once a
/// page reaches `end_ms`.
pub async fn paginate_klines<F, Fut>(
    symbol: &str,
    start_ms: i64,
    end_ms: i64,
    limit: u32,
    mut fetch_page: F,
) -> Result<Vec<RawKline>, IngestionError>
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = Result<Vec<Value>, IngestionError>>,
{
    let mut cursor = start_ms;
    let mut klines: Vec<RawKline> = Vec::new();

    while cursor <= end_ms {
        let page = fetch_page(cursor).await?;
        let rows = parse_kline_page(&page)?;
        let Some(last_open) = rows.last().map(|k| k.open_time) else {
            break;
        };
        let page_len = rows.len();
        debug!(
            "{}: kline page of {} rows ending at {}",
            symbol, page_len, last_open
        );
        klines.extend(rows);

        if page_len < limit as usize || last_open >= end_ms {
            break;
        }
        cursor = last_open + 1;
    }
    Ok(klines)
}

#[async_trait]
impl MarketDataSource for BinanceMarketDataService {
    async fn fetch_klines(&self, request: &KlineRequest) -> Result<Vec<RawKline>, IngestionError> {
        let end_ms = request.end.timestamp_millis();
        let limit = request.limit.clamp(1, MAX_KLINE_LIMIT);
        let interval = request.interval.to_binance_string().to_string();

        let klines = paginate_klines(
            &request.symbol,
            request.start.timestamp_millis(),
            end_ms,
            limit,
            |cursor| {
                let params = [
                    ("symbol", request.symbol.clone()),
                    ("interval", interval.clone()),
                    ("startTime", cursor.to_string()),
                    ("endTime", end_ms.to_string()),
                    ("limit", limit.to_string()),
                ];
                async move { self.get_json("/api/v3/klines", &params).await }
            },
        )
        .await?;

        info!(
            "BinanceMarketDataService: Fetched {} klines for {}",
            klines.len(),
            request.symbol
        );
        Ok(klines)
    }

    async fn fetch_ticker_24h(&self, symbol: &str) -> Result<Ticker24h, IngestionError> {
        self.get_json("/api/v3/ticker/24hr", &[("symbol", symbol.to_string())])
            .await
    }

    async fn fetch_agg_trades(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<AggTrade>, IngestionError> {
        self.get_json(
            "/api/v3/aggTrades",
            &[
                ("symbol", symbol.to_string()),
                ("limit", limit.clamp(1, MAX_KLINE_LIMIT).to_string()),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_kline_page() {
        let page = json!([
            [
                1499040000000i64, "0.0163", "0.8", "0.0157", "0.0157", "148976.1",
                1499644799999i64, "2434.19", 308, "1756.87", "28.46", "0"
            ],
            [
                1499043600000i64, "0.0157", "0.8", "0.0150", "0.0160", "100.0",
                1499047199999i64, "1.5", 12, "0.5", "0.1", "0"
            ]
        ]);
        let rows = parse_kline_page(page.as_array().unwrap()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].open_time, 1499043600000);
    }

    #[test]
    fn test_parse_kline_page_fails_fast_on_short_row() {
        let page = json!([[1499040000000i64, "1", "2", "0.5", "1.5", "10"]]);
        assert!(matches!(
            parse_kline_page(page.as_array().unwrap()),
            Err(IngestionError::SchemaMismatch {
                expected: 12,
                actual: 6
            })
        ));
    }

    #[test]
    fn test_parse_kline_page_rejects_non_array_row() {
        let page = json!([{"openTime": 1}]);
        assert!(matches!(
            parse_kline_page(page.as_array().unwrap()),
            Err(IngestionError::MalformedField { column: "kline", .. })
        ));
    }

    #[test]
    fn test_builder_defaults() {
        let service = BinanceMarketDataService::builder()
            .base_url("https://testnet.binance.vision/".to_string())
            .build();
        assert_eq!(service.base_url, "https://testnet.binance.vision");
        assert!(service.api_key.is_empty());
    }

    const HOUR_MS: i64 = 3_600_000;

    fn kline(open_time: i64) -> Value {
        json!([
            open_time, "1.00", "2.00", "0.50", "1.50", "10", open_time + HOUR_MS - 1,
            "15", 3, "5", "7", "0"
        ])
    }

    fn page(hours: std::ops::Range<i64>) -> Vec<Value> {
        hours.map(|h| kline(h * HOUR_MS)).collect()
    }

    /// Serves `pages` in order (then empty pages) and records each cursor.
    async fn paginate(
        pages: Vec<Vec<Value>>,
        end_ms: i64,
        limit: u32,
    ) -> (Vec<RawKline>, Vec<i64>) {
        let mut pages = std::collections::VecDeque::from(pages);
        let mut cursors = Vec::new();
        let klines = paginate_klines("BTCUSDT", 0, end_ms, limit, |cursor| {
            cursors.push(cursor);
            let next = pages.pop_front().unwrap_or_default();
            async move { Ok(next) }
        })
        .await
        .unwrap();
        (klines, cursors)
    }

    #[tokio::test]
    async fn test_paging_advances_past_last_open_until_short_page() {
        let pages = vec![page(0..2), page(2..4), page(4..5), page(5..7)];
        let (klines, cursors) = paginate(pages, 100 * HOUR_MS, 2).await;

        assert_eq!(cursors, vec![0, HOUR_MS + 1, 3 * HOUR_MS + 1]);
        assert_eq!(klines.len(), 5);
        assert_eq!(klines[4].open_time, 4 * HOUR_MS);
    }

    #[tokio::test]
    async fn test_paging_stops_at_window_end() {
        let pages = vec![page(0..2), page(2..4), page(4..6)];
        let (klines, cursors) = paginate(pages, 3 * HOUR_MS, 2).await;

        assert_eq!(cursors.len(), 2);
        assert_eq!(klines.len(), 4);
        assert_eq!(klines[3].open_time, 3 * HOUR_MS);
    }

    #[tokio::test]
    async fn test_paging_stops_on_empty_page() {
        let (klines, cursors) = paginate(vec![page(0..2)], 100 * HOUR_MS, 2).await;

        assert_eq!(cursors, vec![0, HOUR_MS + 1]);
        assert_eq!(klines.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_page_aborts_paging() {
        let result = paginate_klines("BTCUSDT", 0, HOUR_MS, 2, |_| async {
            Ok(vec![json!([0, "1"])])
        })
        .await;

        assert!(matches!(result, Err(IngestionError::SchemaMismatch { .. })));
    }
}
