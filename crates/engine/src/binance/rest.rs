use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use common::{BookLevel, DataSource, Error, Observation, OrderBookDepth, Result};

const SPOT_BASE_URL: &str = "https://api.binance.com";
const FUTURES_BASE_URL: &str = "https://fapi.binance.com";

/// Bound on any single upstream request. A slow exchange must never
/// wedge an evaluation cycle.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// REST polling client for Binance. Only public market-data endpoints
/// are used — no signing, no credentials.
pub struct BinanceSource {
    http: Client,
}

impl BinanceSource {
    pub fn new() -> Self {
        Self {
            http: Client::builder()
                .use_rustls_tls()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url, "polling Binance");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Source(format!("HTTP {status}: {body}")));
        }
        serde_json::from_str(&body)
            .map_err(|e| Error::Source(format!("unexpected response shape: {e}")))
    }
}

impl Default for BinanceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for BinanceSource {
    async fn fetch_observation(&self, symbol: &str) -> Result<Observation> {
        let url = format!("{SPOT_BASE_URL}/api/v3/ticker/price?symbol={symbol}");
        let ticker: TickerPrice = self.get_json(&url).await?;
        let price = parse_decimal(&ticker.price)?;
        Ok(Observation::new(symbol, price, Utc::now().timestamp_millis()))
    }

    async fn fetch_order_book(&self, symbol: &str) -> Result<OrderBookDepth> {
        let url = format!("{SPOT_BASE_URL}/api/v3/depth?symbol={symbol}&limit=100");
        let depth: DepthResponse = self.get_json(&url).await?;
        Ok(OrderBookDepth {
            bids: parse_levels(&depth.bids)?,
            asks: parse_levels(&depth.asks)?,
        })
    }

    async fn fetch_open_interest(&self, symbol: &str) -> Result<f64> {
        let url = format!("{FUTURES_BASE_URL}/fapi/v1/openInterest?symbol={symbol}");
        let oi: OpenInterestResponse = self.get_json(&url).await?;
        parse_decimal(&oi.open_interest)
    }
}

// ─── Binance JSON shapes ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TickerPrice {
    price: String,
}

#[derive(Deserialize)]
struct OpenInterestResponse {
    #[serde(rename = "openInterest")]
    open_interest: String,
}

/// Depth levels arrive as `["price", "quantity"]` string pairs.
#[derive(Deserialize)]
struct DepthResponse {
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

fn parse_decimal(raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|_| Error::Source(format!("non-numeric decimal field: '{raw}'")))
}

fn parse_levels(raw: &[[String; 2]]) -> Result<Vec<BookLevel>> {
    raw.iter()
        .map(|[price, quantity]| {
            Ok(BookLevel {
                price: parse_level_field(price)?,
                quantity: parse_level_field(quantity)?,
            })
        })
        .collect()
}

fn parse_level_field(raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|_| Error::InvalidArgument(format!("malformed order book level: '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_levels_parse_into_book_levels() {
        let raw = vec![
            ["100.5".to_string(), "2.0".to_string()],
            ["100.0".to_string(), "1.5".to_string()],
        ];
        let levels = parse_levels(&raw).unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].price, 100.5);
        assert_eq!(levels[1].quantity, 1.5);
    }

    #[test]
    fn malformed_level_is_invalid_argument() {
        let raw = vec![["abc".to_string(), "2.0".to_string()]];
        assert!(matches!(
            parse_levels(&raw).unwrap_err(),
            Error::InvalidArgument(_)
        ));
    }

    #[test]
    fn non_numeric_price_is_a_source_error() {
        assert!(matches!(
            parse_decimal("not-a-price").unwrap_err(),
            Error::Source(_)
        ));
        assert_eq!(parse_decimal("42.5").unwrap(), 42.5);
    }
}
