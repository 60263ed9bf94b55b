use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use common::{Error, PriceSource, Result};

/// Public-market REST client for Binance. Only the unauthenticated ticker
/// endpoint is used, so no API key is needed.
pub struct BinanceClient {
    base_url: String,
    http: Client,
}

impl BinanceClient {
    /// `timeout` of `None` leaves the transport default in place.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().use_rustls_tls();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn fetch_price(&self, symbol: &str) -> Result<f64> {
        let url = format!("{}/api/v3/ticker/price?symbol={symbol}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }
        parse_ticker(&body)
    }
}

#[async_trait]
impl PriceSource for BinanceClient {
    async fn get_price(&self, symbol: &str) -> Option<f64> {
        match self.fetch_price(symbol).await {
            Ok(price) => {
                debug!(symbol, price, "Fetched Binance price");
                Some(price)
            }
            Err(e) => {
                warn!(symbol, error = %e, "Binance price not available");
                None
            }
        }
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PriceTicker {
    price: String,
}

fn parse_ticker(body: &str) -> Result<f64> {
    let ticker: PriceTicker = serde_json::from_str(body)?;
    let price = ticker
        .price
        .parse::<f64>()
        .map_err(|e| Error::Exchange(format!("unparseable price '{}': {e}", ticker.price)))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(Error::Exchange(format!("non-positive price {price}")));
    }
    Ok(price)
}
