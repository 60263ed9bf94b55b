use async_trait::async_trait;

/// Abstraction over the upstream quote provider.
///
/// `BinanceClient` implements this against the public ticker endpoint.
/// Implementations never surface an error to the caller: network failures,
/// non-2xx responses and malformed payloads all collapse to `None`, with the
/// cause logged at the source.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Get the latest price for a symbol, or `None` if it is unavailable.
    async fn get_price(&self, symbol: &str) -> Option<f64>;
}
