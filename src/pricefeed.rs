//! Native-token USD price feed backed by the CoinGecko public API.
//!
//! Prices are cached for a short TTL; when a refresh fails, entries still
//! inside the staleness window keep being served so a flaky feed does not
//! take down whole detection runs.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::{DetectError, Result};

const COINGECKO_API: &str = "https://api.coingecko.com/api/v3";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// USD prices for token symbols.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Price for a single symbol, or `PriceUnavailable`.
    async fn usd_price(&self, symbol: &str) -> Result<f64>;

    /// Batch lookup. The returned map may be partial; callers decide per
    /// symbol whether a missing price is fatal.
    async fn usd_prices(&self, symbols: &[String]) -> Result<HashMap<String, f64>>;
}

/// CoinGecko symbol → API id. Symbols outside this table are unpriceable.
fn coin_id(symbol: &str) -> Option<&'static str> {
    match symbol.to_ascii_uppercase().as_str() {
        "ETH" | "WETH" => Some("ethereum"),
        "MATIC" | "WMATIC" => Some("matic-network"),
        "BNB" | "WBNB" => Some("binancecoin"),
        "AVAX" | "WAVAX" => Some("avalanche-2"),
        "OP" => Some("optimism"),
        "ARB" => Some("arbitrum"),
        "FTM" => Some("fantom"),
        "USDC" => Some("usd-coin"),
        "USDT" => Some("tether"),
        "DAI" => Some("dai"),
        "BUSD" => Some("binance-usd"),
        "WBTC" => Some("wrapped-bitcoin"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    price: f64,
    fetched_at: Instant,
}

pub struct CoinGeckoFeed {
    http: reqwest::Client,
    cache: RwLock<HashMap<String, CachedPrice>>,
    ttl: Duration,
    max_stale: Duration,
}

impl CoinGeckoFeed {
    pub fn new(ttl: Duration, max_stale: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| DetectError::Internal(anyhow::anyhow!("http client: {e}")))?;
        Ok(Self {
            http,
            cache: RwLock::new(HashMap::new()),
            ttl,
            max_stale,
        })
    }

    async fn fetch_batch(&self, ids: &[&'static str]) -> Result<HashMap<String, f64>> {
        let url = format!(
            "{COINGECKO_API}/simple/price?ids={}&vs_currencies=usd",
            ids.join(",")
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DetectError::PriceUnavailable {
                symbol: format!("feed request failed: {e}"),
            })?
            .error_for_status()
            .map_err(|e| DetectError::PriceUnavailable {
                symbol: format!("feed status: {e}"),
            })?;
        let body: HashMap<String, HashMap<String, f64>> =
            resp.json().await.map_err(|e| DetectError::PriceUnavailable {
                symbol: format!("malformed feed body: {e}"),
            })?;
        Ok(body
            .into_iter()
            .filter_map(|(id, quote)| quote.get("usd").map(|p| (id, *p)))
            .collect())
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
    async fn usd_price(&self, symbol: &str) -> Result<f64> {
        let upper = symbol.to_ascii_uppercase();
        let prices = self.usd_prices(std::slice::from_ref(&upper)).await?;
        prices
            .get(&upper)
            .copied()
            .ok_or(DetectError::PriceUnavailable { symbol: upper })
    }

    async fn usd_prices(&self, symbols: &[String]) -> Result<HashMap<String, f64>> {
        let mut out = HashMap::new();
        let mut to_fetch: Vec<(String, &'static str)> = Vec::new();

        {
            let cache = self.cache.read().await;
            for symbol in symbols {
                let upper = symbol.to_ascii_uppercase();
                if let Some(entry) = cache.get(&upper) {
                    if entry.fetched_at.elapsed() <= self.ttl {
                        out.insert(upper, entry.price);
                        continue;
                    }
                }
                match coin_id(&upper) {
                    Some(id) => to_fetch.push((upper, id)),
                    None => debug!(symbol = %upper, "[PRICE] no feed id for symbol"),
                }
            }
        }

        if to_fetch.is_empty() {
            return Ok(out);
        }

        let ids: Vec<&'static str> = to_fetch.iter().map(|(_, id)| *id).collect();
        match self.fetch_batch(&ids).await {
            Ok(by_id) => {
                let now = Instant::now();
                let mut cache = self.cache.write().await;
                for (symbol, id) in &to_fetch {
                    if let Some(price) = by_id.get(*id) {
                        cache.insert(
                            symbol.clone(),
                            CachedPrice {
                                price: *price,
                                fetched_at: now,
                            },
                        );
                        out.insert(symbol.clone(), *price);
                    }
                }
            }
            Err(e) => {
                // Fall back to stale-but-tolerable cache entries.
                warn!(error = %e, "[PRICE] refresh failed, serving stale cache");
                let cache = self.cache.read().await;
                for (symbol, _) in &to_fetch {
                    if let Some(entry) = cache.get(symbol) {
                        if entry.fetched_at.elapsed() <= self.max_stale {
                            out.insert(symbol.clone(), entry.price);
                        }
                    }
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_and_native_symbols_share_an_id() {
        assert_eq!(coin_id("ETH"), coin_id("WETH"));
        assert_eq!(coin_id("matic"), Some("matic-network"));
        assert_eq!(coin_id("SHITCOIN9000"), None);
    }

    #[test]
    fn parses_simple_price_body() {
        let raw = r#"{"ethereum":{"usd":1845.12},"matic-network":{"usd":0.89}}"#;
        let body: HashMap<String, HashMap<String, f64>> = serde_json::from_str(raw).unwrap();
        let prices: HashMap<String, f64> = body
            .into_iter()
            .filter_map(|(id, q)| q.get("usd").map(|p| (id, *p)))
            .collect();
        assert_eq!(prices["ethereum"], 1845.12);
        assert_eq!(prices["matic-network"], 0.89);
    }

    #[tokio::test]
    async fn cached_prices_are_served_without_a_feed_id() {
        // Seed the cache directly; the unknown symbol must come back from
        // cache without attempting a fetch.
        let feed = CoinGeckoFeed::new(Duration::from_secs(60), Duration::from_secs(300)).unwrap();
        feed.cache.write().await.insert(
            "XYZ".to_string(),
            CachedPrice {
                price: 4.2,
                fetched_at: Instant::now(),
            },
        );
        let prices = feed.usd_prices(&["xyz".to_string()]).await.unwrap();
        assert_eq!(prices["XYZ"], 4.2);
    }
}
