//! 0x swap-API adapter: one aggregator quote per chain and pair.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ethers::types::U256;
use serde::Deserialize;
use url::Url;

use crate::config::ChainConfig;
use crate::errors::{DetectError, Result};
use crate::models::{Quote, QuoteOrigin};

/// Per-chain 0x API hosts.
fn api_host(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("https://api.0x.org"),
        10 => Some("https://optimism.api.0x.org"),
        56 => Some("https://bsc.api.0x.org"),
        137 => Some("https://polygon.api.0x.org"),
        8453 => Some("https://base.api.0x.org"),
        42161 => Some("https://arbitrum.api.0x.org"),
        43114 => Some("https://avalanche.api.0x.org"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "sellAmount")]
    sell_amount: String,
    #[serde(rename = "buyAmount")]
    buy_amount: String,
    #[serde(default)]
    price: Option<String>,
    #[serde(rename = "estimatedGas", default)]
    estimated_gas: Option<String>,
    #[serde(default)]
    sources: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    proportion: String,
}

/// Sources actually participating in the fill.
fn active_sources(sources: &[SourceEntry]) -> Vec<String> {
    sources
        .iter()
        .filter(|s| s.proportion.parse::<f64>().map(|p| p > 0.0).unwrap_or(false))
        .map(|s| s.name.clone())
        .collect()
}

/// HTTP client for the 0x swap API.
///
/// The client is long-lived and safe to share across concurrent detection
/// runs; the call timeout is enforced here on top of reqwest's own.
pub struct ZeroExClient {
    http: reqwest::Client,
    timeout: Duration,
    api_key: Option<String>,
}

impl ZeroExClient {
    pub fn new(timeout: Duration, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DetectError::Internal(anyhow::anyhow!("http client: {e}")))?;
        Ok(Self {
            http,
            timeout,
            api_key,
        })
    }

    fn quote_url(
        chain_id: u64,
        token_in: &str,
        token_out: &str,
        amount_in: U256,
    ) -> Result<Url> {
        let host = api_host(chain_id).ok_or(DetectError::QuoteUnavailable { chain_id })?;
        let amount = amount_in.to_string();
        let url = Url::parse_with_params(
            &format!("{host}/swap/v1/quote"),
            &[
                ("sellToken", token_in),
                ("buyToken", token_out),
                ("sellAmount", amount.as_str()),
            ],
        )?;
        Ok(url)
    }
}

#[async_trait]
impl super::QuoteSource for ZeroExClient {
    async fn get_quote(
        &self,
        chain: &ChainConfig,
        token_in: &str,
        token_out: &str,
        amount_in: U256,
    ) -> Result<Quote> {
        let chain_id = chain.chain_id;
        let url = Self::quote_url(chain_id, token_in, token_out, amount_in)?;

        let mut req = self.http.get(url);
        if let Some(key) = &self.api_key {
            req = req.header("0x-api-key", key);
        }

        let resp = tokio::time::timeout(self.timeout, req.send())
            .await
            .map_err(|_| DetectError::QuoteSource {
                chain_id,
                reason: "request timed out".into(),
            })?
            .map_err(|e| DetectError::QuoteSource {
                chain_id,
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DetectError::QuoteSourceAuth {
                chain_id,
                reason: format!("status {status}"),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            // 0x reports missing liquidity as a validation failure.
            if status == reqwest::StatusCode::NOT_FOUND || body.contains("LIQUIDITY") {
                return Err(DetectError::QuoteUnavailable { chain_id });
            }
            return Err(DetectError::QuoteSource {
                chain_id,
                reason: format!("status {status}: {body}"),
            });
        }

        let parsed: QuoteResponse = resp.json().await.map_err(|e| DetectError::QuoteSource {
            chain_id,
            reason: format!("malformed quote body: {e}"),
        })?;

        let amount_in = U256::from_dec_str(&parsed.sell_amount).map_err(|e| {
            DetectError::QuoteSource {
                chain_id,
                reason: format!("bad sellAmount: {e}"),
            }
        })?;
        let amount_out = U256::from_dec_str(&parsed.buy_amount).map_err(|e| {
            DetectError::QuoteSource {
                chain_id,
                reason: format!("bad buyAmount: {e}"),
            }
        })?;
        if amount_out.is_zero() {
            return Err(DetectError::QuoteUnavailable { chain_id });
        }

        Ok(Quote {
            chain_id,
            dex_sources: active_sources(&parsed.sources),
            origin: QuoteOrigin::Aggregated,
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount_in,
            amount_out,
            raw_price: parsed
                .price
                .as_deref()
                .and_then(|p| p.parse().ok())
                .unwrap_or(0.0),
            estimated_gas: parsed.estimated_gas.as_deref().and_then(|g| g.parse().ok()),
            fetched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosts_cover_reference_chains_only() {
        for id in [1u64, 10, 56, 137, 8453, 42161, 43114] {
            assert!(api_host(id).is_some(), "missing host for chain {id}");
        }
        assert!(api_host(250).is_none());
    }

    #[test]
    fn quote_url_carries_pair_and_amount() {
        let url = ZeroExClient::quote_url(
            137,
            "0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619",
            "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174",
            U256::from(1_000_000_000_000_000_000u64),
        )
        .unwrap();
        assert!(url.as_str().starts_with("https://polygon.api.0x.org/swap/v1/quote?"));
        assert!(url.as_str().contains("sellAmount=1000000000000000000"));
    }

    #[test]
    fn quote_url_fails_for_unsupported_chain() {
        let err = ZeroExClient::quote_url(250, "a", "b", U256::one()).unwrap_err();
        assert!(matches!(err, DetectError::QuoteUnavailable { chain_id: 250 }));
    }

    #[test]
    fn parses_quote_body_and_filters_inactive_sources() {
        let raw = r#"{
            "sellAmount": "1000000000000000000",
            "buyAmount": "1845120000",
            "price": "1845.12",
            "estimatedGas": "136000",
            "sources": [
                {"name": "Uniswap_V3", "proportion": "0.8"},
                {"name": "SushiSwap", "proportion": "0.2"},
                {"name": "Curve", "proportion": "0"}
            ]
        }"#;
        let parsed: QuoteResponse = serde_json::from_str(raw).expect("json should parse");
        assert_eq!(
            active_sources(&parsed.sources),
            vec!["Uniswap_V3".to_string(), "SushiSwap".to_string()]
        );
        assert_eq!(parsed.estimated_gas.as_deref(), Some("136000"));
    }

    #[test]
    fn tolerates_missing_optional_fields() {
        let raw = r#"{"sellAmount": "10", "buyAmount": "20"}"#;
        let parsed: QuoteResponse = serde_json::from_str(raw).expect("json should parse");
        assert!(parsed.price.is_none());
        assert!(parsed.sources.is_empty());
    }
}
