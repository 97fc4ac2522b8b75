//! Shared data structures used throughout the detection pipeline.

use chrono::{DateTime, Utc};
use ethers::types::U256;
use serde::{Deserialize, Serialize};

/// Detection request, the core's only input.
///
/// Tokens may be given as well-known symbols ("WETH") or raw addresses;
/// `amount_in` is human scale and is rescaled per token decimals on each
/// chain before dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectRequest {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: f64,
    pub chain_ids: Vec<u64>,
}

/// How a quote reached us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteOrigin {
    /// Routed through an aggregator splitting across underlying pools.
    Aggregated,
    /// Read directly from a single DEX pool.
    DexDirect,
}

/// Raw swap quote for one chain, amounts in smallest token units.
#[derive(Debug, Clone)]
pub struct Quote {
    pub chain_id: u64,
    /// Liquidity sources with a non-zero fill proportion.
    pub dex_sources: Vec<String>,
    pub origin: QuoteOrigin,
    /// Resolved input token address.
    pub token_in: String,
    /// Resolved output token address.
    pub token_out: String,
    pub amount_in: U256,
    pub amount_out: U256,
    /// Upstream's own price figure, informational only.
    pub raw_price: f64,
    /// Upstream gas estimate for the swap, when provided.
    pub estimated_gas: Option<u64>,
    pub fetched_at: DateTime<Utc>,
}

/// Gas price snapshot plus the per-swap cost, held in wei end to end.
///
/// USD conversion happens in the normalizer where the native-token price is
/// known; until then no floating point touches these figures.
#[derive(Debug, Clone)]
pub struct GasEstimate {
    pub chain_id: u64,
    /// Effective gas price in wei (base + priority on EIP-1559 chains).
    pub gas_price_wei: U256,
    pub gas_units: u64,
    /// `gas_price_wei * gas_units`, still wei.
    pub gas_cost_wei: U256,
    pub fetched_at: DateTime<Utc>,
}
