use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::QuoteOrigin;

/// A candidate execution route with fully resolved USD costs.
///
/// Only the normalizer constructs these; a route missing a gas or fee
/// component is dropped there instead of defaulting anything to zero.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedRoute {
    pub chain_id: u64,
    pub chain_name: String,
    pub dex_sources: Vec<String>,
    pub origin: QuoteOrigin,
    /// Token-out received per token-in spent, decimal adjusted.
    pub effective_price: f64,
    /// USD value of the common amount-in basis.
    pub amount_in_usd: f64,
    pub gas_cost_usd: f64,
    pub gas_price_gwei: f64,
    pub dex_fee_bps: u32,
    /// Gas plus this leg's DEX fee on the amount-in basis.
    pub est_fill_cost_usd: f64,
    /// Set by the ranking stage.
    pub net_spread_bps: f64,
    /// Set by the ranking stage.
    pub profit_usd: f64,
    /// Set by the ranking stage, 0–100.
    pub confidence_score: f64,
    pub quoted_at: DateTime<Utc>,
}

/// Why a requested chain contributed no route.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedChain {
    pub chain_id: u64,
    pub kind: &'static str,
    pub reason: String,
}

/// Terminal artifact of a detection run.
#[derive(Debug, Clone, Serialize)]
pub struct ArbitrageReport {
    pub best_route: NormalizedRoute,
    /// Remaining candidates, ordered by descending net profitability.
    pub alt_routes: Vec<NormalizedRoute>,
    pub gross_spread_bps: f64,
    pub net_spread_bps: f64,
    pub est_fill_cost_usd: f64,
    pub profit_usd: f64,
    pub is_profitable: bool,
    pub skipped_chains: Vec<SkippedChain>,
    pub timestamp: DateTime<Utc>,
}
