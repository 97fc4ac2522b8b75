//! DEX aggregator quote sources.
//!
//! Responsibilities:
//! • Fetch a swap quote for a token pair on one chain.
//! • Translate the upstream schema into the common `Quote` shape.
//! • Enforce a per-call timeout; never retry internally.

use async_trait::async_trait;
use ethers::types::U256;

use crate::config::ChainConfig;
use crate::errors::Result;
use crate::models::Quote;

pub mod zerox;

pub use zerox::ZeroExClient;

/// A source of swap quotes, one call per (chain, pair, amount).
///
/// Implementations own their timeout and surface failures through the
/// `QuoteUnavailable` / `QuoteSource` / `QuoteSourceAuth` taxonomy; retry
/// policy belongs to the caller.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn get_quote(
        &self,
        chain: &ChainConfig,
        token_in: &str,
        token_out: &str,
        amount_in: U256,
    ) -> Result<Quote>;
}
