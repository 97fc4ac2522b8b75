//! Request-scoped orchestration of the detection pipeline.
//!
//! One detection run fans out a quote fetch and a gas fetch per requested
//! chain, collects whatever succeeds, normalizes and ranks it, and reports
//! the chains that contributed nothing along with why. Partial failure is
//! the expected case; only a run with zero usable routes fails.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use ethers::types::U256;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::arbitrage::types::{ArbitrageReport, SkippedChain};
use crate::arbitrage::{normalize_route, rank_routes};
use crate::config::{ChainConfig, DetectorConfig, ResolvedToken, resolve_token};
use crate::errors::{DetectError, Result};
use crate::gas::{GasOracle, RpcGasOracle, estimate_swap_cost};
use crate::models::{DetectRequest, GasEstimate, Quote};
use crate::pricefeed::{CoinGeckoFeed, PriceFeed};
use crate::quote::{QuoteSource, ZeroExClient};
use crate::utils::scale_amount;

/// Lifecycle of one detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Dispatched,
    Collecting,
    Aggregating,
    Ranked,
    Completed,
    Failed,
}

fn transition(state: &mut RunState, next: RunState) {
    debug!(from = ?state, to = ?next, "[DETECT] state");
    *state = next;
}

/// Everything needed to fetch one chain's leg, resolved before dispatch.
struct ChainPlan {
    chain: ChainConfig,
    token_in: ResolvedToken,
    token_out: ResolvedToken,
    amount_in: U256,
}

/// The arbitrage detection engine.
///
/// Collaborators are long-lived, shared and read-only; nothing here is
/// mutated during a run, so one `Detector` serves concurrent requests.
pub struct Detector {
    config: Arc<DetectorConfig>,
    quotes: Arc<dyn QuoteSource>,
    gas: Arc<dyn GasOracle>,
    prices: Arc<dyn PriceFeed>,
}

impl Detector {
    pub fn new(
        config: Arc<DetectorConfig>,
        quotes: Arc<dyn QuoteSource>,
        gas: Arc<dyn GasOracle>,
        prices: Arc<dyn PriceFeed>,
    ) -> Self {
        Self {
            config,
            quotes,
            gas,
            prices,
        }
    }

    /// Wire up the default collaborators: 0x quotes, JSON-RPC gas, CoinGecko
    /// prices.
    pub fn from_config(config: DetectorConfig) -> Result<Self> {
        let quotes = ZeroExClient::new(config.quote_timeout, config.quote_api_key.clone())?;
        let gas = RpcGasOracle::new(&config);
        let prices = CoinGeckoFeed::new(config.price_ttl, config.price_max_stale)?;
        let with_rpc = config.chains.iter().filter(|c| c.rpc_url.is_some()).count();
        info!(
            chains = config.chains.len(),
            with_rpc, "[INIT] detector ready"
        );
        Ok(Self::new(
            Arc::new(config),
            Arc::new(quotes),
            Arc::new(gas),
            Arc::new(prices),
        ))
    }

    /// Run one detection request end to end.
    pub async fn detect(&self, request: &DetectRequest) -> Result<ArbitrageReport> {
        let mut state = RunState::Dispatched;
        validate(request)?;

        let mut skipped: Vec<SkippedChain> = Vec::new();
        let plans = self.plan_chains(request, &mut skipped);
        if plans.is_empty() {
            transition(&mut state, RunState::Failed);
            return Err(DetectError::InvalidRequest(format!(
                "no requested chain can serve {} -> {}",
                request.token_in, request.token_out
            )));
        }

        info!(
            token_in = %request.token_in,
            token_out = %request.token_out,
            amount_in = request.amount_in,
            chains = plans.len(),
            "[DETECT] dispatching"
        );
        transition(&mut state, RunState::Collecting);
        let (fetched, mut fetch_skips) = self.collect_chains(plans).await;
        skipped.append(&mut fetch_skips);

        transition(&mut state, RunState::Aggregating);
        if fetched.is_empty() {
            transition(&mut state, RunState::Failed);
            return Err(DetectError::NoRoutesAvailable);
        }

        let symbols = price_symbols(&fetched);
        let prices = match self.prices.usd_prices(&symbols).await {
            Ok(prices) => prices,
            Err(e) => {
                warn!(error = %e, "[DETECT] price feed failed");
                transition(&mut state, RunState::Failed);
                return Err(DetectError::NoRoutesAvailable);
            }
        };

        let mut routes = Vec::new();
        for (plan, quote, gas) in &fetched {
            match normalize_route(
                &self.config,
                &plan.chain,
                quote,
                gas,
                &prices,
                &plan.token_in,
                &plan.token_out,
            ) {
                Ok(route) => routes.push(route),
                Err(e) => {
                    warn!(chain_id = plan.chain.chain_id, error = %e, "[DETECT] route dropped");
                    skipped.push(skip_entry(plan.chain.chain_id, &e));
                }
            }
        }
        if routes.is_empty() {
            transition(&mut state, RunState::Failed);
            return Err(DetectError::NoRoutesAvailable);
        }

        transition(&mut state, RunState::Ranked);
        let ranked = match rank_routes(routes, &self.config, Utc::now()) {
            Ok(ranked) => ranked,
            Err(e) => {
                transition(&mut state, RunState::Failed);
                return Err(e);
            }
        };

        transition(&mut state, RunState::Completed);
        let best = ranked.best;
        let is_profitable = best.profit_usd > 0.0;
        info!(
            chain = %best.chain_name,
            profit_usd = best.profit_usd,
            net_spread_bps = best.net_spread_bps,
            is_profitable,
            skipped = skipped.len(),
            "[DETECT] run completed"
        );
        Ok(ArbitrageReport {
            gross_spread_bps: ranked.gross_spread_bps,
            net_spread_bps: best.net_spread_bps,
            est_fill_cost_usd: best.est_fill_cost_usd,
            profit_usd: best.profit_usd,
            is_profitable,
            best_route: best,
            alt_routes: ranked.alts,
            skipped_chains: skipped,
            timestamp: Utc::now(),
        })
    }

    /// Resolve tokens and scale the amount per chain; chains that cannot be
    /// planned become skip entries without any network traffic.
    fn plan_chains(&self, request: &DetectRequest, skipped: &mut Vec<SkippedChain>) -> Vec<ChainPlan> {
        let mut seen = HashSet::new();
        let mut plans = Vec::new();
        for &chain_id in &request.chain_ids {
            if !seen.insert(chain_id) {
                continue;
            }
            let Some(chain) = self.config.chain(chain_id) else {
                skipped.push(skip_entry(
                    chain_id,
                    &DetectError::InvalidRequest(format!("unknown chain id {chain_id}")),
                ));
                continue;
            };
            let resolved = resolve_token(chain_id, &request.token_in)
                .zip(resolve_token(chain_id, &request.token_out));
            let Some((token_in, token_out)) = resolved else {
                skipped.push(skip_entry(
                    chain_id,
                    &DetectError::Normalization(format!(
                        "pair {} -> {} not listed on {}",
                        request.token_in, request.token_out, chain.name
                    )),
                ));
                continue;
            };
            let decimals_in = token_in.decimals.or(self.config.default_token_decimals);
            let amount_in = decimals_in.and_then(|d| scale_amount(request.amount_in, d));
            let Some(amount_in) = amount_in.filter(|a| !a.is_zero()) else {
                skipped.push(skip_entry(
                    chain_id,
                    &DetectError::Normalization(format!(
                        "amount {} cannot be scaled for {} on {}",
                        request.amount_in, request.token_in, chain.name
                    )),
                ));
                continue;
            };
            plans.push(ChainPlan {
                chain: chain.clone(),
                token_in,
                token_out,
                amount_in,
            });
        }
        plans
    }

    /// Fan out quote and gas fetches, one task per chain, and collect every
    /// outcome. Timeouts are enforced here per leg, independent of whatever
    /// the adapters do. Dropping the returned future aborts the whole
    /// `JoinSet`, so no per-chain task outlives a cancelled request.
    async fn collect_chains(
        &self,
        plans: Vec<ChainPlan>,
    ) -> (Vec<(ChainPlan, Quote, GasEstimate)>, Vec<SkippedChain>) {
        let mut expected: HashSet<u64> = plans.iter().map(|p| p.chain.chain_id).collect();
        let mut set = JoinSet::new();
        for plan in plans {
            let quotes = Arc::clone(&self.quotes);
            let gas = Arc::clone(&self.gas);
            let quote_timeout = self.config.quote_timeout;
            let gas_timeout = self.config.gas_timeout;
            set.spawn(async move {
                let chain_id = plan.chain.chain_id;
                let quote_fut = tokio::time::timeout(
                    quote_timeout,
                    quotes.get_quote(
                        &plan.chain,
                        &plan.token_in.address,
                        &plan.token_out.address,
                        plan.amount_in,
                    ),
                );
                let gas_fut = tokio::time::timeout(gas_timeout, gas.gas_price(&plan.chain));
                let (quote, sample) = tokio::join!(quote_fut, gas_fut);
                let quote = quote
                    .map_err(|_| DetectError::QuoteSource {
                        chain_id,
                        reason: "timed out".into(),
                    })
                    .and_then(|r| r);
                let sample = sample
                    .map_err(|_| DetectError::GasSource {
                        chain_id,
                        reason: "timed out".into(),
                    })
                    .and_then(|r| r);
                let outcome = match (quote, sample) {
                    (Ok(quote), Ok(sample)) => {
                        let estimate = estimate_swap_cost(&plan.chain, &sample);
                        Ok((quote, estimate))
                    }
                    (Err(e), _) => Err(e),
                    (_, Err(e)) => Err(e),
                };
                (plan, outcome)
            });
        }

        let mut fetched = Vec::new();
        let mut skipped = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((plan, Ok((quote, estimate)))) => {
                    expected.remove(&plan.chain.chain_id);
                    fetched.push((plan, quote, estimate));
                }
                Ok((plan, Err(e))) => {
                    let chain_id = plan.chain.chain_id;
                    expected.remove(&chain_id);
                    warn!(chain_id, error = %e, "[DETECT] chain skipped");
                    skipped.push(skip_entry(chain_id, &e));
                }
                Err(e) => {
                    warn!(error = %e, "[DETECT] chain task aborted");
                }
            }
        }
        // A panicked task never reported its chain; annotate it anyway.
        for chain_id in expected {
            skipped.push(skip_entry(
                chain_id,
                &DetectError::Internal(anyhow::anyhow!("chain task aborted")),
            ));
        }
        (fetched, skipped)
    }
}

fn validate(request: &DetectRequest) -> Result<()> {
    if !request.amount_in.is_finite() || request.amount_in <= 0.0 {
        return Err(DetectError::InvalidRequest(
            "amount_in must be a positive finite number".into(),
        ));
    }
    if request.chain_ids.is_empty() {
        return Err(DetectError::InvalidRequest(
            "at least one chain id is required".into(),
        ));
    }
    if request.token_in.eq_ignore_ascii_case(&request.token_out) {
        return Err(DetectError::InvalidRequest(
            "token_in and token_out must differ".into(),
        ));
    }
    Ok(())
}

fn skip_entry(chain_id: u64, error: &DetectError) -> SkippedChain {
    SkippedChain {
        chain_id,
        kind: error.kind(),
        reason: error.to_string(),
    }
}

/// Symbols the normalizer will need: every native token plus whatever side
/// of the pair the registry recognizes.
fn price_symbols(fetched: &[(ChainPlan, Quote, GasEstimate)]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut symbols = Vec::new();
    for (plan, _, _) in fetched {
        for symbol in std::iter::once(Some(plan.chain.native_symbol.to_string()))
            .chain([plan.token_in.symbol.clone(), plan.token_out.symbol.clone()])
            .flatten()
        {
            let upper = symbol.to_ascii_uppercase();
            if seen.insert(upper.clone()) {
                symbols.push(upper);
            }
        }
    }
    symbols
}
