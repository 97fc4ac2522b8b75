//! Route ordering and confidence scoring.

use chrono::{DateTime, Utc};

use crate::config::DetectorConfig;
use crate::errors::{DetectError, Result};
use crate::models::QuoteOrigin;

use super::spread::{gross_spread_bps, pair_economics};
use super::types::NormalizedRoute;

/// Quotes older than this many staleness windows are excluded outright;
/// anything past one window is penalized in the score.
const STALE_EXCLUDE_FACTOR: u128 = 3;

/// Ranked candidates: head plus alternates in descending net profitability.
#[derive(Debug, Clone)]
pub struct RankOutcome {
    pub best: NormalizedRoute,
    pub alts: Vec<NormalizedRoute>,
    /// Spread between the best sell-side and buy-side prices observed.
    pub gross_spread_bps: f64,
}

/// Price per-route economics, score confidence, and order the candidates.
///
/// Ordering is `profit_usd` descending, ties broken by higher confidence,
/// then by lower gas cost. `now` is passed in so the result is a pure
/// function of its inputs.
pub fn rank_routes(
    routes: Vec<NormalizedRoute>,
    config: &DetectorConfig,
    now: DateTime<Utc>,
) -> Result<RankOutcome> {
    let staleness_ms = config.quote_staleness.as_millis();
    let mut routes: Vec<NormalizedRoute> = routes
        .into_iter()
        .filter(|r| {
            let age = quote_age_ms(r, now);
            age <= staleness_ms.saturating_mul(STALE_EXCLUDE_FACTOR)
        })
        .collect();
    if routes.is_empty() {
        return Err(DetectError::NoRoutesAvailable);
    }

    if routes.len() == 1 {
        // Spread is undefined against a single candidate.
        let mut route = routes.remove(0);
        route.net_spread_bps = 0.0;
        route.profit_usd = 0.0;
        route.confidence_score = confidence_score(&route, now, staleness_ms);
        return Ok(RankOutcome {
            best: route,
            alts: Vec::new(),
            gross_spread_bps: 0.0,
        });
    }

    let (buy_idx, _) = routes
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.effective_price.total_cmp(&b.effective_price))
        .expect("routes is non-empty");
    let second_buy_idx = routes
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != buy_idx)
        .min_by(|(_, a), (_, b)| a.effective_price.total_cmp(&b.effective_price))
        .map(|(i, _)| i)
        .expect("at least two routes");
    let best_sell_price = routes
        .iter()
        .map(|r| r.effective_price)
        .fold(f64::MIN, f64::max);
    let overall_gross = gross_spread_bps(routes[buy_idx].effective_price, best_sell_price)?;

    // Each candidate is priced as the sell leg against the cheapest other
    // route as the buy leg.
    for i in 0..routes.len() {
        let buy = if i == buy_idx { second_buy_idx } else { buy_idx };
        let buy_leg = routes[buy].clone();
        let econ = pair_economics(&buy_leg, &routes[i])?;
        routes[i].net_spread_bps = econ.net_spread_bps;
        routes[i].profit_usd = econ.net_profit_usd;
    }
    for route in &mut routes {
        route.confidence_score = confidence_score(route, now, staleness_ms);
    }

    routes.sort_by(|a, b| {
        b.profit_usd
            .total_cmp(&a.profit_usd)
            .then(b.confidence_score.total_cmp(&a.confidence_score))
            .then(a.gas_cost_usd.total_cmp(&b.gas_cost_usd))
    });

    let best = routes.remove(0);
    routes.truncate(config.max_alt_routes);
    Ok(RankOutcome {
        best,
        alts: routes,
        gross_spread_bps: overall_gross,
    })
}

fn quote_age_ms(route: &NormalizedRoute, now: DateTime<Utc>) -> u128 {
    now.signed_duration_since(route.quoted_at)
        .num_milliseconds()
        .max(0) as u128
}

/// Deterministic 0–100 score from source reliability, corroboration,
/// freshness, spread magnitude and network congestion.
fn confidence_score(route: &NormalizedRoute, now: DateTime<Utc>, staleness_ms: u128) -> f64 {
    let mut score: f64 = 50.0;

    score += match route.origin {
        QuoteOrigin::Aggregated => 15.0,
        QuoteOrigin::DexDirect => 5.0,
    };

    score += match route.dex_sources.len() {
        0 => 0.0,
        1 => 5.0,
        2 => 10.0,
        _ => 15.0,
    };

    if quote_age_ms(route, now) <= staleness_ms {
        score += 10.0;
    } else {
        score -= 15.0;
    }

    if route.net_spread_bps > 100.0 {
        score += 20.0;
    } else if route.net_spread_bps > 50.0 {
        score += 10.0;
    } else if route.net_spread_bps > 20.0 {
        score += 5.0;
    }

    if route.gas_price_gwei < 20.0 {
        score += 10.0;
    } else if route.gas_price_gwei < 50.0 {
        score += 5.0;
    }

    score.clamp(0.0, 100.0)
}
