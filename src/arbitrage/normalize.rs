//! Raw quotes + gas estimates → USD-denominated comparable routes.

use std::collections::HashMap;

use num_traits::{ToPrimitive, Zero};

use crate::config::{ChainConfig, DetectorConfig, ResolvedToken, dex_fee_bps};
use crate::errors::{DetectError, Result};
use crate::models::{GasEstimate, Quote};
use crate::utils::{u256_to_decimal, u256_to_f64, wei_to_gwei};

use super::types::NormalizedRoute;

/// Build a `NormalizedRoute` from one chain's quote and gas estimate.
///
/// Every USD component must resolve here; a route that cannot price its
/// gas, fees or notional is rejected rather than defaulted to zero.
pub fn normalize_route(
    config: &DetectorConfig,
    chain: &ChainConfig,
    quote: &Quote,
    gas: &GasEstimate,
    prices: &HashMap<String, f64>,
    token_in: &ResolvedToken,
    token_out: &ResolvedToken,
) -> Result<NormalizedRoute> {
    let decimals_in = resolve_decimals(config, token_in)?;
    let decimals_out = resolve_decimals(config, token_out)?;

    let amount_in = u256_to_decimal(quote.amount_in, decimals_in);
    let amount_out = u256_to_decimal(quote.amount_out, decimals_out);
    if amount_in.is_zero() {
        return Err(DetectError::Normalization(format!(
            "zero input amount on chain {}",
            chain.chain_id
        )));
    }
    let effective_price = (&amount_out / &amount_in).to_f64().unwrap_or(0.0);
    if !effective_price.is_finite() || effective_price <= 0.0 {
        return Err(DetectError::InvalidPrice(format!(
            "non-positive effective price on chain {}",
            chain.chain_id
        )));
    }

    // Wei stays integral up to this single USD multiply.
    let native_price = *prices
        .get(chain.native_symbol)
        .ok_or_else(|| DetectError::PriceUnavailable {
            symbol: chain.native_symbol.to_string(),
        })?;
    let gas_cost_usd =
        u256_to_f64(gas.gas_cost_wei) / 10f64.powi(i32::from(chain.native_decimals)) * native_price;

    let amount_in_usd = trade_notional_usd(prices, token_in, token_out, &amount_in, &amount_out)?;

    // Highest participating-source fee, conservative when the fill is split.
    let fee_bps = quote
        .dex_sources
        .iter()
        .filter_map(|s| dex_fee_bps(s))
        .max()
        .unwrap_or(config.default_dex_fee_bps);
    let dex_fee_usd = f64::from(fee_bps) / 10_000.0 * amount_in_usd;

    Ok(NormalizedRoute {
        chain_id: chain.chain_id,
        chain_name: chain.name.to_string(),
        dex_sources: quote.dex_sources.clone(),
        origin: quote.origin,
        effective_price,
        amount_in_usd,
        gas_cost_usd,
        gas_price_gwei: wei_to_gwei(gas.gas_price_wei),
        dex_fee_bps: fee_bps,
        est_fill_cost_usd: gas_cost_usd + dex_fee_usd,
        net_spread_bps: 0.0,
        profit_usd: 0.0,
        confidence_score: 0.0,
        quoted_at: quote.fetched_at,
    })
}

fn resolve_decimals(config: &DetectorConfig, token: &ResolvedToken) -> Result<u8> {
    token
        .decimals
        .or(config.default_token_decimals)
        .ok_or_else(|| {
            DetectError::Normalization(format!(
                "unknown decimals for token {} and no default policy",
                token.address
            ))
        })
}

/// USD value of the common amount-in basis, via the input token's price or,
/// failing that, the output side of this quote.
fn trade_notional_usd(
    prices: &HashMap<String, f64>,
    token_in: &ResolvedToken,
    token_out: &ResolvedToken,
    amount_in: &bigdecimal::BigDecimal,
    amount_out: &bigdecimal::BigDecimal,
) -> Result<f64> {
    if let Some(sym) = &token_in.symbol {
        if let Some(p) = prices.get(&sym.to_ascii_uppercase()) {
            return Ok(amount_in.to_f64().unwrap_or(0.0) * p);
        }
    }
    if let Some(sym) = &token_out.symbol {
        if let Some(p) = prices.get(&sym.to_ascii_uppercase()) {
            return Ok(amount_out.to_f64().unwrap_or(0.0) * p);
        }
    }
    Err(DetectError::PriceUnavailable {
        symbol: token_in
            .symbol
            .clone()
            .unwrap_or_else(|| token_in.address.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GasModel, supported_chains};
    use crate::models::QuoteOrigin;
    use chrono::Utc;
    use ethers::types::U256;
    use std::time::Duration;

    fn test_config() -> DetectorConfig {
        DetectorConfig {
            chains: supported_chains(),
            default_dex_fee_bps: 30,
            default_token_decimals: Some(18),
            quote_timeout: Duration::from_secs(5),
            gas_timeout: Duration::from_secs(5),
            quote_staleness: Duration::from_secs(3),
            price_ttl: Duration::from_secs(30),
            price_max_stale: Duration::from_secs(300),
            max_alt_routes: 5,
            default_priority_fee_gwei: 1,
            quote_api_key: None,
        }
    }

    fn eth_chain() -> ChainConfig {
        ChainConfig {
            chain_id: 1,
            name: "Ethereum",
            native_symbol: "ETH",
            native_decimals: 18,
            gas_model: GasModel::Eip1559,
            swap_gas_units: 150_000,
            rpc_env: "ETHEREUM_RPC_URL",
            rpc_url: None,
        }
    }

    fn token(symbol: Option<&str>, decimals: Option<u8>) -> ResolvedToken {
        ResolvedToken {
            address: "0x0000000000000000000000000000000000000001".into(),
            symbol: symbol.map(str::to_string),
            decimals,
        }
    }

    fn quote(amount_in: U256, amount_out: U256, sources: &[&str]) -> Quote {
        Quote {
            chain_id: 1,
            dex_sources: sources.iter().map(|s| s.to_string()).collect(),
            origin: QuoteOrigin::Aggregated,
            token_in: "0x01".into(),
            token_out: "0x02".into(),
            amount_in,
            amount_out,
            raw_price: 0.0,
            estimated_gas: Some(136_000),
            fetched_at: Utc::now(),
        }
    }

    fn gas(cost_wei: u64) -> GasEstimate {
        GasEstimate {
            chain_id: 1,
            gas_price_wei: U256::from(30_000_000_000u64),
            gas_units: 150_000,
            gas_cost_wei: U256::from(cost_wei),
            fetched_at: Utc::now(),
        }
    }

    fn prices() -> HashMap<String, f64> {
        HashMap::from([
            ("ETH".to_string(), 2_000.0),
            ("WETH".to_string(), 2_000.0),
            ("USDC".to_string(), 1.0),
        ])
    }

    #[test]
    fn adjusts_for_mixed_decimals() {
        // 1 WETH (18 dec) -> 1845.12 USDC (6 dec)
        let q = quote(
            U256::from(1_000_000_000_000_000_000u64),
            U256::from(1_845_120_000u64),
            &["Uniswap_V3"],
        );
        let route = normalize_route(
            &test_config(),
            &eth_chain(),
            &q,
            &gas(1_000_000_000_000_000), // 0.001 ETH
            &prices(),
            &token(Some("WETH"), Some(18)),
            &token(Some("USDC"), Some(6)),
        )
        .unwrap();
        assert!((route.effective_price - 1845.12).abs() < 1e-9);
        assert!((route.gas_cost_usd - 2.0).abs() < 1e-9);
        assert!((route.amount_in_usd - 2_000.0).abs() < 1e-9);
        // 30 bps of $2000 plus $2 gas
        assert!((route.est_fill_cost_usd - 8.0).abs() < 1e-9);
        assert_eq!(route.gas_price_gwei, 30.0);
    }

    #[test]
    fn unknown_decimals_follow_default_policy() {
        let q = quote(U256::exp10(18), U256::exp10(18), &[]);
        let route = normalize_route(
            &test_config(),
            &eth_chain(),
            &q,
            &gas(0),
            &prices(),
            &token(Some("WETH"), None),
            &token(Some("USDC"), None),
        )
        .unwrap();
        assert!((route.effective_price - 1.0).abs() < 1e-12);
    }

    #[test]
    fn strict_policy_rejects_unknown_decimals() {
        let mut config = test_config();
        config.default_token_decimals = None;
        let q = quote(U256::one(), U256::one(), &[]);
        let err = normalize_route(
            &config,
            &eth_chain(),
            &q,
            &gas(0),
            &prices(),
            &token(None, None),
            &token(Some("USDC"), Some(6)),
        )
        .unwrap_err();
        assert!(matches!(err, DetectError::Normalization(_)));
    }

    #[test]
    fn missing_native_price_is_fatal_for_the_route() {
        let q = quote(U256::one(), U256::one(), &[]);
        let err = normalize_route(
            &test_config(),
            &eth_chain(),
            &q,
            &gas(1),
            &HashMap::new(),
            &token(Some("WETH"), Some(18)),
            &token(Some("USDC"), Some(6)),
        )
        .unwrap_err();
        assert!(matches!(err, DetectError::PriceUnavailable { .. }));
    }

    #[test]
    fn zero_output_is_an_invalid_price() {
        let q = quote(U256::exp10(18), U256::zero(), &[]);
        let err = normalize_route(
            &test_config(),
            &eth_chain(),
            &q,
            &gas(0),
            &prices(),
            &token(Some("WETH"), Some(18)),
            &token(Some("USDC"), Some(6)),
        )
        .unwrap_err();
        assert!(matches!(err, DetectError::InvalidPrice(_)));
    }

    #[test]
    fn fee_comes_from_the_costliest_participating_source() {
        let q = quote(
            U256::exp10(18),
            U256::from(1_000_000u64),
            &["PancakeSwap", "Uniswap_V3"],
        );
        let route = normalize_route(
            &test_config(),
            &eth_chain(),
            &q,
            &gas(0),
            &prices(),
            &token(Some("WETH"), Some(18)),
            &token(Some("USDC"), Some(6)),
        )
        .unwrap();
        assert_eq!(route.dex_fee_bps, 30);
    }

    #[test]
    fn notional_falls_back_to_the_output_token() {
        // Input token unpriceable, output is USDC.
        let q = quote(
            U256::exp10(18),
            U256::from(500_000_000u64), // 500 USDC
            &[],
        );
        let route = normalize_route(
            &test_config(),
            &eth_chain(),
            &q,
            &gas(0),
            &prices(),
            &token(None, Some(18)),
            &token(Some("USDC"), Some(6)),
        )
        .unwrap();
        assert!((route.amount_in_usd - 500.0).abs() < 1e-9);
    }
}
