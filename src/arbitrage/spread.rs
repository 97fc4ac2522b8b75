//! Gross and net spread math between candidate routes.

use crate::errors::{DetectError, Result};

use super::types::NormalizedRoute;

/// Spread between a buy and a sell price, in basis points.
pub fn gross_spread_bps(buy_price: f64, sell_price: f64) -> Result<f64> {
    if buy_price <= 0.0 || !buy_price.is_finite() {
        return Err(DetectError::InvalidPrice(format!(
            "buy price must be positive, got {buy_price}"
        )));
    }
    Ok((sell_price - buy_price) / buy_price * 10_000.0)
}

/// One leg's DEX fee in USD on the common amount-in basis.
pub fn leg_fee_usd(fee_bps: u32, trade_size_usd: f64) -> f64 {
    f64::from(fee_bps) / 10_000.0 * trade_size_usd
}

/// Economics of executing buy-on-one-route, sell-on-another, on the same
/// amount-in basis. Gas and the per-leg DEX fee are charged on both legs.
#[derive(Debug, Clone, Copy)]
pub struct PairEconomics {
    pub gross_spread_bps: f64,
    pub gross_profit_usd: f64,
    pub dex_fee_usd: f64,
    pub gas_cost_usd: f64,
    pub net_profit_usd: f64,
    pub net_spread_bps: f64,
}

pub fn pair_economics(buy: &NormalizedRoute, sell: &NormalizedRoute) -> Result<PairEconomics> {
    let trade_size_usd = buy.amount_in_usd;
    let gross = gross_spread_bps(buy.effective_price, sell.effective_price)?;
    let gross_profit_usd = gross / 10_000.0 * trade_size_usd;
    let dex_fee_usd = leg_fee_usd(buy.dex_fee_bps, trade_size_usd)
        + leg_fee_usd(sell.dex_fee_bps, trade_size_usd);
    let gas_cost_usd = buy.gas_cost_usd + sell.gas_cost_usd;
    let net_profit_usd = gross_profit_usd - dex_fee_usd - gas_cost_usd;
    let net_spread_bps = if trade_size_usd > 0.0 {
        net_profit_usd / trade_size_usd * 10_000.0
    } else {
        0.0
    };
    Ok(PairEconomics {
        gross_spread_bps: gross,
        gross_profit_usd,
        dex_fee_usd,
        gas_cost_usd,
        net_profit_usd,
        net_spread_bps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuoteOrigin;
    use chrono::Utc;

    fn route(effective_price: f64, fee_bps: u32, gas_usd: f64, notional: f64) -> NormalizedRoute {
        NormalizedRoute {
            chain_id: 1,
            chain_name: "Ethereum".into(),
            dex_sources: vec!["Uniswap_V3".into()],
            origin: QuoteOrigin::Aggregated,
            effective_price,
            amount_in_usd: notional,
            gas_cost_usd: gas_usd,
            gas_price_gwei: 10.0,
            dex_fee_bps: fee_bps,
            est_fill_cost_usd: 0.0,
            net_spread_bps: 0.0,
            profit_usd: 0.0,
            confidence_score: 0.0,
            quoted_at: Utc::now(),
        }
    }

    #[test]
    fn forty_bps_scenario_nets_about_a_dollar() {
        // buy at 0.998, sell at 1.002, $0.01 total gas, 30 bps on the buy
        // leg, $1000 notional.
        let buy = route(0.998, 30, 0.01, 1_000.0);
        let sell = route(1.002, 0, 0.0, 1_000.0);
        let econ = pair_economics(&buy, &sell).unwrap();
        assert!((econ.gross_spread_bps - 40.08).abs() < 0.01);
        assert!((econ.gross_profit_usd - 4.008).abs() < 0.001);
        assert!((econ.dex_fee_usd - 3.0).abs() < 1e-9);
        assert!((econ.net_profit_usd - 0.998).abs() < 0.001);
        assert!(econ.net_profit_usd > 0.0);
    }

    #[test]
    fn fees_and_gas_only_reduce_spread() {
        let buy = route(1.0, 30, 1.0, 10_000.0);
        let sell = route(1.01, 30, 2.0, 10_000.0);
        let econ = pair_economics(&buy, &sell).unwrap();
        assert!(econ.net_spread_bps <= econ.gross_spread_bps);
        assert!(econ.net_profit_usd <= econ.gross_profit_usd);
    }

    #[test]
    fn zero_buy_price_is_rejected() {
        assert!(matches!(
            gross_spread_bps(0.0, 1.0),
            Err(DetectError::InvalidPrice(_))
        ));
        assert!(matches!(
            gross_spread_bps(-1.0, 1.0),
            Err(DetectError::InvalidPrice(_))
        ));
    }

    #[test]
    fn negative_spread_yields_negative_profit() {
        let buy = route(1.002, 30, 0.01, 1_000.0);
        let sell = route(0.998, 30, 0.01, 1_000.0);
        let econ = pair_economics(&buy, &sell).unwrap();
        assert!(econ.gross_spread_bps < 0.0);
        assert!(econ.net_profit_usd < 0.0);
    }

    #[test]
    fn gas_sums_across_both_legs() {
        let buy = route(1.0, 0, 0.75, 1_000.0);
        let sell = route(1.0, 0, 0.25, 1_000.0);
        let econ = pair_economics(&buy, &sell).unwrap();
        assert!((econ.gas_cost_usd - 1.0).abs() < 1e-12);
        assert!((econ.net_profit_usd + 1.0).abs() < 1e-12);
    }
}
