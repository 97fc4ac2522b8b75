//! Per-chain gas pricing and swap cost estimation.
//!
//! Gas prices stay in wei (`U256`) through every unit conversion; the only
//! floating-point step is the final USD multiply in the normalizer.

use async_trait::async_trait;
use chrono::Utc;
use ethers::types::U256;

use crate::config::ChainConfig;
use crate::errors::Result;
use crate::models::GasEstimate;

pub mod rpc;

pub use rpc::RpcGasOracle;

/// Raw gas price observation for one chain, in wei.
#[derive(Debug, Clone, Copy)]
pub struct GasPriceSample {
    /// Effective price a standard swap would pay.
    pub gas_price_wei: U256,
    /// Populated on EIP-1559 chains.
    pub base_fee_wei: Option<U256>,
    pub priority_fee_wei: Option<U256>,
}

impl GasPriceSample {
    /// Single-figure price from a legacy `eth_gasPrice` chain.
    pub fn legacy(gas_price_wei: U256) -> Self {
        Self {
            gas_price_wei,
            base_fee_wei: None,
            priority_fee_wei: None,
        }
    }

    /// Base-fee + priority-fee composition for EIP-1559 chains.
    pub fn eip1559(base_fee_wei: U256, priority_fee_wei: U256) -> Self {
        Self {
            gas_price_wei: base_fee_wei + priority_fee_wei,
            base_fee_wei: Some(base_fee_wei),
            priority_fee_wei: Some(priority_fee_wei),
        }
    }
}

/// Current network gas price per chain.
///
/// Implementations select the legacy or EIP-1559 fetch path from the chain
/// configuration and apply their own per-call timeout.
#[async_trait]
pub trait GasOracle: Send + Sync {
    async fn gas_price(&self, chain: &ChainConfig) -> Result<GasPriceSample>;
}

/// Cost of one standard swap at the sampled price, wei arithmetic only.
pub fn estimate_swap_cost(chain: &ChainConfig, sample: &GasPriceSample) -> GasEstimate {
    let gas_units = chain.swap_gas_units;
    GasEstimate {
        chain_id: chain.chain_id,
        gas_price_wei: sample.gas_price_wei,
        gas_units,
        gas_cost_wei: sample.gas_price_wei * U256::from(gas_units),
        fetched_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::supported_chains;

    fn chain(id: u64) -> ChainConfig {
        supported_chains()
            .into_iter()
            .find(|c| c.chain_id == id)
            .unwrap()
    }

    #[test]
    fn eip1559_sample_sums_base_and_priority() {
        let base = U256::from(30_000_000_000u64); // 30 gwei
        let tip = U256::from(1_500_000_000u64); // 1.5 gwei
        let sample = GasPriceSample::eip1559(base, tip);
        assert_eq!(sample.gas_price_wei, U256::from(31_500_000_000u64));
        assert_eq!(sample.base_fee_wei, Some(base));
    }

    #[test]
    fn swap_cost_multiplies_price_by_chain_gas_units() {
        let sample = GasPriceSample::legacy(U256::from(5_000_000_000u64)); // 5 gwei
        let est = estimate_swap_cost(&chain(56), &sample);
        assert_eq!(est.gas_units, 200_000);
        assert_eq!(est.gas_cost_wei, U256::from(1_000_000_000_000_000u64)); // 0.001 BNB
    }

    #[test]
    fn swap_cost_keeps_full_wei_precision() {
        // A price that would lose digits in f64 must survive in wei.
        let odd_price = U256::from(123_456_789_123_456_789u64);
        let sample = GasPriceSample::legacy(odd_price);
        let est = estimate_swap_cost(&chain(1), &sample);
        assert_eq!(est.gas_cost_wei, odd_price * U256::from(150_000u64));
    }
}
