//! JSON-RPC gas oracle backed by one long-lived provider per chain.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{BlockNumber, U256};
use tracing::{debug, warn};

use crate::config::{ChainConfig, DetectorConfig, GasModel};
use crate::errors::{DetectError, Result};

use super::{GasOracle, GasPriceSample};

const WEI_PER_GWEI: u64 = 1_000_000_000;

/// Gas oracle reading prices over JSON-RPC.
///
/// Providers are built once at startup and shared read-only across
/// concurrent detection runs.
pub struct RpcGasOracle {
    providers: HashMap<u64, Arc<Provider<Http>>>,
    timeout: Duration,
    default_priority_fee_wei: U256,
}

impl RpcGasOracle {
    pub fn new(config: &DetectorConfig) -> Self {
        let mut providers = HashMap::new();
        for chain in &config.chains {
            let Some(url) = &chain.rpc_url else { continue };
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(p) => {
                    providers.insert(chain.chain_id, Arc::new(p));
                    debug!(chain = chain.name, chain_id = chain.chain_id, "[GAS] provider ready");
                }
                Err(e) => {
                    warn!(chain = chain.name, error = %e, "[GAS] bad RPC endpoint, chain disabled");
                }
            }
        }
        Self {
            providers,
            timeout: config.gas_timeout,
            default_priority_fee_wei: U256::from(config.default_priority_fee_gwei)
                * U256::from(WEI_PER_GWEI),
        }
    }

    async fn fetch(&self, chain: &ChainConfig, provider: &Provider<Http>) -> Result<GasPriceSample> {
        let chain_id = chain.chain_id;
        match chain.gas_model {
            GasModel::Legacy => {
                let price = provider
                    .get_gas_price()
                    .await
                    .map_err(|e| DetectError::GasSource {
                        chain_id,
                        reason: e.to_string(),
                    })?;
                Ok(GasPriceSample::legacy(price))
            }
            GasModel::Eip1559 => {
                let block = provider
                    .get_block(BlockNumber::Latest)
                    .await
                    .map_err(|e| DetectError::GasSource {
                        chain_id,
                        reason: e.to_string(),
                    })?
                    .ok_or_else(|| DetectError::GasSource {
                        chain_id,
                        reason: "latest block missing".into(),
                    })?;
                let base_fee = block.base_fee_per_gas.ok_or_else(|| DetectError::GasSource {
                    chain_id,
                    reason: "latest block carries no base fee".into(),
                })?;
                // Not every node serves eth_maxPriorityFeePerGas.
                let priority = match provider
                    .request::<_, U256>("eth_maxPriorityFeePerGas", ())
                    .await
                {
                    Ok(tip) => tip,
                    Err(e) => {
                        debug!(chain_id, error = %e, "[GAS] priority fee unavailable, using default");
                        self.default_priority_fee_wei
                    }
                };
                Ok(GasPriceSample::eip1559(base_fee, priority))
            }
        }
    }
}

#[async_trait]
impl GasOracle for RpcGasOracle {
    async fn gas_price(&self, chain: &ChainConfig) -> Result<GasPriceSample> {
        let chain_id = chain.chain_id;
        let provider = self.providers.get(&chain_id).ok_or_else(|| {
            DetectError::GasSource {
                chain_id,
                reason: format!("no RPC endpoint configured ({})", chain.rpc_env),
            }
        })?;
        tokio::time::timeout(self.timeout, self.fetch(chain, provider))
            .await
            .map_err(|_| DetectError::GasSource {
                chain_id,
                reason: "request timed out".into(),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::supported_chains;

    fn bare_config() -> DetectorConfig {
        DetectorConfig {
            chains: supported_chains()
                .into_iter()
                .map(|mut c| {
                    c.rpc_url = None;
                    c
                })
                .collect(),
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

    #[tokio::test]
    async fn unconfigured_chain_reports_gas_source_error() {
        let config = bare_config();
        let oracle = RpcGasOracle::new(&config);
        let chain = config.chain(1).unwrap();
        let err = oracle.gas_price(chain).await.unwrap_err();
        assert!(matches!(err, DetectError::GasSource { chain_id: 1, .. }));
        assert_eq!(err.kind(), "gas_source_error");
    }

    #[test]
    fn default_priority_fee_is_in_wei() {
        let oracle = RpcGasOracle::new(&bare_config());
        assert_eq!(oracle.default_priority_fee_wei, U256::from(1_000_000_000u64));
    }
}
