//! Chain registry, token registry and consolidated detector settings.

use std::time::Duration;

/// Gas pricing model a chain exposes over RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasModel {
    /// Single `eth_gasPrice` figure.
    Legacy,
    /// Base fee from the latest block plus a priority fee.
    Eip1559,
}

/// Static per-chain parameters, one entry per supported chain.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: &'static str,
    pub native_symbol: &'static str,
    pub native_decimals: u8,
    pub gas_model: GasModel,
    /// Gas units for a standard single-hop swap on this chain.
    pub swap_gas_units: u64,
    /// Environment variable holding the chain's RPC endpoint.
    pub rpc_env: &'static str,
    /// Resolved at load time; chains without an endpoint are still listed
    /// so requests naming them get a per-chain skip reason.
    pub rpc_url: Option<String>,
}

/// Consolidated application configuration, built once at startup and passed
/// explicitly to the detector.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub chains: Vec<ChainConfig>,
    /// Fallback per-leg DEX fee when no source-specific fee is known.
    pub default_dex_fee_bps: u32,
    /// Decimals assumed for tokens absent from the registry. `None` makes
    /// normalization fail instead of guessing.
    pub default_token_decimals: Option<u8>,
    pub quote_timeout: Duration,
    pub gas_timeout: Duration,
    /// Quotes older than this are penalized when scoring; far beyond it
    /// they are excluded outright.
    pub quote_staleness: Duration,
    pub price_ttl: Duration,
    /// Stale price-feed cache entries younger than this are still served
    /// when a refresh fails.
    pub price_max_stale: Duration,
    pub max_alt_routes: usize,
    /// Priority fee assumed when `eth_maxPriorityFeePerGas` is unavailable.
    pub default_priority_fee_gwei: u64,
    pub quote_api_key: Option<String>,
}

impl DetectorConfig {
    /// Load configuration from environment variables, with defaults matching
    /// the reference deployment.
    pub fn load() -> Self {
        Self {
            chains: supported_chains(),
            default_dex_fee_bps: env_parse("DEX_FEE_BPS", 30),
            default_token_decimals: match std::env::var("UNKNOWN_TOKEN_DECIMALS").as_deref() {
                Ok("strict") => None,
                Ok(v) => Some(v.parse().unwrap_or(18)),
                Err(_) => Some(18),
            },
            quote_timeout: Duration::from_millis(env_parse("QUOTE_TIMEOUT_MS", 5_000)),
            gas_timeout: Duration::from_millis(env_parse("GAS_TIMEOUT_MS", 5_000)),
            quote_staleness: Duration::from_millis(env_parse("QUOTE_STALENESS_MS", 3_000)),
            price_ttl: Duration::from_secs(env_parse("PRICE_TTL_SECS", 30)),
            price_max_stale: Duration::from_secs(env_parse("PRICE_MAX_STALE_SECS", 300)),
            max_alt_routes: env_parse("MAX_ALT_ROUTES", 5),
            default_priority_fee_gwei: env_parse("DEFAULT_PRIORITY_FEE_GWEI", 1),
            quote_api_key: std::env::var("ZEROX_API_KEY").ok(),
        }
    }

    pub fn chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// The seven reference chains, RPC endpoints resolved from the environment.
pub fn supported_chains() -> Vec<ChainConfig> {
    let entry = |chain_id, name, native_symbol, gas_model, swap_gas_units, rpc_env: &'static str| {
        ChainConfig {
            chain_id,
            name,
            native_symbol,
            native_decimals: 18,
            gas_model,
            swap_gas_units,
            rpc_env,
            rpc_url: std::env::var(rpc_env).ok(),
        }
    };
    vec![
        entry(1, "Ethereum", "ETH", GasModel::Eip1559, 150_000, "ETHEREUM_RPC_URL"),
        entry(10, "Optimism", "ETH", GasModel::Eip1559, 180_000, "OPTIMISM_RPC_URL"),
        entry(56, "BNB Chain", "BNB", GasModel::Legacy, 200_000, "BSC_RPC_URL"),
        entry(137, "Polygon", "MATIC", GasModel::Eip1559, 180_000, "POLYGON_RPC_URL"),
        entry(8453, "Base", "ETH", GasModel::Eip1559, 180_000, "BASE_RPC_URL"),
        entry(42161, "Arbitrum", "ETH", GasModel::Eip1559, 200_000, "ARBITRUM_RPC_URL"),
        entry(43114, "Avalanche", "AVAX", GasModel::Eip1559, 180_000, "AVALANCHE_RPC_URL"),
    ]
}

/// Per-source liquidity-provider fee in basis points.
///
/// Unknown sources fall back to `DetectorConfig::default_dex_fee_bps`.
pub fn dex_fee_bps(source: &str) -> Option<u32> {
    match source.to_ascii_lowercase().as_str() {
        "uniswap_v2" | "uniswap v2" => Some(30),
        "uniswap_v3" | "uniswap v3" => Some(30),
        "sushiswap" => Some(30),
        "pancakeswap" | "pancakeswap_v2" => Some(25),
        "quickswap" => Some(30),
        "camelot" => Some(30),
        _ => None,
    }
}

/// A token entry resolved against the registry.
#[derive(Debug, Clone)]
pub struct ResolvedToken {
    pub address: String,
    /// Known symbol, when the registry recognizes the token.
    pub symbol: Option<String>,
    /// Known decimals; `None` triggers the unknown-decimals policy.
    pub decimals: Option<u8>,
}

/// Resolve a symbol or raw address against the per-chain token registry.
///
/// Returns `None` only for a symbol the chain does not list; raw addresses
/// always resolve (possibly with unknown symbol/decimals).
pub fn resolve_token(chain_id: u64, token: &str) -> Option<ResolvedToken> {
    if token.starts_with("0x") || token.starts_with("0X") {
        let known = known_tokens(chain_id)
            .iter()
            .find(|(_, addr, _)| addr.eq_ignore_ascii_case(token))
            .copied();
        return Some(ResolvedToken {
            address: token.to_string(),
            symbol: known.map(|(sym, _, _)| sym.to_string()),
            decimals: known.map(|(_, _, dec)| dec),
        });
    }
    let upper = token.to_ascii_uppercase();
    known_tokens(chain_id)
        .iter()
        .find(|(sym, _, _)| *sym == upper)
        .map(|(sym, addr, dec)| ResolvedToken {
            address: (*addr).to_string(),
            symbol: Some((*sym).to_string()),
            decimals: Some(*dec),
        })
}

/// Well-known token addresses and decimals per chain: (symbol, address, decimals).
fn known_tokens(chain_id: u64) -> &'static [(&'static str, &'static str, u8)] {
    match chain_id {
        1 => &[
            ("WETH", "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", 18),
            ("USDC", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 6),
            ("USDT", "0xdAC17F958D2ee523a2206206994597C13D831ec7", 6),
            ("DAI", "0x6B175474E89094C44Da98b954EedeAC495271d0F", 18),
            ("WBTC", "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599", 8),
        ],
        10 => &[
            ("WETH", "0x4200000000000000000000000000000000000006", 18),
            ("USDC", "0x7F5c764cBc14f9669B88837ca1490cCa17c31607", 6),
            ("USDT", "0x94b008aA00579c1307B0EF2c499aD98a8ce58e58", 6),
            ("OP", "0x4200000000000000000000000000000000000042", 18),
        ],
        56 => &[
            ("WBNB", "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c", 18),
            ("USDC", "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d", 18),
            ("USDT", "0x55d398326f99059fF775485246999027B3197955", 18),
            ("BUSD", "0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56", 18),
        ],
        137 => &[
            ("WMATIC", "0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270", 18),
            ("USDC", "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174", 6),
            ("USDT", "0xc2132D05D31c914a87C6611C10748AEb04B58e8F", 6),
            ("WETH", "0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619", 18),
        ],
        8453 => &[
            ("WETH", "0x4200000000000000000000000000000000000006", 18),
            ("USDC", "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", 6),
            ("DAI", "0x50c5725949A6F0c72E6C4a641F24049A917DB0Cb", 18),
        ],
        42161 => &[
            ("WETH", "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1", 18),
            ("USDC", "0xFF970A61A04b1cA14834A43f5dE4533eBDDB5CC8", 6),
            ("USDT", "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9", 6),
            ("ARB", "0x912CE59144191C1204E64559FE8253a0e49E6548", 18),
        ],
        43114 => &[
            ("WAVAX", "0xB31f66AA3C1e785363F0875A1B74E27b85FD66c7", 18),
            ("USDC", "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E", 6),
            ("USDT", "0x9702230A8Ea53601f5cD2dc00fDBc13d4dF4A8c7", 6),
        ],
        _ => &[],
    }
}
