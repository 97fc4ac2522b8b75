use thiserror::Error;

pub type Result<T> = std::result::Result<T, DetectError>;

/// Failure taxonomy for a detection run.
///
/// Per-chain failures are caught at the chain-task boundary and recorded as
/// skip annotations on the report; only request validation and total failure
/// (`NoRoutesAvailable`) surface to the caller.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No route or liquidity for the pair on chain {chain_id}")]
    QuoteUnavailable { chain_id: u64 },

    #[error("Quote source error on chain {chain_id}: {reason}")]
    QuoteSource { chain_id: u64, reason: String },

    #[error("Quote source rejected credentials on chain {chain_id}: {reason}")]
    QuoteSourceAuth { chain_id: u64, reason: String },

    #[error("Gas source error on chain {chain_id}: {reason}")]
    GasSource { chain_id: u64, reason: String },

    #[error("USD price unavailable for {symbol}")]
    PriceUnavailable { symbol: String },

    #[error("Normalization error: {0}")]
    Normalization(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("No routes available: every requested chain failed")]
    NoRoutesAvailable,

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DetectError {
    /// Short stable label used for per-chain skip annotations in the report.
    pub fn kind(&self) -> &'static str {
        match self {
            DetectError::InvalidRequest(_) => "invalid_request",
            DetectError::QuoteUnavailable { .. } => "quote_unavailable",
            DetectError::QuoteSource { .. } => "quote_source_error",
            DetectError::QuoteSourceAuth { .. } => "quote_source_auth_error",
            DetectError::GasSource { .. } => "gas_source_error",
            DetectError::PriceUnavailable { .. } => "price_unavailable",
            DetectError::Normalization(_) => "normalization_error",
            DetectError::InvalidPrice(_) => "invalid_price",
            DetectError::NoRoutesAvailable => "no_routes_available",
            DetectError::UrlParse(_) => "internal_error",
            DetectError::Internal(_) => "internal_error",
        }
    }
}
