//! Cross-chain DEX arbitrage detection engine.
//!
//! Fetches swap quotes and gas prices for a token pair across several
//! chains concurrently, normalizes everything into USD-denominated routes,
//! and ranks gas- and fee-adjusted execution routes by net profitability.

pub mod arbitrage;
pub mod config;
pub mod detector;
pub mod errors;
pub mod gas;
pub mod models;
pub mod pricefeed;
pub mod quote;
pub mod utils;

pub use arbitrage::types::{ArbitrageReport, NormalizedRoute, SkippedChain};
pub use config::DetectorConfig;
pub use detector::Detector;
pub use errors::{DetectError, Result};
pub use models::DetectRequest;
