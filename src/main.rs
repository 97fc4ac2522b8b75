use anyhow::Result;
use cross_dex_arb::{Detector, DetectorConfig, models::DetectRequest, utils};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    // Request parameters
    let token_in = std::env::var("TOKEN_IN").unwrap_or_else(|_| "WETH".into());
    let token_out = std::env::var("TOKEN_OUT").unwrap_or_else(|_| "USDC".into());
    let amount_in: f64 = std::env::var("AMOUNT_IN")
        .unwrap_or_else(|_| "1.0".into())
        .parse()
        .unwrap_or(1.0);
    let chain_ids: Vec<u64> = std::env::var("CHAIN_IDS")
        .unwrap_or_else(|_| "1,10,137,8453,42161".into())
        .split(',')
        .filter_map(|c| c.trim().parse().ok())
        .collect();

    tracing::info!(
        %token_in,
        %token_out,
        amount_in,
        chains = ?chain_ids,
        "[INIT] cross-dex-arb starting"
    );

    let detector = Detector::from_config(DetectorConfig::load())?;
    let request = DetectRequest {
        token_in,
        token_out,
        amount_in,
        chain_ids,
    };

    let report = detector.detect(&request).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
