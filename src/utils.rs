//! Logging setup and numeric helpers.

use bigdecimal::BigDecimal;
use ethers::types::U256;
use num_bigint::BigInt;
use num_traits::FromPrimitive;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize `tracing` subscriber with env-based filter.
///
/// If `RUST_LOG` is not set, defaults to `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Lossy `U256` → `f64` via its decimal string.
pub fn u256_to_f64(v: U256) -> f64 {
    v.to_string().parse().unwrap_or(0.0)
}

/// Exact `U256` → decimal, shifted down by `decimals` digits.
pub fn u256_to_decimal(v: U256, decimals: u8) -> BigDecimal {
    // Digits-only string, parse cannot fail.
    let digits = BigInt::parse_bytes(v.to_string().as_bytes(), 10)
        .unwrap_or_else(|| BigInt::from(0));
    BigDecimal::new(digits, i64::from(decimals))
}

/// Scale a human-readable amount into smallest token units.
///
/// Returns `None` for non-finite or negative amounts, or when the scaled
/// value does not fit an integer representation.
pub fn scale_amount(amount: f64, decimals: u8) -> Option<U256> {
    if !amount.is_finite() || amount < 0.0 {
        return None;
    }
    let scaled = BigDecimal::from_f64(amount)? * BigDecimal::new(BigInt::from(1), -i64::from(decimals));
    U256::from_dec_str(&scaled.with_scale(0).to_string()).ok()
}

pub fn wei_to_gwei(wei: U256) -> f64 {
    u256_to_f64(wei) / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_to_f64_round_trips_small_values() {
        assert_eq!(u256_to_f64(U256::from(1_500_000_000u64)), 1.5e9);
    }

    #[test]
    fn decimal_shift_matches_token_decimals() {
        let one_usdc = u256_to_decimal(U256::from(1_000_000u64), 6);
        assert_eq!(one_usdc, BigDecimal::from(1));
        let half_eth = u256_to_decimal(U256::from(500_000_000_000_000_000u64), 18);
        assert_eq!(half_eth.to_string(), "0.500000000000000000");
    }

    #[test]
    fn scale_amount_handles_six_and_eighteen_decimals() {
        assert_eq!(scale_amount(1.5, 6), Some(U256::from(1_500_000u64)));
        assert_eq!(
            scale_amount(2.0, 18),
            Some(U256::from(2_000_000_000_000_000_000u64))
        );
    }

    #[test]
    fn scale_amount_rejects_bad_input() {
        assert_eq!(scale_amount(f64::NAN, 18), None);
        assert_eq!(scale_amount(-1.0, 18), None);
        assert_eq!(scale_amount(f64::INFINITY, 6), None);
    }

    #[test]
    fn wei_to_gwei_converts() {
        assert_eq!(wei_to_gwei(U256::from(25_000_000_000u64)), 25.0);
    }
}
