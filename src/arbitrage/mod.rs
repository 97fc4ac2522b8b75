pub mod normalize;
pub mod rank;
pub mod spread;
pub mod types;

pub use normalize::normalize_route;
pub use rank::{RankOutcome, rank_routes};
pub use spread::{PairEconomics, gross_spread_bps, pair_economics};
pub use types::{ArbitrageReport, NormalizedRoute, SkippedChain};
