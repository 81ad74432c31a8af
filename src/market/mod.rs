//! Market accounts: decoding, positions and views.
//!
//! ## Pipeline
//!
//! ```text
//! account bytes ──decode_market_snapshot──▶ MarketSnapshot
//!                                              │
//!              prices + MarketConfig ──────────┤
//!                                              ▼
//!                                  build_market_view / build_pair_view
//! ```
//!
//! Decoding is all-or-nothing: a truncated buffer or a corrupt free list
//! yields an error, never a partial snapshot.

pub mod health;
pub mod prices;
pub mod snapshot;
pub mod view;

pub use health::{
    assess_position, position_ltv, trader_health, HealthParams, Liquidation, PositionHealth,
};
pub use prices::MarketPriceData;
pub use snapshot::{
    decode_market_snapshot, encode_market_account, market_account_size, project_trader_position,
    MarketSnapshot, MatchPool, SnapshotDigest, TraderPool, TraderPosition,
};
pub use view::{
    build_market_view, build_pair_view, duration_days, MarketParams, MarketStats, MarketView,
    MatchView, PairView, ProtocolRates, TraderPositionView, TraderRef, TraderRole, Valued,
    ViewContext,
};
