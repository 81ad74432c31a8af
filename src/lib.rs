//! # Paystream Market
//!
//! Read-only decoder and risk calculator for Paystream peer-to-peer lending
//! market accounts.
//!
//! ## Architecture
//!
//! - **Types**: Fixed-width on-chain records (traders, matches, identities)
//! - **Allocator**: Node-allocator region decoder and free-list resolution
//! - **Market**: Snapshots, positions, health and aggregate views
//! - **Math**: Checked fixed-point lending, interest and valuation formulas
//! - **Oracle**: Feed normalisation and price collaborators
//! - **Source**: Account collaborators and concurrent pair loading
//!
//! ## Design Principles
//!
//! 1. **Determinism**: identical bytes and prices give identical views
//! 2. **No Floating Point**: integer math with explicit precision; USD display
//!    goes through `rust_decimal`
//! 3. **All-or-nothing decoding**: corrupt or truncated accounts are errors,
//!    never partial snapshots
//! 4. **Read-only**: nothing here writes an account or submits a transaction

// ============================================================================
// Module declarations
// ============================================================================

/// On-chain record types
pub mod types;

/// Node-allocator region decoding
pub mod allocator;

/// Market snapshots, positions and views
pub mod market;

/// Fixed-point lending math
pub mod math;

/// Oracle normalisation and clients
pub mod oracle;

/// Account sources and pair loading
pub mod source;

/// Settings documents
pub mod config;

/// Error taxonomy
pub mod error;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::{MarketConfig, MarketStatus, Settings};
pub use error::{MarketError, Result};
pub use market::{
    build_market_view, build_pair_view, decode_market_snapshot, MarketPriceData, MarketSnapshot,
    MarketView, PairView, ViewContext,
};
pub use math::Precision;
pub use source::{AccountSource, LoadedPair, MarketPairLoader, MemoryAccountSource};
pub use types::{MatchRecord, Pubkey, TraderRecord};
