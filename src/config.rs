//! Settings file: precision constants and per-market parameters.
//!
//! ## Format
//!
//! ```toml
//! [precision]
//! price_precision = 1000000
//! rate_precision = 10000
//!
//! [[markets]]
//! name = "USDC/SOL"
//! market = "..."
//! collateral_market = "..."
//! mint = "..."
//! collateral_mint = "..."
//! market_id = 1
//! mint_decimals = 6
//! collateral_decimals = 9
//! ltv_ratio = 8000
//! liquidation_threshold = 8500
//! status = "active"
//! ```
//!
//! Every `[precision]` field has a default; see [`Precision`].

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::allocator::MAX_REGION_SLOTS;
use crate::error::{MarketError, Result};
use crate::market::market_account_size;
use crate::math::precision::MAX_TOKEN_DECIMALS;
use crate::math::Precision;
use crate::oracle::OracleSource;
use crate::types::Pubkey;

/// Trader slots per market account (lending program build constant)
pub const DEFAULT_NUM_TRADER_SLOTS: usize = 32;

/// Match slots per market account (lending program build constant)
pub const DEFAULT_NUM_MATCH_SLOTS: usize = 128;

/// Default P2P blend weight: halfway between borrow and supply rates
pub const DEFAULT_P2P_ALPHA: u64 = 5_000;

/// Lifecycle state of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    #[default]
    Uninitialized,
    Active,
    Paused,
    Closed,
    Tombstoned,
}

impl MarketStatus {
    /// Map the on-chain status word; unknown values read as uninitialized.
    pub fn from_u64(value: u64) -> Self {
        match value {
            1 => Self::Active,
            2 => Self::Paused,
            3 => Self::Closed,
            4 => Self::Tombstoned,
            _ => Self::Uninitialized,
        }
    }

    pub fn to_u64(self) -> u64 {
        match self {
            Self::Uninitialized => 0,
            Self::Active => 1,
            Self::Paused => 2,
            Self::Closed => 3,
            Self::Tombstoned => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Closed => "closed",
            Self::Tombstoned => "tombstoned",
        }
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one lending market.
///
/// A lending market always has a partner collateral market; the
/// `collateral_*` fields describe that partner as seen from this market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Label for logs and output
    #[serde(default)]
    pub name: String,

    pub market: Pubkey,
    pub collateral_market: Pubkey,
    pub mint: Pubkey,
    pub collateral_mint: Pubkey,

    #[serde(default)]
    pub market_id: u64,

    #[serde(default)]
    pub collateral_market_id: u64,

    pub mint_decimals: u8,
    pub collateral_decimals: u8,

    /// Loan-to-value ratio in `rate_precision` units
    pub ltv_ratio: u64,

    /// Liquidation threshold in `rate_precision` units
    pub liquidation_threshold: u64,

    /// LTV of the partner market; defaults to `ltv_ratio`
    #[serde(default)]
    pub collateral_ltv_ratio: Option<u64>,

    /// Liquidation threshold of the partner market; defaults to
    /// `liquidation_threshold`
    #[serde(default)]
    pub collateral_liquidation_threshold: Option<u64>,

    #[serde(default)]
    pub status: MarketStatus,

    #[serde(default)]
    pub oracle: Option<Pubkey>,

    /// On-chain oracle source tag
    #[serde(default = "default_oracle_source")]
    pub oracle_source: u8,

    #[serde(default)]
    pub collateral_oracle: Option<Pubkey>,

    #[serde(default = "default_oracle_source")]
    pub collateral_oracle_source: u8,

    #[serde(default = "default_num_trader_slots")]
    pub num_trader_slots: usize,

    #[serde(default = "default_num_match_slots")]
    pub num_match_slots: usize,

    /// Blend weight of the borrow rate in the P2P rate (`rate_precision`)
    #[serde(default = "default_p2p_alpha")]
    pub p2p_alpha: u64,
}

fn default_oracle_source() -> u8 {
    OracleSource::QuoteAsset.to_u8()
}

fn default_num_trader_slots() -> usize {
    DEFAULT_NUM_TRADER_SLOTS
}

fn default_num_match_slots() -> usize {
    DEFAULT_NUM_MATCH_SLOTS
}

fn default_p2p_alpha() -> u64 {
    DEFAULT_P2P_ALPHA
}

impl MarketConfig {
    /// The partner market's parameters, seen from the partner.
    pub fn mirrored(&self) -> MarketConfig {
        MarketConfig {
            name: format!("{} (collateral)", self.name),
            market: self.collateral_market,
            collateral_market: self.market,
            mint: self.collateral_mint,
            collateral_mint: self.mint,
            market_id: self.collateral_market_id,
            collateral_market_id: self.market_id,
            mint_decimals: self.collateral_decimals,
            collateral_decimals: self.mint_decimals,
            ltv_ratio: self.collateral_ltv_ratio.unwrap_or(self.ltv_ratio),
            liquidation_threshold: self
                .collateral_liquidation_threshold
                .unwrap_or(self.liquidation_threshold),
            collateral_ltv_ratio: Some(self.ltv_ratio),
            collateral_liquidation_threshold: Some(self.liquidation_threshold),
            status: self.status,
            oracle: self.collateral_oracle,
            oracle_source: self.collateral_oracle_source,
            collateral_oracle: self.oracle,
            collateral_oracle_source: self.oracle_source,
            num_trader_slots: self.num_trader_slots,
            num_match_slots: self.num_match_slots,
            p2p_alpha: self.p2p_alpha,
        }
    }

    /// Oracle kind for this market's mint
    pub fn oracle_source(&self) -> Option<OracleSource> {
        OracleSource::from_u8(self.oracle_source)
    }

    /// Oracle kind for the collateral mint
    pub fn collateral_oracle_source(&self) -> Option<OracleSource> {
        OracleSource::from_u8(self.collateral_oracle_source)
    }

    fn validate(&self, precision: &Precision) -> std::result::Result<(), String> {
        let scale = precision.rate_precision;
        let bounded = [
            ("ltv_ratio", Some(self.ltv_ratio)),
            ("liquidation_threshold", Some(self.liquidation_threshold)),
            ("collateral_ltv_ratio", self.collateral_ltv_ratio),
            (
                "collateral_liquidation_threshold",
                self.collateral_liquidation_threshold,
            ),
            ("p2p_alpha", Some(self.p2p_alpha)),
        ];
        for (field, value) in bounded {
            if let Some(value) = value {
                if value > scale {
                    return Err(format!("{} {} exceeds rate precision {}", field, value, scale));
                }
            }
        }

        for (field, decimals) in [
            ("mint_decimals", self.mint_decimals),
            ("collateral_decimals", self.collateral_decimals),
        ] {
            if decimals as u32 > MAX_TOKEN_DECIMALS {
                return Err(format!("{} {} exceeds {}", field, decimals, MAX_TOKEN_DECIMALS));
            }
        }

        if self.num_trader_slots == 0 || self.num_match_slots == 0 {
            return Err("slot capacities must be non-zero".to_string());
        }
        let largest = self.num_trader_slots.max(self.num_match_slots);
        if largest > MAX_REGION_SLOTS
            || market_account_size(self.num_trader_slots, self.num_match_slots).is_none()
        {
            return Err(format!("slot capacity {} exceeds {}", largest, MAX_REGION_SLOTS));
        }

        if self.oracle_source().is_none() {
            return Err(format!("unknown oracle_source tag {}", self.oracle_source));
        }
        if self.collateral_oracle_source().is_none() {
            return Err(format!(
                "unknown collateral_oracle_source tag {}",
                self.collateral_oracle_source
            ));
        }

        if self.market == self.collateral_market {
            return Err("market and collateral_market must differ".to_string());
        }

        Ok(())
    }
}

/// Top-level settings document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub precision: Precision,

    #[serde(default)]
    pub markets: Vec<MarketConfig>,
}

impl Settings {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)
            .map_err(|e| MarketError::Config(format!("failed to parse settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate a TOML settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            MarketError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check precision constants and every market entry.
    pub fn validate(&self) -> Result<()> {
        self.precision.validate().map_err(MarketError::Config)?;

        for (i, market) in self.markets.iter().enumerate() {
            market
                .validate(&self.precision)
                .map_err(|e| MarketError::Config(format!("markets[{}]: {}", i, e)))?;
        }

        for (i, market) in self.markets.iter().enumerate() {
            if self.markets[..i].iter().any(|m| m.market == market.market) {
                return Err(MarketError::Config(format!(
                    "markets[{}]: duplicate market {}",
                    i, market.market
                )));
            }
        }

        Ok(())
    }

    /// Look up a market by account identity.
    pub fn market(&self, market: &Pubkey) -> Option<&MarketConfig> {
        self.markets.iter().find(|m| &m.market == market)
    }

    /// Look up a market by its label.
    pub fn market_by_name(&self, name: &str) -> Option<&MarketConfig> {
        self.markets.iter().find(|m| m.name == name)
    }
}
