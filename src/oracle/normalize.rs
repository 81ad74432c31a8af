//! Feed price normalisation.
//!
//! Oracle feeds publish `(price, confidence, exponent)` with a feed-specific
//! exponent, sometimes for a multiple of the asset (1K or 1M units). Every
//! downstream formula expects one whole token priced at `price_precision`,
//! so feed values are converted here before anything else sees them.

use std::fmt;

use crate::error::MathError;
use crate::math::precision::{checked_mul, narrow, pow10, Precision};

/// Stable-coin prices within this many price units of 1.0 snap to 1.0
/// (5 bps at the default price precision)
pub const STABLE_COIN_SNAP_BAND: u64 = 500;

/// Oracle kind as stored in the market header (`u8` tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleSource {
    Pyth,
    QuoteAsset,
    Pyth1K,
    Pyth1M,
    PythStableCoin,
    PythPull,
    Pyth1KPull,
    Pyth1MPull,
    PythStableCoinPull,
    PythLazer,
    PythLazer1K,
    PythLazer1M,
    PythLazerStableCoin,
}

impl OracleSource {
    /// Parse the on-chain tag. Sources this crate cannot price return `None`.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Pyth),
            2 => Some(Self::QuoteAsset),
            3 => Some(Self::Pyth1K),
            4 => Some(Self::Pyth1M),
            5 => Some(Self::PythStableCoin),
            7 => Some(Self::PythPull),
            8 => Some(Self::Pyth1KPull),
            9 => Some(Self::Pyth1MPull),
            10 => Some(Self::PythStableCoinPull),
            12 => Some(Self::PythLazer),
            13 => Some(Self::PythLazer1K),
            14 => Some(Self::PythLazer1M),
            15 => Some(Self::PythLazerStableCoin),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Pyth => 0,
            Self::QuoteAsset => 2,
            Self::Pyth1K => 3,
            Self::Pyth1M => 4,
            Self::PythStableCoin => 5,
            Self::PythPull => 7,
            Self::Pyth1KPull => 8,
            Self::Pyth1MPull => 9,
            Self::PythStableCoinPull => 10,
            Self::PythLazer => 12,
            Self::PythLazer1K => 13,
            Self::PythLazer1M => 14,
            Self::PythLazerStableCoin => 15,
        }
    }

    /// Units of the asset one feed price refers to
    pub fn multiple(self) -> u64 {
        match self {
            Self::Pyth1K | Self::Pyth1KPull | Self::PythLazer1K => 1_000,
            Self::Pyth1M | Self::Pyth1MPull | Self::PythLazer1M => 1_000_000,
            _ => 1,
        }
    }

    pub fn is_stable_coin(self) -> bool {
        matches!(
            self,
            Self::PythStableCoin | Self::PythStableCoinPull | Self::PythLazerStableCoin
        )
    }

    /// Lazer feeds publish a confidence of zero without the reading being stale
    pub fn is_lazer(self) -> bool {
        matches!(
            self,
            Self::PythLazer | Self::PythLazer1K | Self::PythLazer1M | Self::PythLazerStableCoin
        )
    }
}

impl fmt::Display for OracleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A raw feed reading before normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedPrice {
    /// Integer price mantissa
    pub price: i64,
    /// Integer confidence mantissa, same exponent as `price`
    pub confidence: u64,
    /// Decimal exponent; the real price is `price × 10^exponent`
    pub exponent: i32,
    /// Number of publishers contributing to the aggregate
    pub publishers: u32,
    pub slot: u64,
}

/// A normalised price: one whole token in `price_precision` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OraclePriceData {
    pub price: u64,
    pub confidence: u64,
    pub slot: u64,
    pub has_sufficient_data_points: bool,
}

impl OraclePriceData {
    /// Price of the quote asset: exactly 1.0
    pub fn quote(precision: &Precision) -> Self {
        Self {
            price: precision.price_precision,
            confidence: 1,
            slot: 0,
            has_sufficient_data_points: true,
        }
    }
}

/// Convert a feed mantissa to `price_precision` units for `multiple` asset
/// units per feed price: `mantissa × P × multiple / 10^|exponent|`.
pub fn convert_feed_value(
    mantissa: u64,
    exponent: i32,
    multiple: u64,
    precision: &Precision,
) -> Result<u64, MathError> {
    const CTX: &str = "convert_feed_value";
    let value = checked_mul(mantissa as u128, precision.price_scale(), CTX)?;
    let value = checked_mul(value, multiple as u128, CTX)?;
    narrow(value / pow10(exponent.unsigned_abs())?, CTX)
}

/// Snap a stable-coin price to exactly 1.0 when it sits within
/// `min(confidence, STABLE_COIN_SNAP_BAND)` of it.
pub fn stable_coin_price(price: u64, confidence: u64, precision: &Precision) -> u64 {
    let one = precision.price_precision;
    if price.abs_diff(one) < confidence.min(STABLE_COIN_SNAP_BAND) {
        one
    } else {
        price
    }
}

/// Normalise a feed reading for `source`.
///
/// # Errors
///
/// * [`MathError::ZeroPrice`] when the feed price is zero or negative, or
///   converts to zero at the configured precision
/// * [`MathError::ZeroConfidence`] when a non-Lazer feed reports no
///   confidence interval
pub fn normalize_feed_price(
    feed: &FeedPrice,
    source: OracleSource,
    precision: &Precision,
) -> Result<OraclePriceData, MathError> {
    if source == OracleSource::QuoteAsset {
        return Ok(OraclePriceData::quote(precision));
    }
    let mantissa = u64::try_from(feed.price)
        .ok()
        .filter(|&p| p > 0)
        .ok_or(MathError::ZeroPrice)?;
    if feed.confidence == 0 && !source.is_lazer() {
        return Err(MathError::ZeroConfidence);
    }

    let multiple = source.multiple();
    let confidence = convert_feed_value(feed.confidence, feed.exponent, multiple, precision)?;
    let mut price = convert_feed_value(mantissa, feed.exponent, multiple, precision)?;
    if source.is_stable_coin() {
        price = stable_coin_price(price, confidence, precision);
    }
    if price == 0 {
        return Err(MathError::ZeroPrice);
    }

    Ok(OraclePriceData {
        price,
        confidence,
        slot: feed.slot,
        has_sufficient_data_points: feed.publishers > 0,
    })
}
