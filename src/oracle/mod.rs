//! Oracle collaborators.
//!
//! The crate never talks to a network itself. Callers supply an
//! [`OracleClient`] per market; the loader awaits them alongside the account
//! fetches. Feed readings are normalised by [`normalize_feed_price`] before
//! they reach any financial formula.

mod normalize;

pub use normalize::{
    convert_feed_value, normalize_feed_price, stable_coin_price, FeedPrice, OraclePriceData,
    OracleSource, STABLE_COIN_SNAP_BAND,
};

use async_trait::async_trait;

use crate::error::{MarketError, MathError};
use crate::math::Precision;

/// Asynchronous source of a normalised price.
#[async_trait]
pub trait OracleClient: Send + Sync {
    /// Current price of one whole token in `price_precision` units.
    ///
    /// Implementations must reject a zero price with
    /// [`MathError::ZeroPrice`] rather than return it.
    async fn price_data(&self) -> Result<OraclePriceData, MarketError>;
}

/// Oracle for the quote asset itself; always exactly 1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteAssetClient {
    precision: Precision,
}

impl QuoteAssetClient {
    pub fn new(precision: Precision) -> Self {
        Self { precision }
    }
}

#[async_trait]
impl OracleClient for QuoteAssetClient {
    async fn price_data(&self) -> Result<OraclePriceData, MarketError> {
        Ok(OraclePriceData::quote(&self.precision))
    }
}

/// Oracle returning a fixed reading, normalised once at construction.
#[derive(Debug, Clone, Copy)]
pub struct FixedFeedClient {
    data: OraclePriceData,
}

impl FixedFeedClient {
    /// Normalise `feed` for `source`.
    pub fn new(
        feed: FeedPrice,
        source: OracleSource,
        precision: &Precision,
    ) -> Result<Self, MathError> {
        Ok(Self {
            data: normalize_feed_price(&feed, source, precision)?,
        })
    }

    /// Wrap an already normalised price.
    pub fn from_price(price: u64) -> Result<Self, MathError> {
        if price == 0 {
            return Err(MathError::ZeroPrice);
        }
        Ok(Self {
            data: OraclePriceData {
                price,
                confidence: 0,
                slot: 0,
                has_sufficient_data_points: true,
            },
        })
    }
}

#[async_trait]
impl OracleClient for FixedFeedClient {
    async fn price_data(&self) -> Result<OraclePriceData, MarketError> {
        Ok(self.data)
    }
}
