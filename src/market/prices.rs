//! Prices of a market pair.

use crate::error::MathError;
use crate::math::{borrow_price_in_collateral_mint, collateral_price_in_borrow_mint, Precision};
use crate::oracle::OraclePriceData;

/// USD and cross prices for one market and its collateral partner, all in
/// `price_precision` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketPriceData {
    /// One whole token of the market's mint, in USD
    pub mint_price_usd: u64,

    /// One whole token of the collateral mint, in USD
    pub collateral_price_usd: u64,

    /// One whole collateral token, in market-mint tokens
    pub collateral_price_in_mint: u64,

    /// One whole market-mint token, in collateral tokens
    pub mint_price_in_collateral: u64,
}

impl MarketPriceData {
    /// Derive both cross prices from two USD prices.
    ///
    /// # Example
    ///
    /// ```
    /// use paystream_market::market::MarketPriceData;
    /// use paystream_market::math::Precision;
    ///
    /// // USDC market with SOL collateral
    /// let prices = MarketPriceData::from_usd_prices(1_000_000, 150_000_000, &Precision::default()).unwrap();
    /// assert_eq!(prices.collateral_price_in_mint, 150_000_000);
    /// assert_eq!(prices.mint_price_in_collateral, 6_666);
    /// ```
    pub fn from_usd_prices(
        mint_price_usd: u64,
        collateral_price_usd: u64,
        precision: &Precision,
    ) -> Result<Self, MathError> {
        Ok(Self {
            mint_price_usd,
            collateral_price_usd,
            collateral_price_in_mint: collateral_price_in_borrow_mint(
                mint_price_usd,
                collateral_price_usd,
                precision,
            )?,
            mint_price_in_collateral: borrow_price_in_collateral_mint(
                mint_price_usd,
                collateral_price_usd,
                precision,
            )?,
        })
    }

    pub fn from_oracle_prices(
        mint: &OraclePriceData,
        collateral: &OraclePriceData,
        precision: &Precision,
    ) -> Result<Self, MathError> {
        Self::from_usd_prices(mint.price, collateral.price, precision)
    }

    /// The same prices seen from the collateral market.
    pub fn mirrored(&self) -> Self {
        Self {
            mint_price_usd: self.collateral_price_usd,
            collateral_price_usd: self.mint_price_usd,
            collateral_price_in_mint: self.mint_price_in_collateral,
            mint_price_in_collateral: self.collateral_price_in_mint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirrored_swaps_sides() {
        let prices =
            MarketPriceData::from_usd_prices(150_000_000, 1_000_000, &Precision::default()).unwrap();
        let mirrored = prices.mirrored();

        assert_eq!(mirrored.mint_price_usd, 1_000_000);
        assert_eq!(mirrored.collateral_price_in_mint, prices.mint_price_in_collateral);
        assert_eq!(mirrored.mirrored(), prices);
    }

    #[test]
    fn test_zero_price_rejected() {
        assert_eq!(
            MarketPriceData::from_usd_prices(0, 1_000_000, &Precision::default()),
            Err(MathError::ZeroPrice)
        );
    }
}
