//! Position health across a market pair.
//!
//! A trader borrows the market's mint through P2P matches and backs the
//! debt with collateral pledged in the partner market. Collateral pledged
//! in a market is governed by that market's LTV ratio and liquidation
//! threshold.

use crate::config::MarketConfig;
use crate::error::{MarketError, MathError, NotFound};
use crate::market::prices::MarketPriceData;
use crate::market::snapshot::MarketSnapshot;
use crate::math::lending::{max_borrow_amount, remaining_borrow_capacity};
use crate::math::precision::{checked_div, checked_div_ceil, checked_mul, narrow};
use crate::math::Precision;
use crate::types::Pubkey;

/// Pricing and risk parameters for one borrow/collateral direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthParams {
    /// One whole collateral token in borrow-mint tokens
    pub collateral_price_in_borrow: u64,
    pub borrow_decimals: u8,
    pub collateral_decimals: u8,
    pub ltv_ratio: u64,
    pub liquidation_threshold: u64,
}

impl HealthParams {
    /// Parameters for borrowing `config`'s mint against collateral pledged
    /// in its partner market.
    pub fn for_market(config: &MarketConfig, prices: &MarketPriceData) -> Self {
        let partner = config.mirrored();
        Self {
            collateral_price_in_borrow: prices.collateral_price_in_mint,
            borrow_decimals: config.mint_decimals,
            collateral_decimals: config.collateral_decimals,
            ltv_ratio: partner.ltv_ratio,
            liquidation_threshold: partner.liquidation_threshold,
        }
    }
}

/// Collateral to seize and debt it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liquidation {
    pub debt_repaid: u64,
    pub collateral_seized: u64,
}

/// Health of one borrow position.
///
/// A position without P2P debt is all zeros: no value, capacity or ratio
/// is reported for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionHealth {
    /// P2P debt, borrow-mint base units
    pub borrowed: u64,

    /// Pledged collateral, collateral-mint base units
    pub collateral: u64,

    /// Collateral value in borrow-mint base units, no LTV haircut
    pub collateral_value: u64,

    pub max_borrow: u64,
    pub remaining_capacity: u64,

    /// `borrowed / collateral_value` in rate precision, rounded up; `None`
    /// when there is debt against worthless collateral
    pub ltv: Option<u64>,

    /// LTV of the reverse position: P2P debt in the collateral market
    /// against collateral pledged in the lending market
    pub collateral_ltv: Option<u64>,

    pub exceeds_ltv: bool,
    pub exceeds_liquidation_threshold: bool,

    /// Present when the debt is above the LTV limit
    pub liquidation: Option<Liquidation>,
}

impl PositionHealth {
    fn empty() -> Self {
        Self {
            ltv: Some(0),
            collateral_ltv: Some(0),
            ..Self::default()
        }
    }

    pub fn is_healthy(&self) -> bool {
        !self.exceeds_ltv
    }
}

/// Value of `collateral` in borrow-mint base units, scaled by `ratio`.
fn collateral_value_at(
    collateral: u64,
    ratio: u64,
    params: &HealthParams,
    precision: &Precision,
) -> Result<u64, MathError> {
    max_borrow_amount(
        collateral,
        params.collateral_price_in_borrow,
        params.collateral_decimals,
        params.borrow_decimals,
        ratio,
        precision,
    )
}

/// `borrowed / value` in rate precision, rounded up.
fn ratio_of(borrowed: u64, value: u64, precision: &Precision) -> Result<Option<u64>, MathError> {
    const CTX: &str = "position_ltv";
    match (borrowed, value) {
        (0, _) => Ok(Some(0)),
        (_, 0) => Ok(None),
        (borrowed, value) => {
            let scaled = checked_mul(borrowed as u128, precision.rate_scale(), CTX)?;
            Ok(Some(narrow(checked_div_ceil(scaled, value as u128, CTX)?, CTX)?))
        }
    }
}

/// Loan-to-value of `borrowed` debt against `collateral`, in rate
/// precision and rounded up.
///
/// `Some(0)` without debt; `None` for debt against collateral worth nothing.
pub fn position_ltv(
    borrowed: u64,
    collateral: u64,
    params: &HealthParams,
    precision: &Precision,
) -> Result<Option<u64>, MathError> {
    if borrowed == 0 {
        return Ok(Some(0));
    }
    let value = collateral_value_at(collateral, precision.rate_precision, params, precision)?;
    ratio_of(borrowed, value, precision)
}

/// Assess a position of `borrowed` debt against `collateral`.
///
/// Once the debt is above the LTV limit the whole pledge is liquidated:
/// its unhaircut value settles debt up to the amount borrowed. When the
/// collateral is worth more than the debt, only the share that covers the
/// debt is seized.
///
/// `collateral_ltv` is `Some(0)` here; [`trader_health`] fills it from the
/// partner market.
pub fn assess_position(
    borrowed: u64,
    collateral: u64,
    params: &HealthParams,
    precision: &Precision,
) -> Result<PositionHealth, MathError> {
    const CTX: &str = "assess_position";
    if params.collateral_price_in_borrow == 0 {
        return Err(MathError::ZeroPrice);
    }
    if borrowed == 0 {
        return Ok(PositionHealth::empty());
    }

    let collateral_value =
        collateral_value_at(collateral, precision.rate_precision, params, precision)?;
    let max_borrow = collateral_value_at(collateral, params.ltv_ratio, params, precision)?;
    let ltv = ratio_of(borrowed, collateral_value, precision)?;

    let exceeds_ltv = borrowed > max_borrow;
    let exceeds_liquidation_threshold = ltv.map_or(true, |ltv| ltv > params.liquidation_threshold);

    let liquidation = if exceeds_ltv {
        let collateral_seized = if collateral_value > borrowed {
            let scaled = checked_mul(collateral as u128, borrowed as u128, CTX)?;
            narrow(checked_div(scaled, collateral_value as u128, CTX)?, CTX)?
        } else {
            collateral
        };
        Some(Liquidation {
            debt_repaid: collateral_value.min(borrowed),
            collateral_seized,
        })
    } else {
        None
    };

    Ok(PositionHealth {
        borrowed,
        collateral,
        collateral_value,
        max_borrow,
        remaining_capacity: remaining_borrow_capacity(max_borrow, borrowed),
        ltv,
        collateral_ltv: Some(0),
        exceeds_ltv,
        exceeds_liquidation_threshold,
        liquidation,
    })
}

/// Health of `identity` borrowing in `lending` against collateral pledged
/// in `collateral`.
///
/// The reverse direction, debt in `collateral` against collateral pledged
/// in `lending`, is reported as `collateral_ltv`.
///
/// # Errors
///
/// * [`MarketError::NotFound`] if the trader is in neither market
/// * [`MarketError::Math`] for a zero price or overflow
pub fn trader_health(
    lending: &MarketSnapshot,
    collateral: &MarketSnapshot,
    identity: &Pubkey,
    prices: &MarketPriceData,
    config: &MarketConfig,
    precision: &Precision,
) -> Result<PositionHealth, MarketError> {
    let borrower = lending.traders.get(identity);
    let pledger = collateral.traders.get(identity);
    if borrower.is_none() && pledger.is_none() {
        return Err(NotFound {
            what: "trader",
            key: identity.to_string(),
        }
        .into());
    }

    let borrowed = borrower.map_or(0, |t| t.in_p2p_borrows);
    let pledged = pledger.map_or(0, |t| t.collateral_amount);
    let params = HealthParams::for_market(config, prices);
    let mut health = assess_position(borrowed, pledged, &params, precision)?;
    if borrowed == 0 {
        return Ok(health);
    }

    let reverse = HealthParams::for_market(&config.mirrored(), &prices.mirrored());
    health.collateral_ltv = position_ltv(
        pledger.map_or(0, |t| t.in_p2p_borrows),
        borrower.map_or(0, |t| t.collateral_amount),
        &reverse,
        precision,
    )?;
    Ok(health)
}

// ============================================================================
// Unit Tests
// ============================================================================
