//! Display-ready market views.
//!
//! ## Overview
//!
//! A [`MarketView`] combines one decoded snapshot with prices and market
//! parameters: per-trader positions with USD values, resolved matches, the
//! most recent activity and market-wide totals. Building a view is pure;
//! callers pass the clock in.
//!
//! ## Roles
//!
//! A trader with any deposit, P2P lend or collateral is a lender; otherwise
//! a trader with any debt is a borrower; otherwise idle. Market totals count
//! supply from lenders and debt from borrowers only.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;

use crate::config::{MarketConfig, MarketStatus};
use crate::error::{MarketError, MathError};
use crate::market::health::{trader_health, PositionHealth};
use crate::market::prices::MarketPriceData;
use crate::market::snapshot::{MarketSnapshot, SnapshotDigest};
use crate::math::{accrued_interest, blended_interest_rate, max_borrow_amount, usd_value, Precision};
use crate::types::{MatchRecord, Pubkey, TraderRecord};

/// Entries in [`MarketView::recent_activity`]
pub const RECENT_ACTIVITY_LEN: usize = 10;

/// Utilization is reported in basis points regardless of rate precision
pub const UTILIZATION_SCALE: u128 = 10_000;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// External protocol rates the P2P rate is blended from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolRates {
    /// Borrow APY in rate precision
    pub borrow_rate: u64,
    /// Deposit APY in rate precision
    pub supply_rate: u64,
}

impl ProtocolRates {
    /// P2P mid-rate at blend weight `alpha`.
    pub fn mid_rate(&self, alpha: u64, precision: &Precision) -> Result<u64, MathError> {
        blended_interest_rate(self.borrow_rate, self.supply_rate, alpha, precision)
    }
}

/// Inputs shared by every view of one market.
#[derive(Debug, Clone, Copy)]
pub struct ViewContext<'a> {
    pub config: &'a MarketConfig,
    pub precision: &'a Precision,

    /// Unix seconds
    pub now: u64,

    /// Rates for the P2P mid-rate and interest accrual; omitted figures are
    /// left empty
    pub protocol_rates: Option<ProtocolRates>,
}

// ============================================================================
// View types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraderRole {
    Lender,
    Borrower,
    Idle,
}

impl TraderRole {
    pub fn of(record: &TraderRecord) -> Self {
        if record.is_lender() {
            TraderRole::Lender
        } else if record.is_borrower() {
            TraderRole::Borrower
        } else {
            TraderRole::Idle
        }
    }
}

/// A match participant, resolved through the trader slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraderRef {
    Known(Pubkey),
    /// Slot index with no live trader
    Unknown(u64),
}

impl TraderRef {
    fn resolve(snapshot: &MarketSnapshot, index: u64) -> Self {
        snapshot
            .trader_at(index)
            .map_or(TraderRef::Unknown(index), |identity| TraderRef::Known(*identity))
    }
}

impl fmt::Display for TraderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraderRef::Known(identity) => write!(f, "{}", identity),
            TraderRef::Unknown(index) => write!(f, "unknown-{}", index),
        }
    }
}

/// A base-unit amount with its USD value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Valued {
    pub amount: u64,
    pub usd: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraderPositionView {
    pub identity: Pubkey,
    pub role: TraderRole,
    pub is_p2p_enabled: bool,
    pub on_vault_lends: Valued,
    pub p2p_lends: Valued,
    pub collateral: Valued,
    pub borrow_pending: Valued,
    pub p2p_borrowed: Valued,

    /// Partner-mint borrow this trader's collateral supports
    pub max_borrow: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchView {
    pub id: u64,
    pub lender: TraderRef,
    pub borrower: TraderRef,
    pub amount: Valued,
    pub original_amount: u64,

    /// Unix seconds
    pub timestamp: u64,

    /// Whole days since the match, never negative
    pub duration_days: u64,

    /// Interest owed since the last payment at the P2P rate, when rates
    /// were supplied
    pub accrued_interest: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarketStats {
    pub total_in_p2p: Valued,
    pub total_supply: Valued,
    pub lend_unmatched: Valued,
    pub collateral: Valued,
    pub total_borrowed_p2p: Valued,
    pub borrow_unmatched: Valued,

    /// `borrowed / supply` in basis points, 0 without supply
    pub utilization_bps: u64,

    pub trader_count: usize,
    pub active_trader_count: usize,
}

impl MarketStats {
    /// Unmatched deposits available to new borrowers
    pub fn liquidity_available(&self) -> Valued {
        self.lend_unmatched
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketParams {
    pub ltv_ratio: u64,
    pub liquidation_threshold: u64,
    pub lending_decimals: u8,
    pub collateral_decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketView {
    pub market_id: u64,
    pub lending_market: Pubkey,
    pub collateral_market: Pubkey,
    pub lending_mint: Pubkey,
    pub collateral_mint: Pubkey,
    pub status: MarketStatus,

    /// Matches ever created
    pub total_matches: u64,
    pub digest: SnapshotDigest,

    /// P2P rate in rate precision, when protocol rates were supplied
    pub mid_rate: Option<u64>,

    pub stats: MarketStats,
    pub traders: Vec<TraderPositionView>,
    pub matches: Vec<MatchView>,
    pub recent_activity: Vec<MatchView>,
    pub params: MarketParams,
}

impl MarketView {
    pub fn trader(&self, identity: &Pubkey) -> Option<&TraderPositionView> {
        self.traders.iter().find(|t| &t.identity == identity)
    }
}

/// Views of both markets of a pair plus cross-market health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairView {
    pub lending: MarketView,
    pub collateral: MarketView,

    /// Health of every trader borrowing in the lending market
    pub lending_health: BTreeMap<Pubkey, PositionHealth>,

    /// Health of every trader borrowing in the collateral market
    pub collateral_health: BTreeMap<Pubkey, PositionHealth>,
}

// ============================================================================
// Builders
// ============================================================================

/// Build the view of one market.
///
/// # Arguments
///
/// * `snapshot` - Decoded market account
/// * `prices` - Prices with this market's mint as the lending mint
/// * `ctx` - Market parameters, precision and clock
///
/// # Errors
///
/// [`MathError`] for a zero price, an out-of-range blend weight, or an
/// overflow; no figure is ever replaced by zero.
pub fn build_market_view(
    snapshot: &MarketSnapshot,
    prices: &MarketPriceData,
    ctx: &ViewContext<'_>,
) -> Result<MarketView, MathError> {
    let config = ctx.config;
    let precision = ctx.precision;
    let value = |amount: u64| -> Result<Valued, MathError> {
        Ok(Valued {
            amount,
            usd: usd_value(amount, prices.mint_price_usd, config.mint_decimals, precision)?,
        })
    };

    let mid_rate = ctx
        .protocol_rates
        .map(|rates| rates.mid_rate(config.p2p_alpha, precision))
        .transpose()?;

    let traders = snapshot
        .traders
        .iter()
        .map(|(identity, record)| -> Result<TraderPositionView, MathError> {
            Ok(TraderPositionView {
                identity: *identity,
                role: TraderRole::of(record),
                is_p2p_enabled: record.is_p2p_enabled(),
                on_vault_lends: value(record.on_vault_lends)?,
                p2p_lends: value(record.in_p2p_lends)?,
                collateral: value(record.collateral_amount)?,
                borrow_pending: value(record.on_vault_borrows)?,
                p2p_borrowed: value(record.in_p2p_borrows)?,
                max_borrow: max_borrow_amount(
                    record.collateral_amount,
                    prices.mint_price_in_collateral,
                    config.mint_decimals,
                    config.collateral_decimals,
                    config.ltv_ratio,
                    precision,
                )?,
            })
        })
        .collect::<Result<Vec<_>, MathError>>()?;

    let matches = snapshot
        .matches
        .iter()
        .map(|(&id, record)| -> Result<MatchView, MathError> {
            Ok(MatchView {
                id,
                lender: TraderRef::resolve(snapshot, record.lender_index),
                borrower: TraderRef::resolve(snapshot, record.borrower_index),
                amount: value(record.amount_in_p2p)?,
                original_amount: record.original_amount,
                timestamp: record.match_timestamp,
                duration_days: duration_days(record.match_timestamp, ctx.now),
                accrued_interest: mid_rate
                    .map(|rate| interest_since_payment(record, rate, ctx.now, precision))
                    .transpose()?,
            })
        })
        .collect::<Result<Vec<_>, MathError>>()?;

    let stats = market_stats(&snapshot.traders, &matches, &value)?;

    let mut recent_activity = matches.clone();
    recent_activity.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    recent_activity.truncate(RECENT_ACTIVITY_LEN);

    Ok(MarketView {
        market_id: config.market_id,
        lending_market: config.market,
        collateral_market: config.collateral_market,
        lending_mint: config.mint,
        collateral_mint: config.collateral_mint,
        status: config.status,
        total_matches: snapshot.sequence_number,
        digest: snapshot.digest(),
        mid_rate,
        stats,
        traders,
        matches,
        recent_activity,
        params: MarketParams {
            ltv_ratio: config.ltv_ratio,
            liquidation_threshold: config.liquidation_threshold,
            lending_decimals: config.mint_decimals,
            collateral_decimals: config.collateral_decimals,
        },
    })
}

/// Build views of a market and its collateral partner.
///
/// The collateral market is viewed with mirrored parameters and prices:
/// its mint is the lending mint of its own view. `collateral_rates` feed
/// the collateral market's P2P rate.
pub fn build_pair_view(
    lending: &MarketSnapshot,
    collateral: &MarketSnapshot,
    prices: &MarketPriceData,
    ctx: &ViewContext<'_>,
    collateral_rates: Option<ProtocolRates>,
) -> Result<PairView, MarketError> {
    let partner_config = ctx.config.mirrored();
    let partner_prices = prices.mirrored();
    let partner_ctx = ViewContext {
        config: &partner_config,
        precision: ctx.precision,
        now: ctx.now,
        protocol_rates: collateral_rates,
    };

    let lending_view = build_market_view(lending, prices, ctx)?;
    let collateral_view = build_market_view(collateral, &partner_prices, &partner_ctx)?;

    let lending_health = borrower_health(lending, collateral, prices, ctx)?;
    let collateral_health = borrower_health(collateral, lending, &partner_prices, &partner_ctx)?;

    Ok(PairView {
        lending: lending_view,
        collateral: collateral_view,
        lending_health,
        collateral_health,
    })
}

fn borrower_health(
    borrowing: &MarketSnapshot,
    pledging: &MarketSnapshot,
    prices: &MarketPriceData,
    ctx: &ViewContext<'_>,
) -> Result<BTreeMap<Pubkey, PositionHealth>, MarketError> {
    borrowing
        .traders
        .iter()
        .filter(|(_, record)| record.in_p2p_borrows > 0)
        .map(|(identity, _)| -> Result<(Pubkey, PositionHealth), MarketError> {
            let health = trader_health(borrowing, pledging, identity, prices, ctx.config, ctx.precision)?;
            Ok((*identity, health))
        })
        .collect()
}

/// Whole days from `timestamp` to `now`, zero when `now` is earlier.
pub fn duration_days(timestamp: u64, now: u64) -> u64 {
    now.saturating_sub(timestamp) / SECONDS_PER_DAY
}

fn interest_since_payment(
    record: &MatchRecord,
    rate: u64,
    now: u64,
    precision: &Precision,
) -> Result<u64, MathError> {
    accrued_interest(
        record.amount_in_p2p,
        rate,
        record.seconds_since_interest_payment(now),
        precision,
    )
}

fn market_stats<F>(
    traders: &BTreeMap<Pubkey, TraderRecord>,
    matches: &[MatchView],
    value: &F,
) -> Result<MarketStats, MathError>
where
    F: Fn(u64) -> Result<Valued, MathError>,
{
    const CTX: &str = "market_stats";
    let lenders = || traders.values().filter(|t| TraderRole::of(t) == TraderRole::Lender);
    let borrowers = || traders.values().filter(|t| TraderRole::of(t) == TraderRole::Borrower);

    let total_in_p2p = checked_sum(matches.iter().map(|m| m.amount.amount))?;
    let collateral = checked_sum(lenders().map(|t| t.collateral_amount))?;
    let p2p_lends = checked_sum(lenders().map(|t| t.in_p2p_lends))?;
    let total_supply = collateral.checked_add(p2p_lends).ok_or(MathError::Overflow(CTX))?;
    let lend_unmatched = checked_sum(lenders().map(|t| t.on_vault_lends))?;
    let total_borrowed = checked_sum(borrowers().map(|t| t.in_p2p_borrows))?;
    let borrow_unmatched = checked_sum(borrowers().map(|t| t.on_vault_borrows))?;

    let utilization_bps = if total_supply == 0 {
        0
    } else {
        let scaled = total_borrowed as u128 * UTILIZATION_SCALE;
        u64::try_from(scaled / total_supply as u128).map_err(|_| MathError::Overflow(CTX))?
    };

    Ok(MarketStats {
        total_in_p2p: value(total_in_p2p)?,
        total_supply: value(total_supply)?,
        lend_unmatched: value(lend_unmatched)?,
        collateral: value(collateral)?,
        total_borrowed_p2p: value(total_borrowed)?,
        borrow_unmatched: value(borrow_unmatched)?,
        utilization_bps,
        trader_count: traders.len(),
        active_trader_count: traders
            .values()
            .filter(|t| TraderRole::of(t) != TraderRole::Idle)
            .count(),
    })
}

/// Sum of `amounts`, failing on overflow instead of wrapping.
fn checked_sum(amounts: impl Iterator<Item = u64>) -> Result<u64, MathError> {
    let mut total = 0u64;
    for amount in amounts {
        total = total
            .checked_add(amount)
            .ok_or(MathError::Overflow("market_stats"))?;
    }
    Ok(total)
}

// ============================================================================
// Unit Tests
// ============================================================================
