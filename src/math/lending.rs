//! Borrow capacity, collateral sizing and liquidation math.
//!
//! Prices here are cross prices: the value of one whole collateral token
//! expressed in whole borrow tokens, scaled by `price_precision`. Amounts
//! are base units of their own mint; whenever the two mints differ in
//! decimals the difference is applied as a single `10^Δ` factor.
//!
//! All products are formed in u128 before any division. Results are
//! floored unless stated otherwise.

use crate::error::MathError;
use crate::math::precision::{
    checked_div, checked_div_ceil, checked_mul, decimal_adjustment, narrow, Precision,
};

/// Largest borrow (borrow-mint base units) that `collateral` supports at
/// `ltv_ratio`.
///
/// `collateral × price × ltv / R`, then divided by the price scale and
/// shifted from collateral decimals to borrow decimals.
///
/// # Errors
///
/// * [`MathError::ZeroPrice`] for a zero price
/// * [`MathError::Overflow`] if an intermediate exceeds 128 bits or the
///   result exceeds 64 bits
///
/// # Example
///
/// ```
/// use paystream_market::math::{max_borrow_amount, Precision};
///
/// // 100 collateral tokens (6 decimals) at 1.0, 80% LTV, 6-decimal borrow mint
/// let max = max_borrow_amount(100_000_000, 1_000_000, 6, 6, 8_000, &Precision::default());
/// assert_eq!(max, Ok(80_000_000));
/// ```
pub fn max_borrow_amount(
    collateral: u64,
    collateral_price_in_borrow: u64,
    collateral_decimals: u8,
    borrow_decimals: u8,
    ltv_ratio: u64,
    precision: &Precision,
) -> Result<u64, MathError> {
    if collateral_price_in_borrow == 0 {
        return Err(MathError::ZeroPrice);
    }
    const CTX: &str = "max_borrow_amount";
    let adjustment = decimal_adjustment(collateral_decimals, borrow_decimals)?;

    let value = checked_mul(collateral as u128, collateral_price_in_borrow as u128, CTX)?;
    let value = checked_mul(value, ltv_ratio as u128, CTX)?;
    let value = checked_div(value, precision.rate_scale(), "rate_precision")?;

    let max_borrow = if collateral_decimals >= borrow_decimals {
        let value = checked_div(value, precision.price_scale(), "price_precision")?;
        value / adjustment
    } else {
        let value = checked_mul(value, adjustment, CTX)?;
        checked_div(value, precision.price_scale(), "price_precision")?
    };

    narrow(max_borrow, CTX)
}

/// Smallest collateral (collateral-mint base units) whose
/// [`max_borrow_amount`] at the same price and LTV covers `borrow_amount`.
///
/// Computed as one ceiling division so that sizing never under-shoots:
/// `max_borrow_amount(required_collateral(b)) >= b`, and one base unit less
/// would fall short.
///
/// # Errors
///
/// * [`MathError::ZeroPrice`] for a zero price
/// * [`MathError::ZeroDenominator`] for a zero LTV ratio
/// * [`MathError::Overflow`] as for [`max_borrow_amount`]
pub fn required_collateral(
    borrow_amount: u64,
    collateral_price_in_borrow: u64,
    borrow_decimals: u8,
    collateral_decimals: u8,
    ltv_ratio: u64,
    precision: &Precision,
) -> Result<u64, MathError> {
    if collateral_price_in_borrow == 0 {
        return Err(MathError::ZeroPrice);
    }
    if ltv_ratio == 0 {
        return Err(MathError::ZeroDenominator("ltv_ratio"));
    }
    const CTX: &str = "required_collateral";
    let adjustment = decimal_adjustment(collateral_decimals, borrow_decimals)?;

    // Value (before the final price/LTV division) that the floored
    // `collateral × price × ltv / R` term must reach.
    let target = checked_mul(borrow_amount as u128, precision.price_scale(), CTX)?;
    let target = if collateral_decimals >= borrow_decimals {
        checked_mul(target, adjustment, CTX)?
    } else {
        checked_div_ceil(target, adjustment, CTX)?
    };
    let numerator = checked_mul(target, precision.rate_scale(), CTX)?;
    let denominator = checked_mul(collateral_price_in_borrow as u128, ltv_ratio as u128, CTX)?;

    narrow(checked_div_ceil(numerator, denominator, CTX)?, CTX)
}

/// Collateral (collateral-mint base units) worth `borrowed_amount` at
/// `collateral_price_in_borrow`, with no LTV haircut.
pub fn liquidation_amount(
    borrowed_amount: u64,
    collateral_price_in_borrow: u64,
    borrowed_decimals: u8,
    collateral_decimals: u8,
    precision: &Precision,
) -> Result<u64, MathError> {
    if collateral_price_in_borrow == 0 {
        return Err(MathError::ZeroPrice);
    }
    const CTX: &str = "liquidation_amount";
    let adjustment = decimal_adjustment(borrowed_decimals, collateral_decimals)?;

    let value = checked_mul(borrowed_amount as u128, precision.price_scale(), CTX)?;
    let value = value / collateral_price_in_borrow as u128;
    let amount = if borrowed_decimals >= collateral_decimals {
        value / adjustment
    } else {
        checked_mul(value, adjustment, CTX)?
    };

    narrow(amount, CTX)
}

/// Borrow capacity left after `borrowed`, zero when already at or over
/// the limit.
pub fn remaining_borrow_capacity(max_borrow: u64, borrowed: u64) -> u64 {
    max_borrow.saturating_sub(borrowed)
}

/// Price of one collateral token in borrow tokens, from two USD prices.
pub fn collateral_price_in_borrow_mint(
    borrow_price_usd: u64,
    collateral_price_usd: u64,
    precision: &Precision,
) -> Result<u64, MathError> {
    cross_price(collateral_price_usd, borrow_price_usd, precision)
}

/// Price of one borrow token in collateral tokens, from two USD prices.
pub fn borrow_price_in_collateral_mint(
    borrow_price_usd: u64,
    collateral_price_usd: u64,
    precision: &Precision,
) -> Result<u64, MathError> {
    cross_price(borrow_price_usd, collateral_price_usd, precision)
}

fn cross_price(base_usd: u64, quote_usd: u64, precision: &Precision) -> Result<u64, MathError> {
    if base_usd == 0 || quote_usd == 0 {
        return Err(MathError::ZeroPrice);
    }
    let scaled = checked_mul(base_usd as u128, precision.price_scale(), "cross_price")?;
    narrow(scaled / quote_usd as u128, "cross_price")
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PRICE_ONE: u64 = 1_000_000;

    fn precision() -> Precision {
        Precision::default()
    }

    #[test]
    fn test_max_borrow_same_decimals() {
        // 100 units at 6 decimals, price 1.0, 80% LTV -> 80 units
        let max = max_borrow_amount(100_000_000, PRICE_ONE, 6, 6, 8_000, &precision()).unwrap();
        assert_eq!(max, 80_000_000);
    }

    #[test]
    fn test_max_borrow_collateral_more_decimals() {
        // 1 SOL (9 decimals) at 150 USDC, 50% LTV -> 75 USDC (6 decimals)
        let max =
            max_borrow_amount(1_000_000_000, 150 * PRICE_ONE, 9, 6, 5_000, &precision()).unwrap();
        assert_eq!(max, 75_000_000);
    }

    #[test]
    fn test_max_borrow_collateral_fewer_decimals() {
        // 150 USDC (6 decimals) at 1/150 SOL, 50% LTV -> 0.5 SOL (9 decimals)
        let price = PRICE_ONE / 150; // 6_666, truncated
        let max = max_borrow_amount(150_000_000, price, 6, 9, 5_000, &precision()).unwrap();
        assert_eq!(max, 499_950_000);
    }

    #[test]
    fn test_max_borrow_zero_price() {
        assert_eq!(
            max_borrow_amount(1, 0, 6, 6, 8_000, &precision()),
            Err(MathError::ZeroPrice)
        );
    }

    #[test]
    fn test_max_borrow_overflow() {
        let result = max_borrow_amount(u64::MAX, u64::MAX, 6, 6, u64::MAX, &precision());
        assert_eq!(result, Err(MathError::Overflow("max_borrow_amount")));
    }

    #[test]
    fn test_required_collateral_exact() {
        // Inverse of the 80-unit scenario
        let required =
            required_collateral(80_000_000, PRICE_ONE, 6, 6, 8_000, &precision()).unwrap();
        assert_eq!(required, 100_000_000);
    }

    #[test]
    fn test_required_collateral_rounds_up() {
        // 1 base unit of borrow at 80% LTV needs 1.25 -> 2 units of collateral
        let required = required_collateral(1, PRICE_ONE, 6, 6, 8_000, &precision()).unwrap();
        assert_eq!(required, 2);
        assert!(max_borrow_amount(required, PRICE_ONE, 6, 6, 8_000, &precision()).unwrap() >= 1);
        assert_eq!(max_borrow_amount(1, PRICE_ONE, 6, 6, 8_000, &precision()).unwrap(), 0);
    }

    #[test]
    fn test_required_collateral_zero_ltv() {
        assert_eq!(
            required_collateral(1, PRICE_ONE, 6, 6, 0, &precision()),
            Err(MathError::ZeroDenominator("ltv_ratio"))
        );
    }

    #[test]
    fn test_liquidation_amount() {
        // 75 USDC debt against SOL at 150 -> 0.5 SOL
        let amount = liquidation_amount(75_000_000, 150 * PRICE_ONE, 6, 9, &precision()).unwrap();
        assert_eq!(amount, 500_000_000);

        // Reverse direction: 0.5 SOL debt against USDC priced 1/150 SOL
        let amount = liquidation_amount(500_000_000, PRICE_ONE / 150, 9, 6, &precision()).unwrap();
        assert_eq!(amount, 75_007_500);
    }

    #[test]
    fn test_cross_prices() {
        // USDC at 1.00, SOL at 150.00
        let sol_in_usdc = collateral_price_in_borrow_mint(PRICE_ONE, 150 * PRICE_ONE, &precision());
        assert_eq!(sol_in_usdc, Ok(150 * PRICE_ONE));

        let usdc_in_sol = borrow_price_in_collateral_mint(PRICE_ONE, 150 * PRICE_ONE, &precision());
        assert_eq!(usdc_in_sol, Ok(6_666));

        assert_eq!(
            collateral_price_in_borrow_mint(0, PRICE_ONE, &precision()),
            Err(MathError::ZeroPrice)
        );
    }

    #[test]
    fn test_remaining_capacity() {
        assert_eq!(remaining_borrow_capacity(100, 40), 60);
        assert_eq!(remaining_borrow_capacity(100, 140), 0);
    }

    proptest! {
        #[test]
        fn prop_required_collateral_round_trip(
            borrow in 1u64..1_000_000_000_000,
            price in 1u64..10_000_000_000,
            ltv in 1u64..=10_000,
            borrow_decimals in 0u8..=9,
            collateral_decimals in 0u8..=9,
        ) {
            let precision = Precision::default();
            let collateral = required_collateral(
                borrow, price, borrow_decimals, collateral_decimals, ltv, &precision,
            );
            // Collateral beyond u64 cannot exist on chain
            prop_assume!(collateral.is_ok());
            let collateral = collateral.unwrap();

            let max = max_borrow_amount(
                collateral, price, collateral_decimals, borrow_decimals, ltv, &precision,
            ).unwrap();
            prop_assert!(max >= borrow);

            if collateral > 0 {
                let short = max_borrow_amount(
                    collateral - 1, price, collateral_decimals, borrow_decimals, ltv, &precision,
                ).unwrap();
                prop_assert!(short < borrow);
            }
        }
    }
}
