//! Interest rate blending and accrual.

use crate::error::MathError;
use crate::math::precision::{checked_mul, narrow, Precision};

/// P2P rate as a weighted average of the vault borrow and supply rates:
/// `α × borrow + (R − α) × supply`, over `R`.
///
/// Both weighted terms are summed before the single floor division, so the
/// result always lies between the two input rates.
///
/// # Errors
///
/// [`MathError::OutOfDomain`] if `alpha > rate_precision`.
///
/// # Example
///
/// ```
/// use paystream_market::math::{blended_interest_rate, Precision};
///
/// // 50/50 blend of 8% and 4% (basis points)
/// let rate = blended_interest_rate(800, 400, 5_000, &Precision::default());
/// assert_eq!(rate, Ok(600));
/// ```
pub fn blended_interest_rate(
    borrow_rate: u64,
    supply_rate: u64,
    alpha: u64,
    precision: &Precision,
) -> Result<u64, MathError> {
    const CTX: &str = "blended_interest_rate";
    let scale = precision.rate_scale();
    if scale == 0 {
        return Err(MathError::ZeroDenominator("rate_precision"));
    }
    let alpha = alpha as u128;
    if alpha > scale {
        return Err(MathError::OutOfDomain {
            name: "alpha",
            value: alpha,
            bound: scale,
        });
    }

    let borrow_component = checked_mul(borrow_rate as u128, alpha, CTX)?;
    let supply_component = checked_mul(supply_rate as u128, scale - alpha, CTX)?;
    let total = borrow_component
        .checked_add(supply_component)
        .ok_or(MathError::Overflow(CTX))?;

    narrow(total / scale, CTX)
}

/// Simple interest on `principal` at an annual `rate` over
/// `elapsed_seconds`:
/// `principal × rate × elapsed / (seconds_per_year × R)`.
///
/// All multiplications happen first and the result is floored once.
///
/// # Example
///
/// ```
/// use paystream_market::math::{accrued_interest, Precision};
///
/// let precision = Precision::default();
/// // 5% for a full year on 1,000,000 base units
/// let interest = accrued_interest(1_000_000, 500, precision.seconds_per_year, &precision);
/// assert_eq!(interest, Ok(50_000));
/// ```
pub fn accrued_interest(
    principal: u64,
    rate: u64,
    elapsed_seconds: u64,
    precision: &Precision,
) -> Result<u64, MathError> {
    const CTX: &str = "accrued_interest";
    let numerator = checked_mul(principal as u128, rate as u128, CTX)?;
    let numerator = checked_mul(numerator, elapsed_seconds as u128, CTX)?;
    let denominator = checked_mul(precision.seconds_per_year as u128, precision.rate_scale(), CTX)?;
    if denominator == 0 {
        return Err(MathError::ZeroDenominator("seconds_per_year × rate_precision"));
    }

    narrow(numerator / denominator, CTX)
}

// ============================================================================
// Unit Tests
// ============================================================================
