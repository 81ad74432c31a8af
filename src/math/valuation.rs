//! USD valuation of token amounts.

use rust_decimal::Decimal;

use crate::error::MathError;
use crate::math::precision::{checked_div, checked_mul, pow10, scaled_to_decimal, Precision};

/// Value of `amount` base units in USD display units (cents by default).
///
/// `amount × price / price_scale` is the USD value carrying the token's
/// decimals; it is shifted by `10^|token_decimals − display_decimals|` to
/// the display precision. The shift is folded into the single final
/// division, so the result is floored exactly once.
pub fn usd_cents(
    amount: u64,
    price_usd: u64,
    token_decimals: u8,
    precision: &Precision,
) -> Result<u128, MathError> {
    if price_usd == 0 {
        return Err(MathError::ZeroPrice);
    }
    const CTX: &str = "usd_value";
    let value = checked_mul(amount as u128, price_usd as u128, CTX)?;

    let token_decimals = token_decimals as u32;
    let display = precision.usd_display_decimals;
    if token_decimals >= display {
        let divisor = checked_mul(precision.price_scale(), pow10(token_decimals - display)?, CTX)?;
        checked_div(value, divisor, "price_precision")
    } else {
        let value = checked_mul(value, pow10(display - token_decimals)?, CTX)?;
        checked_div(value, precision.price_scale(), "price_precision")
    }
}

/// [`usd_cents`] as a `Decimal` with the display scale applied.
///
/// # Example
///
/// ```
/// use paystream_market::math::{usd_value, Precision};
///
/// // 2.5 tokens (9 decimals) at $150.00
/// let usd = usd_value(2_500_000_000, 150_000_000, 9, &Precision::default()).unwrap();
/// assert_eq!(usd.to_string(), "375.00");
/// ```
pub fn usd_value(
    amount: u64,
    price_usd: u64,
    token_decimals: u8,
    precision: &Precision,
) -> Result<Decimal, MathError> {
    let cents = usd_cents(amount, price_usd, token_decimals, precision)?;
    scaled_to_decimal(cents, precision.usd_display_decimals)
}

/// Sum of USD display values, keeping the display scale.
pub fn sum_usd<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().fold(Decimal::ZERO, |acc, v| acc + v)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_usd_value_six_decimals() {
        // 1,234.567890 USDC at $1.00
        let usd = usd_value(1_234_567_890, 1_000_000, 6, &Precision::default()).unwrap();
        assert_eq!(usd.to_string(), "1234.56");
    }

    #[test]
    fn test_usd_value_fewer_decimals_than_display() {
        // 5 whole units of a 0-decimal token at $3.50
        let usd = usd_value(5, 3_500_000, 0, &Precision::default()).unwrap();
        assert_eq!(usd.to_string(), "17.50");
    }

    #[test]
    fn test_usd_value_zero_price() {
        assert_eq!(
            usd_value(1, 0, 6, &Precision::default()),
            Err(MathError::ZeroPrice)
        );
    }

    #[test]
    fn test_usd_value_zero_amount() {
        let usd = usd_value(0, 1_000_000, 6, &Precision::default()).unwrap();
        assert!(usd.is_zero());
    }

    #[test]
    fn test_sum_usd() {
        let a = usd_value(1_000_000, 1_000_000, 6, &Precision::default()).unwrap();
        let b = usd_value(2_500_000, 1_000_000, 6, &Precision::default()).unwrap();
        assert_eq!(sum_usd([a, b]).to_string(), "3.50");
    }

    proptest! {
        #[test]
        fn prop_decimal_symmetry(
            micro_units in 0u64..1_000_000_000_000,
            price in 1u64..1_000_000_000_000,
        ) {
            // Same real-world amount expressed with 6 and with 9 decimals
            let precision = Precision::default();
            let six = usd_cents(micro_units, price, 6, &precision).unwrap();
            let nine = usd_cents(micro_units * 1_000, price, 9, &precision).unwrap();
            prop_assert_eq!(six, nine);
        }
    }
}
