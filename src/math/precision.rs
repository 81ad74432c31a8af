//! Precision constants and fixed-point helpers.
//!
//! ## Overview
//!
//! Prices are integers scaled by `price_precision`; rates, LTV ratios and
//! blend weights are integers scaled by `rate_precision`. Both come from the
//! lending program's published constants and are passed around in a
//! [`Precision`] value rather than read from globals.
//!
//! Token amounts are integers in the token's base units (`10^decimals` per
//! whole token). Conversions to human-readable amounts go through
//! `rust_decimal` so no floating point is ever involved.
//!
//! ## Examples
//!
//! ```
//! use paystream_market::math::precision::{parse_ui_amount, ui_amount};
//!
//! // 1.5 tokens of a 6-decimal mint
//! assert_eq!(parse_ui_amount("1.5", 6), Some(1_500_000));
//! assert_eq!(ui_amount(1_500_000, 6).unwrap().to_string(), "1.500000");
//! ```

use std::str::FromStr;

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::MathError;

/// Default price scale: 10^6
pub const DEFAULT_PRICE_PRECISION: u64 = 1_000_000;

/// Default rate scale: 10^4 (basis points)
pub const DEFAULT_RATE_PRECISION: u64 = 10_000;

/// 365 days
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// USD values are displayed in cents
pub const USD_DISPLAY_DECIMALS: u32 = 2;

/// Largest decimal count a token may declare here (rust_decimal max scale)
pub const MAX_TOKEN_DECIMALS: u32 = 28;

/// Scale factors shared by every financial formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Precision {
    /// Scale of every price (`1.0` == `price_precision`)
    pub price_precision: u64,

    /// Scale of rates, LTV ratios and blend weights (`100%` == `rate_precision`)
    pub rate_precision: u64,

    /// Divisor turning annual rates into per-second accrual
    pub seconds_per_year: u64,

    /// Decimals of USD display values
    pub usd_display_decimals: u32,
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            price_precision: DEFAULT_PRICE_PRECISION,
            rate_precision: DEFAULT_RATE_PRECISION,
            seconds_per_year: SECONDS_PER_YEAR,
            usd_display_decimals: USD_DISPLAY_DECIMALS,
        }
    }
}

impl Precision {
    /// Check that both scales are non-zero powers of ten.
    pub fn validate(&self) -> Result<(), String> {
        if !is_power_of_ten(self.price_precision) {
            return Err(format!(
                "price_precision {} is not a power of ten",
                self.price_precision
            ));
        }
        if !is_power_of_ten(self.rate_precision) {
            return Err(format!(
                "rate_precision {} is not a power of ten",
                self.rate_precision
            ));
        }
        if self.seconds_per_year == 0 {
            return Err("seconds_per_year must be non-zero".to_string());
        }
        if self.usd_display_decimals > MAX_TOKEN_DECIMALS {
            return Err(format!(
                "usd_display_decimals {} exceeds {}",
                self.usd_display_decimals, MAX_TOKEN_DECIMALS
            ));
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn price_scale(&self) -> u128 {
        self.price_precision as u128
    }

    #[inline]
    pub(crate) fn rate_scale(&self) -> u128 {
        self.rate_precision as u128
    }
}

fn is_power_of_ten(mut value: u64) -> bool {
    if value == 0 {
        return false;
    }
    while value % 10 == 0 {
        value /= 10;
    }
    value == 1
}

// ============================================================================
// Checked integer helpers
// ============================================================================

/// `10^exp` as u128
pub fn pow10(exp: u32) -> Result<u128, MathError> {
    10u128.checked_pow(exp).ok_or(MathError::Overflow("pow10"))
}

/// Scale factor between two decimal counts: `10^|a - b|`
pub fn decimal_adjustment(a: u8, b: u8) -> Result<u128, MathError> {
    pow10(a.abs_diff(b) as u32)
}

#[inline]
pub(crate) fn checked_mul(a: u128, b: u128, context: &'static str) -> Result<u128, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow(context))
}

#[inline]
pub(crate) fn checked_div(a: u128, b: u128, context: &'static str) -> Result<u128, MathError> {
    a.checked_div(b).ok_or(MathError::ZeroDenominator(context))
}

/// Ceiling division for non-negative operands
#[inline]
pub(crate) fn checked_div_ceil(a: u128, b: u128, context: &'static str) -> Result<u128, MathError> {
    if b == 0 {
        return Err(MathError::ZeroDenominator(context));
    }
    Ok(a / b + u128::from(a % b != 0))
}

/// Narrow a u128 intermediate back to a u64 amount
#[inline]
pub(crate) fn narrow(value: u128, context: &'static str) -> Result<u64, MathError> {
    u64::try_from(value).map_err(|_| MathError::Overflow(context))
}

// ============================================================================
// UI conversions
// ============================================================================

/// Convert base units to a whole-token decimal with `decimals` places.
pub fn ui_amount(amount: u64, decimals: u8) -> Result<Decimal, MathError> {
    scaled_to_decimal(amount as u128, decimals as u32)
}

/// Interpret `value` as an integer carrying `scale` implied decimals.
pub fn scaled_to_decimal(value: u128, scale: u32) -> Result<Decimal, MathError> {
    let signed = i128::try_from(value).map_err(|_| MathError::Overflow("decimal conversion"))?;
    Decimal::try_from_i128_with_scale(signed, scale)
        .map_err(|_| MathError::Overflow("decimal conversion"))
}

/// Parse a whole-token decimal string into base units.
///
/// Digits beyond `decimals` places are truncated, never rounded up.
/// Returns `None` for negative, malformed or out-of-range input.
pub fn parse_ui_amount(s: &str, decimals: u8) -> Option<u64> {
    let decimal = Decimal::from_str(s).ok()?;
    if decimal.is_sign_negative() {
        return None;
    }
    let factor = Decimal::from_u128(pow10(decimals as u32).ok()?)?;
    decimal.checked_mul(factor)?.trunc().to_u64()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_precision() {
        let precision = Precision::default();
        assert_eq!(precision.price_precision, 1_000_000);
        assert_eq!(precision.rate_precision, 10_000);
        assert_eq!(precision.seconds_per_year, 31_536_000);
        assert!(precision.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_power_of_ten() {
        let precision = Precision {
            rate_precision: 5_000,
            ..Default::default()
        };
        assert!(precision.validate().is_err());

        let precision = Precision {
            price_precision: 0,
            ..Default::default()
        };
        assert!(precision.validate().is_err());
    }

    #[test]
    fn test_pow10_and_adjustment() {
        assert_eq!(pow10(0).unwrap(), 1);
        assert_eq!(pow10(9).unwrap(), 1_000_000_000);
        assert!(pow10(39).is_err());
        assert_eq!(decimal_adjustment(9, 6).unwrap(), 1_000);
        assert_eq!(decimal_adjustment(6, 9).unwrap(), 1_000);
    }

    #[test]
    fn test_div_ceil() {
        assert_eq!(checked_div_ceil(10, 5, "t").unwrap(), 2);
        assert_eq!(checked_div_ceil(11, 5, "t").unwrap(), 3);
        assert_eq!(checked_div_ceil(0, 5, "t").unwrap(), 0);
        assert_eq!(checked_div_ceil(1, 0, "t"), Err(MathError::ZeroDenominator("t")));
    }

    #[test]
    fn test_narrow() {
        assert_eq!(narrow(u64::MAX as u128, "t").unwrap(), u64::MAX);
        assert_eq!(narrow(u64::MAX as u128 + 1, "t"), Err(MathError::Overflow("t")));
    }

    #[test]
    fn test_ui_amount() {
        assert_eq!(ui_amount(1_500_000, 6).unwrap().to_string(), "1.500000");
        assert_eq!(ui_amount(1, 9).unwrap().to_string(), "0.000000001");
        assert_eq!(ui_amount(42, 0).unwrap().to_string(), "42");
    }

    #[test]
    fn test_parse_ui_amount() {
        assert_eq!(parse_ui_amount("1.5", 6), Some(1_500_000));
        assert_eq!(parse_ui_amount("0.000000001", 9), Some(1));
        assert_eq!(parse_ui_amount("0.0000019", 6), Some(1));
        assert_eq!(parse_ui_amount("-1", 6), None);
        assert_eq!(parse_ui_amount("abc", 6), None);
    }
}
