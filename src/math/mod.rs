//! Fixed-point financial math.
//!
//! ## Design Principles
//!
//! 1. **No Floating Point**: amounts, prices and rates are scaled integers
//! 2. **Wide Intermediates**: products are formed in u128, then narrowed
//! 3. **Explicit Scales**: every function takes a [`Precision`]; nothing is
//!    read from global state
//! 4. **Pure**: no side effects, so a failed call can simply be retried
//!    with refreshed inputs
//!
//! Results match the lending program's own integer formulas so that
//! displayed figures agree with on-chain state.

pub mod interest;
pub mod lending;
pub mod precision;
pub mod valuation;

pub use interest::{accrued_interest, blended_interest_rate};
pub use lending::{
    borrow_price_in_collateral_mint, collateral_price_in_borrow_mint, liquidation_amount,
    max_borrow_amount, remaining_borrow_capacity, required_collateral,
};
pub use precision::{parse_ui_amount, ui_amount, Precision};
pub use valuation::{sum_usd, usd_cents, usd_value};
