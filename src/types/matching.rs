//! Match records for the match allocator region.

use ssz_rs::prelude::*;

use crate::types::codec::FixedCodec;

/// Single-field match id wrapper as stored in the match tree key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, SimpleSerialize)]
pub struct MatchIdKey {
    pub match_id: u64,
}

impl MatchIdKey {
    /// Key transform used when projecting matches: unwrap to the bare id
    pub fn into_id(self) -> u64 {
        self.match_id
    }
}

impl FixedCodec for MatchIdKey {
    const SIZE: usize = 8;
    const NAME: &'static str = "MatchIdKey";
}

/// A P2P pairing of one lender and one borrower.
///
/// Traders are referenced by their 1-based slot number in the trader
/// region, not by identity; resolve through
/// [`MarketSnapshot::trader_at`](crate::market::MarketSnapshot::trader_at).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, SimpleSerialize)]
pub struct MatchRecord {
    /// 1-based trader slot of the lender
    pub lender_index: u64,

    /// 1-based trader slot of the borrower
    pub borrower_index: u64,

    /// Principal currently lent through this match
    pub amount_in_p2p: u64,

    /// Principal at the time of matching
    pub original_amount: u64,

    /// Unix seconds
    pub match_timestamp: u64,

    /// Unix seconds of the last interest settlement
    pub last_interest_payment_timestamp: u64,

    pub total_interest_paid: u64,
}

impl MatchRecord {
    /// Principal already repaid
    pub fn repaid_amount(&self) -> u64 {
        self.original_amount.saturating_sub(self.amount_in_p2p)
    }

    /// Seconds since the last interest settlement, zero if `now` is earlier
    pub fn seconds_since_interest_payment(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_interest_payment_timestamp)
    }
}

impl FixedCodec for MatchRecord {
    const SIZE: usize = 56;
    const NAME: &'static str = "MatchRecord";
}
