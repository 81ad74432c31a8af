//! Trader records for the trader allocator region.
//!
//! ## Layout
//!
//! Each trader slot carries a 32-byte identity key followed by a 48-byte
//! state record of six little-endian u64 fields.

use ssz_rs::prelude::*;

use crate::types::codec::FixedCodec;
use crate::types::pubkey::{Pubkey, PUBKEY_BYTES};

/// Bit 0 of `TraderRecord::flags`: trader accepts peer-to-peer matching
pub const FLAG_P2P_ENABLED: u64 = 1;

/// Single-field identity wrapper as stored in the trader tree key.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct TraderKey {
    pub public_key: [u8; 32],
}

impl TraderKey {
    pub fn new(identity: Pubkey) -> Self {
        Self {
            public_key: identity.to_bytes(),
        }
    }

    /// Unwrap to the bare identity
    pub fn identity(&self) -> Pubkey {
        Pubkey::new(self.public_key)
    }
}

impl FixedCodec for TraderKey {
    const SIZE: usize = PUBKEY_BYTES;
    const NAME: &'static str = "TraderKey";
}

/// A trader's balances in one market.
///
/// `collateral_amount` is a sub-account of `on_vault_lends`: lends
/// earmarked as collateral are not additionally counted as P2P lends.
///
/// ## Example
///
/// ```
/// use paystream_market::types::TraderRecord;
///
/// let trader = TraderRecord {
///     on_vault_lends: 1_000_000,
///     collateral_amount: 400_000,
///     flags: 1,
///     ..Default::default()
/// };
/// assert!(trader.is_p2p_enabled());
/// assert!(trader.is_lender());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, SimpleSerialize)]
pub struct TraderRecord {
    /// Deposits sitting in the vault, not yet matched
    pub on_vault_lends: u64,

    /// Deposits currently lent through P2P matches
    pub in_p2p_lends: u64,

    /// Borrow requests served from the vault, not yet matched
    pub on_vault_borrows: u64,

    /// Debt currently owed through P2P matches
    pub in_p2p_borrows: u64,

    /// Portion of the deposits marked as collateral
    pub collateral_amount: u64,

    /// Bitfield; see [`FLAG_P2P_ENABLED`]
    pub flags: u64,
}

impl TraderRecord {
    pub fn is_p2p_enabled(&self) -> bool {
        self.flags & FLAG_P2P_ENABLED != 0
    }

    /// Has anything deposited or pledged
    pub fn is_lender(&self) -> bool {
        self.on_vault_lends > 0 || self.in_p2p_lends > 0 || self.collateral_amount > 0
    }

    /// Has any outstanding debt
    pub fn is_borrower(&self) -> bool {
        self.on_vault_borrows > 0 || self.in_p2p_borrows > 0
    }

    /// Total supplied (vault deposits plus P2P lends)
    pub fn total_supplied(&self) -> u128 {
        self.on_vault_lends as u128 + self.in_p2p_lends as u128
    }

    /// Total owed (vault borrows plus P2P borrows)
    pub fn total_borrowed(&self) -> u128 {
        self.on_vault_borrows as u128 + self.in_p2p_borrows as u128
    }

    /// Vault deposits not pledged as collateral
    pub fn available_for_lending(&self) -> u64 {
        self.on_vault_lends.saturating_sub(self.collateral_amount)
    }
}

impl FixedCodec for TraderRecord {
    const SIZE: usize = 48;
    const NAME: &'static str = "TraderRecord";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trader_record_encoded_size() {
        let bytes = TraderRecord::default().encode().unwrap();
        assert_eq!(bytes.len(), TraderRecord::SIZE);

        let key = TraderKey::new(Pubkey::new([9u8; 32])).encode().unwrap();
        assert_eq!(key.len(), TraderKey::SIZE);
        assert_eq!(key, vec![9u8; 32]);
    }

    #[test]
    fn test_trader_record_field_order() {
        let record = TraderRecord {
            on_vault_lends: 1,
            in_p2p_lends: 2,
            on_vault_borrows: 3,
            in_p2p_borrows: 4,
            collateral_amount: 5,
            flags: 6,
        };
        let bytes = record.encode().unwrap();

        for (i, chunk) in bytes.chunks(8).enumerate() {
            let value = u64::from_le_bytes(chunk.try_into().unwrap());
            assert_eq!(value, i as u64 + 1, "field {} out of place", i);
        }
    }

    #[test]
    fn test_decode_rejects_wrong_width() {
        let err = TraderRecord::decode(&[0u8; 40]).unwrap_err();
        assert_eq!(err.record, "TraderRecord");
    }

    #[test]
    fn test_flags_and_roles() {
        let idle = TraderRecord::default();
        assert!(!idle.is_lender());
        assert!(!idle.is_borrower());
        assert!(!idle.is_p2p_enabled());

        let borrower = TraderRecord {
            in_p2p_borrows: 10,
            flags: FLAG_P2P_ENABLED | 0b100,
            ..Default::default()
        };
        assert!(borrower.is_borrower());
        assert!(borrower.is_p2p_enabled());

        let pledged = TraderRecord {
            on_vault_lends: 100,
            collateral_amount: 30,
            ..Default::default()
        };
        assert_eq!(pledged.available_for_lending(), 70);
    }
}
