//! Market account decoding.
//!
//! ## Account Layout
//!
//! ```text
//! [0, 8)                 match sequence counter (u64 LE)
//! [8, 8 + T)             trader region, T = 32 + N_traders × 96
//! [8 + T, 8 + T + M)     match region,  M = 32 + N_matches × 80
//! ```
//!
//! Each region is a node allocator (see [`crate::allocator`]). Capacities
//! are build constants of the lending program and must be supplied by the
//! caller; the account does not record them.

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::allocator::NodePool;
use crate::error::{CodecError, DecodeError, MarketError, NotFound};
use crate::types::{MatchIdKey, MatchRecord, Pubkey, TraderKey, TraderRecord};

/// Bytes of the sequence counter preceding the trader region
pub const SEQUENCE_BYTES: usize = 8;

/// Trader region allocator
pub type TraderPool = NodePool<TraderKey, TraderRecord>;

/// Match region allocator
pub type MatchPool = NodePool<MatchIdKey, MatchRecord>;

/// SHA-256 of the raw account bytes a snapshot was decoded from.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotDigest([u8; 32]);

impl SnapshotDigest {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for SnapshotDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for SnapshotDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnapshotDigest({})", self.to_hex())
    }
}

/// Decoded state of one market account.
///
/// Immutable; a refresh decodes a new snapshot. Compare [`digest`]s to
/// skip rebuilding views when the account bytes have not changed.
///
/// [`digest`]: MarketSnapshot::digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSnapshot {
    /// Number of matches ever created in this market
    pub sequence_number: u64,

    /// Live traders by identity
    pub traders: BTreeMap<Pubkey, TraderRecord>,

    /// Live matches by id
    pub matches: BTreeMap<u64, MatchRecord>,

    /// 1-based trader slot number -> identity, live slots only
    pub trader_index: BTreeMap<u32, Pubkey>,

    digest: SnapshotDigest,
}

impl MarketSnapshot {
    pub fn digest(&self) -> SnapshotDigest {
        self.digest
    }

    /// Record of the trader with `identity`.
    pub fn trader(&self, identity: &Pubkey) -> Result<&TraderRecord, NotFound> {
        self.traders.get(identity).ok_or_else(|| NotFound {
            what: "trader",
            key: identity.to_string(),
        })
    }

    /// Identity in trader slot `index` (1-based), as referenced by
    /// [`MatchRecord::lender_index`] and [`MatchRecord::borrower_index`].
    pub fn trader_at(&self, index: u64) -> Option<&Pubkey> {
        u32::try_from(index)
            .ok()
            .and_then(|index| self.trader_index.get(&index))
    }

    /// Match with id `match_id`.
    pub fn match_by_id(&self, match_id: u64) -> Result<&MatchRecord, NotFound> {
        self.matches.get(&match_id).ok_or_else(|| NotFound {
            what: "match",
            key: match_id.to_string(),
        })
    }

    /// Matches in which `identity` is the lender or the borrower.
    pub fn matches_of<'a>(
        &'a self,
        identity: &'a Pubkey,
    ) -> impl Iterator<Item = (u64, &'a MatchRecord)> + 'a {
        self.matches.iter().filter_map(move |(&id, record)| {
            let involved = self.trader_at(record.lender_index) == Some(identity)
                || self.trader_at(record.borrower_index) == Some(identity);
            involved.then_some((id, record))
        })
    }
}

/// Byte width of a market account with the given capacities, `None` if
/// that overflows `usize`.
pub fn market_account_size(num_trader_slots: usize, num_match_slots: usize) -> Option<usize> {
    match_region_bounds(num_trader_slots, num_match_slots).map(|(_, end)| end)
}

/// Start and end offsets of the match region.
fn match_region_bounds(num_trader_slots: usize, num_match_slots: usize) -> Option<(usize, usize)> {
    let match_start = SEQUENCE_BYTES.checked_add(TraderPool::region_size(num_trader_slots)?)?;
    let match_end = match_start.checked_add(MatchPool::region_size(num_match_slots)?)?;
    Some((match_start, match_end))
}

/// Decode a market account into a [`MarketSnapshot`].
///
/// # Arguments
///
/// * `buffer` - Raw account bytes
/// * `num_trader_slots` - Trader region capacity
/// * `num_match_slots` - Match region capacity
///
/// # Errors
///
/// * [`MarketError::Decode`] if the buffer is shorter than the layout
///   requires, the capacities describe a layout too large to address, or
///   a region declares more slots than it can hold
/// * [`MarketError::Corruption`] if either free list is malformed
///
/// Either way no partial snapshot is produced.
pub fn decode_market_snapshot(
    buffer: &[u8],
    num_trader_slots: usize,
    num_match_slots: usize,
) -> Result<MarketSnapshot, MarketError> {
    let truncated = |needed: usize| DecodeError::Truncated {
        context: "market account",
        needed,
        available: buffer.len(),
    };
    let (match_start, match_end) = match_region_bounds(num_trader_slots, num_match_slots)
        .ok_or_else(|| truncated(usize::MAX))?;
    let trader_start = SEQUENCE_BYTES;

    // The match region only needs its header plus live slots to be present.
    // Cannot overflow: match_end covers the match header.
    let needed = match_start + crate::allocator::REGION_HEADER_BYTES;
    if buffer.len() < needed {
        return Err(truncated(needed).into());
    }

    let mut sequence = [0u8; SEQUENCE_BYTES];
    sequence.copy_from_slice(&buffer[..SEQUENCE_BYTES]);
    let sequence_number = u64::from_le_bytes(sequence);

    let trader_region = &buffer[trader_start..match_start];
    let match_end = buffer.len().min(match_end);
    let match_region = &buffer[match_start..match_end];

    let trader_pool = TraderPool::decode(trader_region)?;
    let match_pool = MatchPool::decode(match_region)?;
    let trader_bump = trader_pool.bump_index();
    let match_bump = match_pool.bump_index();

    let traders = trader_pool.project(|key: TraderKey| key.identity())?;
    let matches = match_pool.project(MatchIdKey::into_id)?;

    let trader_index = traders
        .slot_keys
        .into_iter()
        .map(|(slot, key)| (slot, key.identity()))
        .collect();

    let snapshot = MarketSnapshot {
        sequence_number,
        traders: traders.entries,
        matches: matches.entries,
        trader_index,
        digest: SnapshotDigest::of(buffer),
    };

    debug!(
        sequence_number,
        trader_bump,
        match_bump,
        live_traders = snapshot.traders.len(),
        live_matches = snapshot.matches.len(),
        digest = %snapshot.digest,
        "decoded market snapshot"
    );

    Ok(snapshot)
}

/// Write a market account from its parts.
///
/// The inverse of [`decode_market_snapshot`] at the byte level; used to
/// build fixtures. Opaque header bytes are zeroed.
pub fn encode_market_account(
    sequence_number: u64,
    traders: &TraderPool,
    matches: &MatchPool,
    num_trader_slots: usize,
    num_match_slots: usize,
) -> Result<Vec<u8>, CodecError> {
    let size = market_account_size(num_trader_slots, num_match_slots).unwrap_or_default();
    let mut buffer = Vec::with_capacity(size);
    buffer.extend_from_slice(&sequence_number.to_le_bytes());
    buffer.extend_from_slice(&traders.encode(num_trader_slots)?);
    buffer.extend_from_slice(&matches.encode(num_match_slots)?);
    Ok(buffer)
}

// ============================================================================
// Trader position
// ============================================================================

/// One trader's balances with the derived availability figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraderPosition {
    pub identity: Pubkey,
    pub on_vault_lends: u64,
    pub in_p2p_lends: u64,
    pub on_vault_borrows: u64,
    pub in_p2p_borrows: u64,
    pub collateral_amount: u64,
    pub is_p2p_enabled: bool,

    /// Vault deposits not pledged as collateral
    pub available_for_lending: u64,

    /// Collateral that can back new borrows
    pub available_collateral: u64,
}

/// Position of `identity` in `snapshot`.
///
/// # Errors
///
/// [`NotFound`] when the trader has no live slot in this market; this is an
/// ordinary outcome, not a data error.
///
/// # Example
///
/// ```
/// use paystream_market::market::{decode_market_snapshot, encode_market_account, project_trader_position};
/// use paystream_market::market::{MatchPool, TraderPool};
/// use paystream_market::allocator::RawSlot;
/// use paystream_market::types::{Pubkey, TraderKey, TraderRecord};
///
/// let alice = Pubkey::new([1u8; 32]);
/// let traders = TraderPool::from_parts(2, vec![RawSlot::new(
///     0,
///     TraderKey::new(alice),
///     TraderRecord { on_vault_lends: 500, collateral_amount: 200, ..Default::default() },
/// )]);
/// let account = encode_market_account(0, &traders, &MatchPool::from_parts(1, vec![]), 4, 4).unwrap();
///
/// let snapshot = decode_market_snapshot(&account, 4, 4).unwrap();
/// let position = project_trader_position(&snapshot, &alice).unwrap();
/// assert_eq!(position.available_for_lending, 300);
///
/// assert!(project_trader_position(&snapshot, &Pubkey::new([2u8; 32])).is_err());
/// ```
pub fn project_trader_position(
    snapshot: &MarketSnapshot,
    identity: &Pubkey,
) -> Result<TraderPosition, NotFound> {
    let record = snapshot.trader(identity)?;
    Ok(TraderPosition {
        identity: *identity,
        on_vault_lends: record.on_vault_lends,
        in_p2p_lends: record.in_p2p_lends,
        on_vault_borrows: record.on_vault_borrows,
        in_p2p_borrows: record.in_p2p_borrows,
        collateral_amount: record.collateral_amount,
        is_p2p_enabled: record.is_p2p_enabled(),
        available_for_lending: record.available_for_lending(),
        available_collateral: record.collateral_amount,
    })
}

// ============================================================================
// Unit Tests
// ============================================================================
