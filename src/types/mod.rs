//! Core data types for Paystream market accounts
//!
//! All on-chain records derive SSZ `SimpleSerialize`: fixed-size SSZ
//! containers are plain concatenated little-endian fields, matching the
//! lending program's account layout byte for byte.
//!
//! ## Types
//!
//! - [`Pubkey`]: 32-byte account identity
//! - [`TraderKey`] / [`TraderRecord`]: trader region key and value
//! - [`MatchIdKey`] / [`MatchRecord`]: match region key and value
//! - [`FixedCodec`]: fixed-width encode/decode used by the slot decoder

mod codec;
mod matching;
mod pubkey;
mod trader;

pub use codec::FixedCodec;
pub use matching::{MatchIdKey, MatchRecord};
pub use pubkey::{ParsePubkeyError, Pubkey, PUBKEY_BYTES};
pub use trader::{TraderKey, TraderRecord, FLAG_P2P_ENABLED};
