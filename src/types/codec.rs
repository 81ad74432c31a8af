//! Fixed-width record codecs.
//!
//! Every record stored in an allocator slot has a constant byte width.
//! SSZ encodes fixed-size containers as their fields' little-endian bytes
//! concatenated in declaration order with no length prefixes, which is the
//! same layout the lending program writes, so the records derive
//! `SimpleSerialize` and go through `ssz_rs` for both directions.

use ssz_rs::SimpleSerialize;

use crate::error::CodecError;

/// A record with a constant encoded width.
///
/// `SIZE` must equal the SSZ encoded length of the type; each implementor
/// carries a test asserting that.
pub trait FixedCodec: SimpleSerialize {
    /// Encoded width in bytes
    const SIZE: usize;

    /// Record name used in error messages
    const NAME: &'static str;

    /// Decode exactly `SIZE` bytes.
    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != Self::SIZE {
            return Err(CodecError {
                record: Self::NAME,
                reason: format!("expected {} bytes, got {}", Self::SIZE, bytes.len()),
            });
        }
        ssz_rs::deserialize(bytes).map_err(|err| CodecError {
            record: Self::NAME,
            reason: format!("{err:?}"),
        })
    }

    /// Encode to exactly `SIZE` bytes.
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        ssz_rs::serialize(self).map_err(|err| CodecError {
            record: Self::NAME,
            reason: format!("{err:?}"),
        })
    }
}
