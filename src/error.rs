//! Error taxonomy for decoding and risk math.
//!
//! ## Categories
//!
//! - [`DecodeError`]: the buffer cannot hold what its header declares
//! - [`CorruptionError`]: the allocator free list is malformed
//! - [`MathError`]: a financial formula was given a zero/invalid denominator
//! - [`NotFound`]: a lookup that legitimately has no answer
//!
//! Decode and corruption failures mean the market must not be rendered.
//! `NotFound` is an ordinary outcome ("no position") and is kept distinct so
//! callers never confuse it with bad data.

use thiserror::Error;

/// A fixed-width record failed to encode or decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{record} codec failed: {reason}")]
pub struct CodecError {
    /// Name of the record type
    pub record: &'static str,
    /// Underlying codec message
    pub reason: String,
}

/// The raw account buffer does not match the layout it declares.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Buffer ended before the declared content
    #[error("buffer truncated: {context} needs {needed} bytes, have {available}")]
    Truncated {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    /// A signed allocator header field was negative
    #[error("allocator header field {field} is negative ({value})")]
    NegativeHeaderField { field: &'static str, value: i32 },

    /// A key or value payload could not be decoded
    #[error(transparent)]
    Record(#[from] CodecError),
}

/// The allocator free list cannot be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorruptionError {
    /// The chain revisited a slot or ran longer than the allocator could hold
    #[error("free list does not terminate: {steps} steps with bump index {bump_index}")]
    Cycle { steps: usize, bump_index: u32 },

    /// A pointer addressed a slot outside the decoded pool
    #[error("free list pointer {pointer} outside decoded pool of {slot_count} slots")]
    PointerOutOfRange { pointer: u32, slot_count: usize },
}

/// A financial calculation was asked to divide by something invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    /// Price was zero; treat as an upstream oracle failure
    #[error("price is zero")]
    ZeroPrice,

    /// Oracle feed reported no confidence interval; the reading is unusable
    #[error("oracle feed reported zero confidence")]
    ZeroConfidence,

    /// A non-price denominator (LTV ratio, precision, supply) was zero
    #[error("zero denominator: {0}")]
    ZeroDenominator(&'static str),

    /// An input lies outside the formula's domain
    #[error("{name} = {value} exceeds {bound}")]
    OutOfDomain {
        name: &'static str,
        value: u128,
        bound: u128,
    },

    /// Intermediate product exceeded 128 bits, or result exceeded 64 bits
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
}

/// A lookup found nothing; the caller should show an empty position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{what} not found: {key}")]
pub struct NotFound {
    pub what: &'static str,
    pub key: String,
}

/// Any failure surfaced while turning a market account into views.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Corruption(#[from] CorruptionError),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// An external collaborator (account fetch, oracle) failed
    #[error("source {source_name} failed: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MarketError {
    /// Whether this failure means the market data itself is unusable
    /// (as opposed to a transient collaborator problem or a missing entry).
    pub fn is_data_integrity(&self) -> bool {
        matches!(self, MarketError::Decode(_) | MarketError::Corruption(_))
    }
}

/// Result alias for crate-level operations
pub type Result<T> = std::result::Result<T, MarketError>;
