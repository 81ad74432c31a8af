//! Raw allocator slot.
//!
//! ## Design
//!
//! Each slot in the node pool starts with four 32-bit registers followed by
//! the key and value payloads. While a slot is allocated the registers hold
//! the tree's child/parent/colour links, which this crate never interprets.
//! While a slot is free, register 0 is the forward pointer of the free list.
//!
//! ## Memory Layout
//!
//! ```text
//! RawSlot {
//!     registers: [u32; 4]   (16 bytes, little-endian)
//!     key:       K          (K::SIZE bytes)
//!     value:     V          (V::SIZE bytes)
//! }
//! ```

/// Number of 32-bit registers preceding each slot payload
pub const REGISTER_COUNT: usize = 4;

/// Byte width of the register block
pub const REGISTER_BYTES: usize = REGISTER_COUNT * 4;

/// One decoded allocator slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSlot<K, V> {
    /// Raw registers; only `registers[0]` carries meaning here
    pub registers: [u32; REGISTER_COUNT],

    pub key: K,

    pub value: V,
}

impl<K, V> RawSlot<K, V> {
    /// Create a slot with the given free-list forward pointer and zeroed
    /// padding registers
    ///
    /// # Example
    ///
    /// ```
    /// use paystream_market::allocator::RawSlot;
    ///
    /// let slot = RawSlot::new(3, "key", 42u64);
    /// assert_eq!(slot.next_free(), 3);
    /// assert_eq!(slot.registers, [3, 0, 0, 0]);
    /// ```
    #[inline]
    pub fn new(next_free: u32, key: K, value: V) -> Self {
        Self {
            registers: [next_free, 0, 0, 0],
            key,
            value,
        }
    }

    /// Free-list forward pointer (1-based; meaningful only for free slots)
    #[inline]
    pub fn next_free(&self) -> u32 {
        self.registers[0]
    }

    /// Split into key and value
    #[inline]
    pub fn into_entry(self) -> (K, V) {
        (self.key, self.value)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_slot_new() {
        let slot = RawSlot::new(7, 1u64, 2u64);

        assert_eq!(slot.next_free(), 7);
        assert_eq!(slot.registers[1..], [0, 0, 0]);
        assert_eq!(slot.into_entry(), (1, 2));
    }

    #[test]
    fn test_only_register_zero_is_forward_pointer() {
        let mut slot = RawSlot::new(0, (), ());
        slot.registers = [5, 9, 9, 9];

        assert_eq!(slot.next_free(), 5);
    }

    #[test]
    fn test_register_block_width() {
        assert_eq!(REGISTER_BYTES, 16);
    }
}
