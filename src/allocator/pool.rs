//! Node pool decoder and free-list resolver.
//!
//! ## Region Layout
//!
//! ```text
//! [0, 16)   tree header (opaque)
//! [16, 24)  allocator metadata (opaque)
//! [24, 28)  bump_index      i32 LE, one past the highest slot ever handed out
//! [28, 32)  free_list_head  i32 LE, 1-based slot number, >= bump_index if empty
//! [32, ..)  bump_index - 1 contiguous slots
//! ```
//!
//! The allocator numbers slots from 1, so slot number `n` lives at array
//! index `n - 1`. A slot is free when the free-list chain reaches it.

use std::collections::BTreeSet;

use slab::Slab;
use tracing::trace;

use crate::allocator::node::{RawSlot, REGISTER_BYTES, REGISTER_COUNT};
use crate::error::{CodecError, CorruptionError, DecodeError};
use crate::types::FixedCodec;

/// Opaque tree header preceding the allocator
pub const TREE_HEADER_BYTES: usize = 16;

/// Opaque allocator metadata preceding the bump index
pub const ALLOCATOR_META_BYTES: usize = 8;

/// Offset of `bump_index` within a region
pub const BUMP_INDEX_OFFSET: usize = TREE_HEADER_BYTES + ALLOCATOR_META_BYTES;

/// Offset of `free_list_head` within a region
pub const FREE_LIST_HEAD_OFFSET: usize = BUMP_INDEX_OFFSET + 4;

/// Bytes before the first slot
pub const REGION_HEADER_BYTES: usize = FREE_LIST_HEAD_OFFSET + 4;

/// Largest capacity a region can address; `bump_index` is an i32
pub const MAX_REGION_SLOTS: usize = i32::MAX as usize - 1;

/// Allocator bookkeeping read from a region header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorHeader {
    /// One past the highest slot number ever allocated
    pub bump_index: u32,

    /// First free slot number, or a value >= `bump_index` when none are free
    pub free_list_head: u32,
}

impl AllocatorHeader {
    /// Parse the header of a region.
    pub fn read(region: &[u8]) -> Result<Self, DecodeError> {
        if region.len() < REGION_HEADER_BYTES {
            return Err(DecodeError::Truncated {
                context: "allocator header",
                needed: REGION_HEADER_BYTES,
                available: region.len(),
            });
        }

        let bump_index = read_i32(region, BUMP_INDEX_OFFSET);
        let free_list_head = read_i32(region, FREE_LIST_HEAD_OFFSET);

        Ok(Self {
            bump_index: non_negative("bump_index", bump_index)?,
            free_list_head: non_negative("free_list_head", free_list_head)?,
        })
    }

    /// Number of slots the allocator has ever handed out
    pub fn slot_count(&self) -> usize {
        self.bump_index.saturating_sub(1) as usize
    }
}

/// All slots of one allocator region, free and live alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePool<K, V> {
    header: AllocatorHeader,
    slots: Vec<RawSlot<K, V>>,
}

impl<K: FixedCodec, V: FixedCodec> NodePool<K, V> {
    /// Encoded width of one slot
    pub const SLOT_SIZE: usize = REGISTER_BYTES + K::SIZE + V::SIZE;

    /// Byte width of a region holding `capacity` slots, `None` if that
    /// overflows `usize`
    pub fn region_size(capacity: usize) -> Option<usize> {
        capacity
            .checked_mul(Self::SLOT_SIZE)?
            .checked_add(REGION_HEADER_BYTES)
    }

    /// Decode every slot from index 0 to `bump_index - 2` inclusive.
    ///
    /// The region may be longer than needed (unused capacity), never
    /// shorter.
    ///
    /// # Errors
    ///
    /// * [`DecodeError::Truncated`] if the region cannot hold the header or
    ///   the declared number of slots
    /// * [`DecodeError::NegativeHeaderField`] for a negative header field
    /// * [`DecodeError::Record`] if a key or value fails to decode
    pub fn decode(region: &[u8]) -> Result<Self, DecodeError> {
        let header = AllocatorHeader::read(region)?;
        let slot_count = header.slot_count();

        let needed = Self::region_size(slot_count).unwrap_or(usize::MAX);
        if region.len() < needed {
            return Err(DecodeError::Truncated {
                context: "allocator slots",
                needed,
                available: region.len(),
            });
        }

        let mut slots = Vec::with_capacity(slot_count);
        let mut offset = REGION_HEADER_BYTES;
        for _ in 0..slot_count {
            let mut registers = [0u32; REGISTER_COUNT];
            for register in registers.iter_mut() {
                *register = read_u32(region, offset);
                offset += 4;
            }
            let key = K::decode(&region[offset..offset + K::SIZE])?;
            offset += K::SIZE;
            let value = V::decode(&region[offset..offset + V::SIZE])?;
            offset += V::SIZE;

            slots.push(RawSlot {
                registers,
                key,
                value,
            });
        }

        trace!(
            record = V::NAME,
            bump_index = header.bump_index,
            free_list_head = header.free_list_head,
            "decoded node pool"
        );

        Ok(Self { header, slots })
    }

    /// Write this pool back into a region of `capacity` slots.
    ///
    /// Header bytes the decoder skips are zeroed, as is unused capacity.
    /// Used to build fixtures; the crate never writes to fetched accounts.
    pub fn encode(&self, capacity: usize) -> Result<Vec<u8>, CodecError> {
        let capacity = capacity.max(self.slots.len());
        let size = Self::region_size(capacity).ok_or_else(|| CodecError {
            record: V::NAME,
            reason: format!("region of {} slots overflows the address space", capacity),
        })?;
        let mut region = vec![0u8; size];
        region[BUMP_INDEX_OFFSET..BUMP_INDEX_OFFSET + 4]
            .copy_from_slice(&self.header.bump_index.to_le_bytes());
        region[FREE_LIST_HEAD_OFFSET..FREE_LIST_HEAD_OFFSET + 4]
            .copy_from_slice(&self.header.free_list_head.to_le_bytes());

        let mut offset = REGION_HEADER_BYTES;
        for slot in &self.slots {
            for register in slot.registers {
                region[offset..offset + 4].copy_from_slice(&register.to_le_bytes());
                offset += 4;
            }
            region[offset..offset + K::SIZE].copy_from_slice(&slot.key.encode()?);
            offset += K::SIZE;
            region[offset..offset + V::SIZE].copy_from_slice(&slot.value.encode()?);
            offset += V::SIZE;
        }

        Ok(region)
    }
}

impl<K, V> NodePool<K, V> {
    /// Assemble a pool from parts; `slots.len()` becomes `bump_index - 1`.
    pub fn from_parts(free_list_head: u32, slots: Vec<RawSlot<K, V>>) -> Self {
        let bump_index = slots.len() as u32 + 1;
        Self {
            header: AllocatorHeader {
                bump_index,
                free_list_head,
            },
            slots,
        }
    }

    #[inline]
    pub fn header(&self) -> AllocatorHeader {
        self.header
    }

    #[inline]
    pub fn bump_index(&self) -> u32 {
        self.header.bump_index
    }

    #[inline]
    pub fn free_list_head(&self) -> u32 {
        self.header.free_list_head
    }

    /// All decoded slots, free ones included
    #[inline]
    pub fn slots(&self) -> &[RawSlot<K, V>] {
        &self.slots
    }

    /// Walk the free list and return the 0-based indices of free slots.
    ///
    /// # Errors
    ///
    /// * [`CorruptionError::Cycle`] if the chain revisits a slot or runs
    ///   for more than `bump_index` steps
    /// * [`CorruptionError::PointerOutOfRange`] if a pointer is 0 or names a
    ///   slot that was not decoded
    ///
    /// A partial set is never returned: a dropped live slot would understate
    /// outstanding debt and collateral.
    pub fn free_slots(&self) -> Result<BTreeSet<usize>, CorruptionError> {
        let bump_index = self.header.bump_index;
        let mut free = BTreeSet::new();
        let mut cursor = self.header.free_list_head;
        let mut steps = 0usize;

        while cursor < bump_index {
            steps += 1;
            if steps > bump_index as usize {
                return Err(CorruptionError::Cycle { steps, bump_index });
            }

            let out_of_range = CorruptionError::PointerOutOfRange {
                pointer: cursor,
                slot_count: self.slots.len(),
            };
            let index = match cursor.checked_sub(1) {
                Some(index) => index as usize,
                None => return Err(out_of_range),
            };
            let slot = self.slots.get(index).ok_or(out_of_range)?;

            if !free.insert(index) {
                return Err(CorruptionError::Cycle { steps, bump_index });
            }
            cursor = slot.next_free();
        }

        Ok(free)
    }

    /// Move the live slots into a slab keyed by 0-based slot index.
    ///
    /// Vacant slab entries are exactly the indices in `free`.
    pub fn into_live_slots(self, free: &BTreeSet<usize>) -> Slab<RawSlot<K, V>> {
        self.slots
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !free.contains(index))
            .collect()
    }
}

// ============================================================================
// Byte helpers
// ============================================================================

#[inline]
fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}

#[inline]
fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    read_u32(bytes, offset) as i32
}

fn non_negative(field: &'static str, value: i32) -> Result<u32, DecodeError> {
    u32::try_from(value).map_err(|_| DecodeError::NegativeHeaderField { field, value })
}

// ============================================================================
// Unit Tests
// ============================================================================
