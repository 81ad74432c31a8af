//! Read-only decoder for the lending program's node allocator.
//!
//! ## Architecture
//!
//! Each market account embeds allocator-backed trees: a fixed-capacity
//! pool of slots handed out by bumping an index or recycled through a
//! singly linked free list. This module reproduces that layout exactly and
//! recovers the live key/value entries. It never inserts or deletes.
//!
//! ## Components
//!
//! - [`RawSlot`]: one slot (registers + key + value)
//! - [`NodePool`]: all decoded slots plus the allocator header; resolves the
//!   free list
//! - [`project`]: turns live slots into keyed maps
//!
//! ## Example
//!
//! ```
//! use paystream_market::allocator::{NodePool, RawSlot};
//! use paystream_market::types::{MatchIdKey, MatchRecord};
//!
//! // Slot 2 was freed; the free list ends at the bump index (4)
//! let pool = NodePool::from_parts(2, vec![
//!     RawSlot::new(0, MatchIdKey { match_id: 1 }, MatchRecord::default()),
//!     RawSlot::new(4, MatchIdKey { match_id: 2 }, MatchRecord::default()),
//!     RawSlot::new(0, MatchIdKey { match_id: 3 }, MatchRecord::default()),
//! ]);
//! let region = pool.encode(8).unwrap();
//!
//! let decoded = NodePool::<MatchIdKey, MatchRecord>::decode(&region).unwrap();
//! let projection = decoded.project(MatchIdKey::into_id).unwrap();
//!
//! assert_eq!(projection.entries.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
//! ```

pub mod node;
pub mod pool;
pub mod projection;

pub use node::RawSlot;
pub use pool::{AllocatorHeader, NodePool, MAX_REGION_SLOTS, REGION_HEADER_BYTES};
pub use projection::{project, Projection};
