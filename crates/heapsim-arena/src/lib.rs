//! Fixed-capacity heap allocation with an embedded free list.
//!
//! A single byte [`Arena`] backs every allocation. Block headers live
//! inside the arena in front of the payloads they describe, linked in
//! arena order by byte offset. Allocation is first-fit with splitting;
//! release flips a block back to free and merges it forward with a free
//! neighbour.
//!
//! # Architecture
//!
//! ```text
//! RefCountedHeap (holder counts, release at zero)
//! └── Heap (allocator core: initialize / allocate / release / coalesce_all)
//!     ├── HeaderLayout (encodes BlockHeader at a byte offset)
//!     └── Arena (Box<[u8]>, fixed capacity)
//! ```
//!
//! Introspection ([`Heap::blocks`], [`Heap::stats`],
//! [`Heap::check_invariants`], [`Heap::hex_dump`]) only reads.
//!
//! # Safety
//!
//! No `unsafe`. Links between blocks are validated integer offsets, so a
//! bogus payload passed to `release` is detected and ignored instead of
//! corrupting the arena.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod config;
pub mod header;
pub mod heap;
pub mod introspect;
pub mod refcount;

// Public re-exports for the primary API surface.
pub use arena::Arena;
pub use config::{CoalescePolicy, FitPolicy, HeapConfig, OffsetWidth};
pub use header::BlockHeader;
pub use heap::Heap;
pub use introspect::{Blocks, HexDump};
pub use refcount::RefCountedHeap;
