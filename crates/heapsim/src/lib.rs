//! heapsim: a fixed-capacity heap allocator with an embedded free list.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the heapsim sub-crates. For most users, adding `heapsim` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use heapsim::prelude::*;
//!
//! // 128-byte arena, byte-wide header fields, no alignment padding.
//! let mut heap = Heap::new(HeapConfig::compact(128)).unwrap();
//!
//! let a = heap.allocate(20).unwrap();
//! let b = heap.allocate(30).unwrap();
//! heap.payload_mut(a).unwrap().fill(0xAB);
//!
//! // Two allocated blocks followed by the free remainder.
//! let sizes: Vec<_> = heap.blocks().map(|blk| (blk.size, blk.is_free)).collect();
//! assert_eq!(sizes, vec![(20, false), (30, false), (69, true)]);
//!
//! heap.release(b);
//! heap.release(a);
//! assert_eq!(heap.stats().block_count, 1);
//! assert!(heap.check_invariants().is_ok());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `heapsim-arena` | `Heap`, `RefCountedHeap`, configuration, introspection |
//! | [`types`] | `heapsim-core` | Offsets, block descriptors, errors, allocator traits |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Arena storage and the allocator itself (`heapsim-arena`).
///
/// [`arena::Heap`] is the allocator core; [`arena::RefCountedHeap`]
/// layers holder counts on top of it.
pub use heapsim_arena as arena;

/// Offsets, block descriptors, errors and traits (`heapsim-core`).
///
/// The traits ([`types::BlockAllocator`], [`types::RefCounting`],
/// [`types::HeapInspect`]) let generic code drive either heap.
pub use heapsim_core as types;

/// Common imports for typical heapsim usage.
///
/// ```rust
/// use heapsim::prelude::*;
/// ```
pub mod prelude {
    // Allocators and configuration
    pub use heapsim_arena::{
        CoalescePolicy, FitPolicy, Heap, HeapConfig, OffsetWidth, RefCountedHeap,
    };

    // Core types and traits
    pub use heapsim_core::{
        BlockAllocator, BlockInfo, BlockOffset, HeapInspect, HeapStats, Payload, RefCounting,
    };

    // Errors
    pub use heapsim_core::{ConfigError, HeapError, LayoutViolation};
}
