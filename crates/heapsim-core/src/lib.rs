//! Core types and traits for the heapsim free-list allocator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the allocator, its test utilities and its
//! benchmarks: block and payload offsets, block descriptors, error
//! types, the layout checker, and the allocator traits.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod error;
pub mod id;
pub mod traits;

pub use block::{check_layout, BlockInfo, HeapStats};
pub use error::{ConfigError, HeapError, LayoutViolation};
pub use id::{BlockOffset, Payload};
pub use traits::{BlockAllocator, HeapInspect, RefCounting};
