//! Allocator abstraction traits.
//!
//! These decouple the test oracles and benchmark drivers from the
//! concrete arena allocator: anything that can hand out payloads and
//! report its block list can be checked against the same invariants.

use crate::block::{check_layout, BlockInfo, HeapStats};
use crate::error::LayoutViolation;
use crate::id::Payload;

/// Allocation and release over a fixed-capacity arena.
///
/// Every operation is synchronous and non-fatal: failure is reported as
/// `None` and misuse is ignored. Implementations are single-owner;
/// callers sharing one across threads must wrap the whole allocator in
/// a lock.
pub trait BlockAllocator {
    /// Hand out a payload of at least `size` usable bytes.
    ///
    /// Returns `None` for a zero-byte request or when no free block is
    /// large enough.
    fn allocate(&mut self, size: usize) -> Option<Payload>;

    /// Return a payload to the allocator. `None` is a no-op.
    fn release(&mut self, payload: Option<Payload>);

    /// Merge every run of adjacent free blocks. Returns the number of
    /// merges performed.
    fn coalesce_all(&mut self) -> usize;
}

/// Shared ownership of allocated blocks through a holder count.
///
/// A fresh allocation starts with one holder. The block returns to the
/// free list only when the last holder relinquishes it.
pub trait RefCounting: BlockAllocator {
    /// Register one more holder. `None` is a no-op.
    fn acquire(&mut self, payload: Option<Payload>);

    /// Drop one holder, releasing the block when none remain. `None` and
    /// already-zero counts are no-ops.
    fn relinquish(&mut self, payload: Option<Payload>);

    /// Current holder count, or `None` if the payload is not allocated.
    fn ref_count(&self, payload: Payload) -> Option<u64>;
}

/// Read-only view of an allocator's block list.
pub trait HeapInspect {
    /// Lazy traversal of the block list in arena order.
    type Blocks<'a>: Iterator<Item = BlockInfo>
    where
        Self: 'a;

    /// Walk the block list from its anchor. Each call starts a fresh walk.
    fn blocks(&self) -> Self::Blocks<'_>;

    /// Arena size in bytes.
    fn capacity(&self) -> usize;

    /// Bytes occupied by one block header.
    fn header_size(&self) -> usize;

    /// Occupancy figures derived from one traversal.
    fn stats(&self) -> HeapStats {
        HeapStats::from_blocks(self.blocks(), self.header_size())
    }

    /// Check that the blocks partition the arena in ascending order.
    fn check_invariants(&self) -> Result<(), LayoutViolation> {
        check_layout(self.blocks(), self.capacity(), self.header_size())
    }
}
