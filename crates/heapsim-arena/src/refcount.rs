//! Reference-counted deallocation on top of the allocator core.
//!
//! [`RefCountedHeap`] keeps a holder count in every header. Allocation
//! starts the count at one for the caller's own hold; each
//! [`acquire`](RefCountedHeap::acquire) adds a holder and each
//! [`relinquish`](RefCountedHeap::relinquish) drops one. The block goes
//! back to the free list when the count reaches zero, through the same
//! release path (and coalescing) as a direct release.

use std::fmt;

use heapsim_core::{BlockAllocator, ConfigError, HeapError, HeapInspect, Payload, RefCounting};
use log::{trace, warn};

use crate::config::HeapConfig;
use crate::heap::Heap;
use crate::introspect::Blocks;

/// A heap whose blocks are freed when their last holder lets go.
pub struct RefCountedHeap {
    heap: Heap,
}

impl RefCountedHeap {
    /// Build a heap from `config` with holder counts enabled.
    pub fn new(config: HeapConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            heap: Heap::new(config.with_ref_counting(true))?,
        })
    }

    /// Build a heap of `capacity` bytes with the default configuration.
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        Self::new(HeapConfig::new(capacity))
    }

    /// The underlying heap, for inspection.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Unwrap into the underlying heap.
    pub fn into_inner(self) -> Heap {
        self.heap
    }

    /// Allocate with a holder count of one.
    pub fn allocate(&mut self, size: usize) -> Option<Payload> {
        self.heap.allocate(size)
    }

    /// Add a holder. `None` is a no-op; misuse is logged and ignored.
    pub fn acquire(&mut self, payload: impl Into<Option<Payload>>) {
        let Some(payload) = payload.into() else {
            return;
        };
        if let Err(err) = self.try_acquire(payload) {
            warn!("ignored acquire: {err}");
        }
    }

    /// Add a holder, returning the new count.
    ///
    /// Fails with [`HeapError::RefCountOverflow`] once the count reaches the
    /// header field's maximum, leaving the block untouched.
    pub fn try_acquire(&mut self, payload: Payload) -> Result<u64, HeapError> {
        let found = self.heap.locate(payload)?;
        if found.header.is_free {
            return Err(HeapError::NotAllocated { payload });
        }
        let mut header = found.header;
        let max = self.heap.layout().max_ref_count();
        if header.ref_count >= max {
            return Err(HeapError::RefCountOverflow { payload, max });
        }
        header.ref_count += 1;
        self.heap.write(found.at, &header);
        trace!("acquired payload {payload}: {} holders", header.ref_count);
        Ok(header.ref_count)
    }

    /// Drop a holder. `None` is a no-op; misuse is logged and ignored.
    pub fn relinquish(&mut self, payload: impl Into<Option<Payload>>) {
        let Some(payload) = payload.into() else {
            return;
        };
        if let Err(err) = self.try_relinquish(payload) {
            warn!("ignored relinquish: {err}");
        }
    }

    /// Drop a holder, returning the remaining count.
    ///
    /// Releases the block when the count reaches zero. A count that is
    /// already zero (including any free block) stays at zero.
    pub fn try_relinquish(&mut self, payload: Payload) -> Result<u64, HeapError> {
        let found = self.heap.locate(payload)?;
        let mut header = found.header;
        if header.is_free || header.ref_count == 0 {
            return Ok(0);
        }
        header.ref_count -= 1;
        if header.ref_count > 0 {
            self.heap.write(found.at, &header);
            trace!("relinquished payload {payload}: {} holders", header.ref_count);
            return Ok(header.ref_count);
        }
        trace!("relinquished payload {payload}: last holder, releasing");
        self.heap.try_release(payload)?;
        Ok(0)
    }

    /// Current holder count, or `None` if the payload is not allocated.
    pub fn ref_count(&self, payload: Payload) -> Option<u64> {
        let found = self.heap.locate(payload).ok()?;
        (!found.header.is_free).then_some(found.header.ref_count)
    }

    /// Bytes of an allocated payload.
    pub fn payload(&self, payload: Payload) -> Option<&[u8]> {
        self.heap.payload(payload)
    }

    /// Mutable bytes of an allocated payload.
    pub fn payload_mut(&mut self, payload: Payload) -> Option<&mut [u8]> {
        self.heap.payload_mut(payload)
    }

    /// Merge every run of adjacent free blocks.
    pub fn coalesce_all(&mut self) -> usize {
        self.heap.coalesce_all()
    }

    /// Walk the block list from its anchor.
    pub fn blocks(&self) -> Blocks<'_> {
        self.heap.blocks()
    }
}

impl fmt::Display for RefCountedHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.heap, f)
    }
}

/// `release` drops one holder rather than freeing outright.
impl BlockAllocator for RefCountedHeap {
    fn allocate(&mut self, size: usize) -> Option<Payload> {
        RefCountedHeap::allocate(self, size)
    }

    fn release(&mut self, payload: Option<Payload>) {
        RefCountedHeap::relinquish(self, payload);
    }

    fn coalesce_all(&mut self) -> usize {
        RefCountedHeap::coalesce_all(self)
    }
}

impl RefCounting for RefCountedHeap {
    fn acquire(&mut self, payload: Option<Payload>) {
        RefCountedHeap::acquire(self, payload);
    }

    fn relinquish(&mut self, payload: Option<Payload>) {
        RefCountedHeap::relinquish(self, payload);
    }

    fn ref_count(&self, payload: Payload) -> Option<u64> {
        RefCountedHeap::ref_count(self, payload)
    }
}

impl HeapInspect for RefCountedHeap {
    type Blocks<'a> = Blocks<'a>;

    fn blocks(&self) -> Blocks<'_> {
        self.heap.blocks()
    }

    fn capacity(&self) -> usize {
        self.heap.capacity()
    }

    fn header_size(&self) -> usize {
        self.heap.header_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compact_rc_heap() -> RefCountedHeap {
        RefCountedHeap::new(HeapConfig::compact(64)).unwrap()
    }

    #[test]
    fn allocation_starts_with_one_holder() {
        let mut heap = compact_rc_heap();
        let a = heap.allocate(20).unwrap();
        assert_eq!(heap.ref_count(a), Some(1));
        assert_eq!(heap.heap().header_size(), 4);
    }

    #[test]
    fn block_survives_until_last_holder() {
        let mut heap = compact_rc_heap();
        let a = heap.allocate(20).unwrap();
        assert_eq!(heap.try_acquire(a), Ok(2));
        assert_eq!(heap.try_relinquish(a), Ok(1));
        assert_eq!(heap.ref_count(a), Some(1));
        assert_eq!(heap.try_relinquish(a), Ok(0));
        assert_eq!(heap.ref_count(a), None);
        assert_eq!(heap.blocks().count(), 1);
    }

    #[test]
    fn relinquish_after_free_stays_at_zero() {
        let mut heap = compact_rc_heap();
        let a = heap.allocate(20).unwrap();
        let _b = heap.allocate(20).unwrap();
        heap.relinquish(a);
        assert_eq!(heap.try_relinquish(a), Ok(0));
        let first = heap.blocks().next().unwrap();
        assert!(first.is_free);
        assert_eq!(first.ref_count, Some(0));
    }

    #[test]
    fn acquire_on_free_block_is_rejected() {
        let mut heap = compact_rc_heap();
        let a = heap.allocate(20).unwrap();
        let _b = heap.allocate(20).unwrap();
        heap.relinquish(a);
        assert_eq!(
            heap.try_acquire(a),
            Err(HeapError::NotAllocated { payload: a })
        );
        heap.acquire(a);
        assert_eq!(heap.ref_count(a), None);
    }

    #[test]
    fn null_operations_are_noops() {
        let mut heap = compact_rc_heap();
        let a = heap.allocate(20).unwrap();
        heap.acquire(None);
        heap.relinquish(None);
        assert_eq!(heap.ref_count(a), Some(1));
    }

    #[test]
    fn acquire_at_byte_width_maximum_is_refused() {
        let mut heap = compact_rc_heap();
        let a = heap.allocate(8).unwrap();
        for expected in 2..=255 {
            assert_eq!(heap.try_acquire(a), Ok(expected));
        }
        assert_eq!(
            heap.try_acquire(a),
            Err(HeapError::RefCountOverflow {
                payload: a,
                max: 255
            })
        );
        heap.acquire(a);
        assert_eq!(heap.ref_count(a), Some(255));

        for _ in 0..254 {
            heap.relinquish(a);
        }
        assert_eq!(heap.ref_count(a), Some(1));
        assert_eq!(heap.try_relinquish(a), Ok(0));
        assert_eq!(heap.ref_count(a), None);
        assert_eq!(heap.blocks().count(), 1);
    }

    #[test]
    fn unknown_payload_is_reported() {
        let mut heap = compact_rc_heap();
        heap.allocate(8).unwrap();
        assert_eq!(
            heap.try_acquire(Payload(6)),
            Err(HeapError::InvalidAddress {
                payload: Payload(6)
            })
        );
        assert!(matches!(
            heap.try_relinquish(Payload(6)),
            Err(HeapError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn trait_release_drops_a_holder() {
        let mut heap = compact_rc_heap();
        let a = heap.allocate(8).unwrap();
        heap.acquire(a);
        BlockAllocator::release(&mut heap, Some(a));
        assert_eq!(heap.ref_count(a), Some(1));
        BlockAllocator::release(&mut heap, Some(a));
        assert_eq!(heap.ref_count(a), None);
    }

    #[test]
    fn relinquishing_to_zero_coalesces_forward() {
        let mut heap = compact_rc_heap();
        let a = heap.allocate(8).unwrap();
        let b = heap.allocate(8).unwrap();
        heap.relinquish(b);
        heap.relinquish(a);
        let blocks: Vec<_> = heap.blocks().collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].size, 60);
    }
}
