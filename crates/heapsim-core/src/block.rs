//! Block descriptors, aggregate statistics and the layout checker.

use std::fmt;

use crate::error::LayoutViolation;
use crate::id::{BlockOffset, Payload};

/// Snapshot of one block header, as reported by introspection.
///
/// Produced by walking the block list; holding one does not keep the
/// heap borrowed and does not reflect later mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Where the block's header starts.
    pub offset: BlockOffset,
    /// Usable payload bytes, excluding the header.
    pub size: usize,
    /// Whether the block can satisfy an allocation.
    pub is_free: bool,
    /// Outstanding holders, present only when headers carry a count.
    pub ref_count: Option<u64>,
    /// The following block, or `None` at the end of the list.
    pub next: Option<BlockOffset>,
}

impl BlockInfo {
    /// The payload offset handed out for this block.
    pub fn payload(&self, header_size: usize) -> Payload {
        self.offset.payload(header_size)
    }

    /// First byte past this block's payload.
    pub fn end(&self, header_size: usize) -> usize {
        self.offset.get() + header_size + self.size
    }
}

impl fmt::Display for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Offset: {}, Size: {}, Free: {}",
            self.offset,
            self.size,
            u8::from(self.is_free)
        )?;
        if let Some(count) = self.ref_count {
            write!(f, ", RefCount: {count}")?;
        }
        // 0 is the on-arena end-of-list sentinel.
        write!(f, ", Next: {}", self.next.map_or(0, BlockOffset::get))
    }
}

/// Aggregate occupancy figures for one heap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Total number of blocks, free and allocated.
    pub block_count: usize,
    /// Number of free blocks.
    pub free_blocks: usize,
    /// Payload bytes available in free blocks.
    pub free_bytes: usize,
    /// Payload bytes held by allocated blocks.
    pub used_bytes: usize,
    /// Bytes consumed by block headers.
    pub header_bytes: usize,
    /// Payload size of the largest free block (0 if none).
    pub largest_free: usize,
}

impl HeapStats {
    /// Fold a block traversal into statistics.
    pub fn from_blocks<I>(blocks: I, header_size: usize) -> Self
    where
        I: IntoIterator<Item = BlockInfo>,
    {
        let mut stats = Self::default();
        for block in blocks {
            stats.block_count += 1;
            stats.header_bytes += header_size;
            if block.is_free {
                stats.free_blocks += 1;
                stats.free_bytes += block.size;
                stats.largest_free = stats.largest_free.max(block.size);
            } else {
                stats.used_bytes += block.size;
            }
        }
        stats
    }

    /// Number of allocated blocks.
    pub fn allocated_blocks(&self) -> usize {
        self.block_count - self.free_blocks
    }

    /// Bytes accounted for by headers and payloads together.
    pub fn total_bytes(&self) -> usize {
        self.free_bytes + self.used_bytes + self.header_bytes
    }
}

/// Verify that a block traversal partitions `0..capacity` exactly.
///
/// Blocks must start at offset 0, appear in strictly ascending order,
/// abut with no gaps or overlaps, link each to the header that follows
/// its payload, and end precisely at `capacity`.
pub fn check_layout<I>(blocks: I, capacity: usize, header_size: usize) -> Result<(), LayoutViolation>
where
    I: IntoIterator<Item = BlockInfo>,
{
    let mut expected = 0usize;
    let mut previous: Option<BlockOffset> = None;

    for block in blocks {
        let offset = block.offset.get();
        if let Some(previous) = previous {
            if offset <= previous.get() {
                return Err(LayoutViolation::OutOfOrder {
                    block: block.offset,
                    previous,
                });
            }
        }
        if offset < expected {
            return Err(LayoutViolation::Overlap {
                block: block.offset,
                previous_end: expected,
            });
        }
        if offset > expected {
            return Err(LayoutViolation::Gap {
                at: expected,
                len: offset - expected,
            });
        }

        let end = offset
            .checked_add(header_size)
            .and_then(|v| v.checked_add(block.size))
            .unwrap_or(usize::MAX);
        if end > capacity {
            return Err(LayoutViolation::Overrun {
                block: block.offset,
                end,
                capacity,
            });
        }
        if let Some(next) = block.next {
            if next.get() != end {
                return Err(LayoutViolation::LinkMismatch {
                    block: block.offset,
                    next: Some(next),
                    expected: end,
                });
            }
        }

        expected = end;
        previous = Some(block.offset);
    }

    if expected != capacity {
        return Err(LayoutViolation::Gap {
            at: expected,
            len: capacity - expected,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(offset: usize, size: usize, is_free: bool, next: Option<usize>) -> BlockInfo {
        BlockInfo {
            offset: BlockOffset(offset),
            size,
            is_free,
            ref_count: None,
            next: next.map(BlockOffset),
        }
    }

    #[test]
    fn single_free_block_spans_arena() {
        let blocks = [block(0, 125, true, None)];
        assert_eq!(check_layout(blocks, 128, 3), Ok(()));
    }

    #[test]
    fn empty_traversal_is_a_gap() {
        let result = check_layout(std::iter::empty(), 64, 4);
        assert_eq!(result, Err(LayoutViolation::Gap { at: 0, len: 64 }));
    }

    #[test]
    fn trailing_bytes_are_a_gap() {
        let blocks = [block(0, 20, false, None)];
        assert_eq!(
            check_layout(blocks, 64, 4),
            Err(LayoutViolation::Gap { at: 24, len: 40 })
        );
    }

    #[test]
    fn wrong_link_is_reported() {
        let blocks = [block(0, 20, false, Some(30)), block(24, 36, true, None)];
        assert!(matches!(
            check_layout(blocks, 64, 4),
            Err(LayoutViolation::LinkMismatch { expected: 24, .. })
        ));
    }

    #[test]
    fn descending_offsets_are_out_of_order() {
        let blocks = [block(0, 20, false, Some(24)), block(0, 60, true, None)];
        assert!(matches!(
            check_layout(blocks, 64, 4),
            Err(LayoutViolation::OutOfOrder { .. })
        ));
    }

    #[test]
    fn oversized_block_overruns() {
        let blocks = [block(0, 100, true, None)];
        assert!(matches!(
            check_layout(blocks, 64, 4),
            Err(LayoutViolation::Overrun { end: 104, .. })
        ));
    }

    #[test]
    fn stats_split_free_and_used() {
        let blocks = [
            block(0, 20, false, Some(24)),
            block(24, 8, true, Some(36)),
            block(36, 24, true, None),
        ];
        let stats = HeapStats::from_blocks(blocks, 4);
        assert_eq!(stats.block_count, 3);
        assert_eq!(stats.free_blocks, 2);
        assert_eq!(stats.allocated_blocks(), 1);
        assert_eq!(stats.used_bytes, 20);
        assert_eq!(stats.free_bytes, 32);
        assert_eq!(stats.largest_free, 24);
        assert_eq!(stats.total_bytes(), 64);
    }

    #[test]
    fn display_uses_zero_for_end_of_list() {
        let mut info = block(24, 8, true, None);
        info.ref_count = Some(0);
        assert_eq!(
            info.to_string(),
            "Offset: 24, Size: 8, Free: 1, RefCount: 0, Next: 0"
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn contiguous_chain_always_passes(
                sizes in proptest::collection::vec(1usize..64, 1..12),
            ) {
                let header = 4;
                let mut blocks = Vec::new();
                let mut offset = 0;
                for (i, &size) in sizes.iter().enumerate() {
                    let end = offset + header + size;
                    let next = (i + 1 < sizes.len()).then_some(end);
                    blocks.push(block(offset, size, i % 2 == 0, next));
                    offset = end;
                }
                prop_assert_eq!(check_layout(blocks.clone(), offset, header), Ok(()));
                let stats = HeapStats::from_blocks(blocks, header);
                prop_assert_eq!(stats.total_bytes(), offset);
            }
        }
    }
}
