//! In-arena block header encoding.
//!
//! Every block begins with a fixed-layout header. For a field width of
//! `W` bytes the layout is:
//!
//! ```text
//! +---------+-------+---------+--------------+---------+
//! | size: W | flags | next: W | ref_count: W | padding |
//! +---------+-------+---------+--------------+---------+
//!                               (optional)     (to alignment)
//! ```
//!
//! All integers are little-endian. Flag bit 0 marks the block free. A
//! stored `next` of 0 is the end-of-list sentinel.

use heapsim_core::{BlockInfo, BlockOffset};

use crate::arena::Arena;
use crate::config::HeapConfig;

const FREE_BIT: u8 = 0b1;

/// Decoded header fields for one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Usable payload bytes, excluding the header.
    pub size: usize,
    /// Whether the block is available for allocation.
    pub is_free: bool,
    /// The block that follows this one in arena order.
    pub next: Option<BlockOffset>,
    /// Outstanding holders. Always 0 when the layout has no count field.
    pub ref_count: u64,
}

impl BlockHeader {
    /// A free block of `size` payload bytes.
    pub fn free(size: usize, next: Option<BlockOffset>) -> Self {
        Self {
            size,
            is_free: true,
            next,
            ref_count: 0,
        }
    }
}

/// Byte positions of the header fields under one configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HeaderLayout {
    width: usize,
    ref_counted: bool,
    size: usize,
    max_value: u64,
}

impl HeaderLayout {
    pub(crate) fn new(config: &HeapConfig) -> Self {
        Self {
            width: config.offset_width.bytes(),
            ref_counted: config.ref_counting,
            size: config.header_size(),
            max_value: config.offset_width.max_value(),
        }
    }

    /// Padded header size in bytes.
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Saturation point for the holder count.
    pub(crate) fn max_ref_count(&self) -> u64 {
        self.max_value
    }

    fn flags_at(&self, at: usize) -> usize {
        at + self.width
    }

    fn next_at(&self, at: usize) -> usize {
        at + self.width + 1
    }

    fn ref_count_at(&self, at: usize) -> usize {
        at + 2 * self.width + 1
    }

    pub(crate) fn read(&self, arena: &Arena, at: BlockOffset) -> BlockHeader {
        let at = at.get();
        let size = arena.read_uint(at, self.width) as usize;
        let is_free = arena.byte(self.flags_at(at)) & FREE_BIT != 0;
        let next = match arena.read_uint(self.next_at(at), self.width) {
            0 => None,
            raw => Some(BlockOffset(raw as usize)),
        };
        let ref_count = if self.ref_counted {
            arena.read_uint(self.ref_count_at(at), self.width)
        } else {
            0
        };
        BlockHeader {
            size,
            is_free,
            next,
            ref_count,
        }
    }

    pub(crate) fn write(&self, arena: &mut Arena, at: BlockOffset, header: &BlockHeader) {
        let at = at.get();
        arena.write_uint(at, self.width, header.size as u64);
        arena.set_byte(self.flags_at(at), if header.is_free { FREE_BIT } else { 0 });
        let next = header.next.map_or(0, |n| n.get() as u64);
        arena.write_uint(self.next_at(at), self.width, next);
        if self.ref_counted {
            let count = header.ref_count.min(self.max_value);
            arena.write_uint(self.ref_count_at(at), self.width, count);
        }
    }

    pub(crate) fn describe(&self, at: BlockOffset, header: &BlockHeader) -> BlockInfo {
        BlockInfo {
            offset: at,
            size: header.size,
            is_free: header.is_free,
            ref_count: self.ref_counted.then_some(header.ref_count),
            next: header.next,
        }
    }
}
