//! Read-only views of a heap's layout.
//!
//! [`Blocks`] walks the block list from its anchor and yields one
//! [`BlockInfo`] per header. It never mutates the heap and can be
//! restarted any number of times by calling [`Heap::blocks`] again.

use std::fmt;

use heapsim_core::{check_layout, BlockInfo, HeapInspect, HeapStats, LayoutViolation};

use crate::heap::{Heap, Walk};

/// Lazy traversal of a heap's blocks in arena order.
pub struct Blocks<'a> {
    heap: &'a Heap,
    walk: Walk<'a>,
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        let (at, header) = self.walk.next()?;
        Some(self.heap.layout().describe(at, &header))
    }
}

impl Heap {
    /// Walk the block list from its anchor.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            heap: self,
            walk: self.walk(),
        }
    }

    /// Occupancy figures from one traversal.
    pub fn stats(&self) -> HeapStats {
        HeapStats::from_blocks(self.blocks(), self.header_size())
    }

    /// Verify that the blocks partition the arena in ascending order.
    pub fn check_invariants(&self) -> Result<(), LayoutViolation> {
        check_layout(self.blocks(), self.capacity(), self.header_size())
    }

    /// Raw arena bytes, eight `offset: value` pairs per line.
    pub fn hex_dump(&self) -> HexDump<'_> {
        HexDump {
            bytes: self.as_bytes(),
        }
    }
}

impl fmt::Display for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Heap layout (anchor {}):", self.head())?;
        for block in self.blocks() {
            writeln!(f, "{block}")?;
        }
        Ok(())
    }
}

impl HeapInspect for Heap {
    type Blocks<'a> = Blocks<'a>;

    fn blocks(&self) -> Blocks<'_> {
        Heap::blocks(self)
    }

    fn capacity(&self) -> usize {
        Heap::capacity(self)
    }

    fn header_size(&self) -> usize {
        Heap::header_size(self)
    }
}

/// [`Display`](fmt::Display) adapter over raw arena bytes.
pub struct HexDump<'a> {
    bytes: &'a [u8],
}

impl HexDump<'_> {
    const BYTES_PER_LINE: usize = 8;
}

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Heap State:")?;
        for (line, chunk) in self.bytes.chunks(Self::BYTES_PER_LINE).enumerate() {
            let base = line * Self::BYTES_PER_LINE;
            for (i, byte) in chunk.iter().enumerate() {
                write!(f, "{:4}: {:4}, ", base + i, byte)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
