//! Test utilities for heapsim development.
//!
//! Everything here is written against the traits in `heapsim-core`, so
//! the same oracles check the plain heap, the reference-counted heap
//! and any future allocator:
//!
//! - [`assert_layout`] panics with a block listing if the partition
//!   invariants fail.
//! - [`layout_summary`] flattens the block list for direct comparison.
//! - [`ops`] generates random operation sequences and replays them
//!   while keeping a model of which payloads are still held.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod ops;

use heapsim_core::{BlockInfo, HeapInspect, Payload};

pub use ops::{arb_op, arb_ops, Holder, Op, OpDriver};

/// Arena size used by the worked allocation scenarios.
pub const SCENARIO_CAPACITY: usize = 128;

/// `(offset, size, is_free)` for every block, in traversal order.
pub fn layout_summary<H: HeapInspect>(heap: &H) -> Vec<(usize, usize, bool)> {
    heap.blocks()
        .map(|b| (b.offset.get(), b.size, b.is_free))
        .collect()
}

/// Render the block list, one block per line.
pub fn render_blocks<H: HeapInspect>(heap: &H) -> String {
    heap.blocks()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Panic unless the blocks partition the arena in ascending order.
pub fn assert_layout<H: HeapInspect>(heap: &H) {
    if let Err(violation) = heap.check_invariants() {
        panic!(
            "layout invariant violated: {violation}\n{}",
            render_blocks(heap)
        );
    }
}

/// Find the block whose payload is `payload`.
pub fn block_for<H: HeapInspect>(heap: &H, payload: Payload) -> Option<BlockInfo> {
    let header_size = heap.header_size();
    heap.blocks().find(|b| b.payload(header_size) == payload)
}

/// Panic unless every held payload maps to a distinct allocated block.
pub fn assert_holders_allocated<H: HeapInspect>(heap: &H, holders: &[Holder]) {
    for holder in holders {
        match block_for(heap, holder.payload) {
            Some(block) if !block.is_free => {}
            Some(_) => panic!(
                "held payload {} is free\n{}",
                holder.payload,
                render_blocks(heap)
            ),
            None => panic!(
                "held payload {} has no block\n{}",
                holder.payload,
                render_blocks(heap)
            ),
        }
    }
    let mut payloads: Vec<_> = holders.iter().map(|h| h.payload).collect();
    payloads.sort();
    payloads.dedup();
    assert_eq!(payloads.len(), holders.len(), "payload handed out twice");
}
