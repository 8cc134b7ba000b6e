//! Integration tests: worked allocation scenarios on small arenas.
//!
//! All scenarios use a 128-byte arena with byte-wide header fields and
//! no alignment padding, so a header is H = 3 bytes (4 with holder
//! counts) and every offset can be checked by hand.

use heapsim_arena::{CoalescePolicy, Heap, HeapConfig, RefCountedHeap};
use heapsim_core::{BlockOffset, Payload};
use heapsim_test_utils::{assert_layout, block_for, layout_summary, SCENARIO_CAPACITY};

fn scenario_heap() -> Heap {
    Heap::new(HeapConfig::compact(SCENARIO_CAPACITY)).unwrap()
}

// ── Scenario A: two allocations and a free remainder ────────────

#[test]
fn two_allocations_leave_one_free_remainder() {
    let mut heap = scenario_heap();
    let h = heap.header_size();
    assert_eq!(h, 3);

    let a = heap.allocate(20).unwrap();
    let b = heap.allocate(30).unwrap();
    assert!(a < b);

    assert_eq!(
        layout_summary(&heap),
        vec![
            (0, 20, false),
            (h + 20, 30, false),
            (2 * h + 50, SCENARIO_CAPACITY - 2 * h - 20 - 30 - h, true),
        ]
    );
    assert_eq!(heap.stats().free_bytes, 69);
    assert_layout(&heap);
}

// ── Scenario B: first fit reuses the earliest hole ──────────────

#[test]
fn freed_head_block_is_reused_before_tail() {
    let mut heap = scenario_heap();
    let a = heap.allocate(20).unwrap();
    let b = heap.allocate(30).unwrap();

    heap.release(a);
    let c = heap.allocate(10).unwrap();

    assert_eq!(c, a);
    let block = block_for(&heap, c).unwrap();
    assert_eq!(block.offset, BlockOffset(0));
    assert_eq!(block.size, 10);
    // The hole was split: 20 - 10 - H bytes remain free before `b`.
    assert_eq!(
        layout_summary(&heap),
        vec![(0, 10, false), (13, 7, true), (23, 30, false), (56, 69, true)]
    );
    assert!(block_for(&heap, b).is_some_and(|blk| !blk.is_free));
    assert_layout(&heap);
}

// ── Scenario C: forward coalescing is order dependent ───────────

#[test]
fn releasing_back_to_front_merges_both_blocks() {
    let mut heap = scenario_heap();
    let a = heap.allocate(20).unwrap();
    let b = heap.allocate(30).unwrap();
    let guard = heap.allocate(10).unwrap();

    heap.release(b);
    heap.release(a);

    // One free block covering both payloads plus the reclaimed header.
    assert_eq!(
        layout_summary(&heap)[..2],
        [(0, 20 + 3 + 30, true), (56, 10, false)]
    );
    assert!(block_for(&heap, guard).is_some());
    assert_layout(&heap);
}

#[test]
fn releasing_into_free_tail_returns_whole_arena() {
    let mut heap = scenario_heap();
    let a = heap.allocate(20).unwrap();
    let b = heap.allocate(30).unwrap();

    heap.release(b);
    heap.release(a);

    assert_eq!(layout_summary(&heap), vec![(0, 125, true)]);
}

#[test]
fn releasing_front_to_back_leaves_two_free_blocks() {
    let mut heap = scenario_heap();
    let a = heap.allocate(20).unwrap();
    let b = heap.allocate(30).unwrap();

    heap.release(a);
    heap.release(b);

    // `b` merged forward into the tail, but `a` does not look backward.
    assert_eq!(layout_summary(&heap), vec![(0, 20, true), (23, 102, true)]);
    assert_layout(&heap);

    assert_eq!(heap.coalesce_all(), 1);
    assert_eq!(layout_summary(&heap), vec![(0, 125, true)]);
}

#[test]
fn bidirectional_policy_is_order_independent() {
    let config = HeapConfig::compact(SCENARIO_CAPACITY).with_coalesce(CoalescePolicy::Bidirectional);
    let mut heap = Heap::new(config).unwrap();
    let a = heap.allocate(20).unwrap();
    let b = heap.allocate(30).unwrap();

    heap.release(a);
    heap.release(b);

    assert_eq!(layout_summary(&heap), vec![(0, 125, true)]);
}

// ── Scenario D: reference counting ──────────────────────────────

#[test]
fn block_is_freed_by_last_relinquish() {
    let mut heap = RefCountedHeap::new(HeapConfig::compact(SCENARIO_CAPACITY)).unwrap();
    let a = heap.allocate(20).unwrap();
    let _b = heap.allocate(10).unwrap();
    assert_eq!(heap.ref_count(a), Some(1));

    heap.acquire(a);
    assert_eq!(heap.ref_count(a), Some(2));

    heap.relinquish(a);
    assert_eq!(heap.ref_count(a), Some(1));
    assert!(!block_for(&heap, a).unwrap().is_free);

    heap.relinquish(a);
    assert_eq!(heap.ref_count(a), None);
    let block = block_for(&heap, a).unwrap();
    assert!(block.is_free);
    assert_eq!(block.ref_count, Some(0));
    assert_layout(&heap);
}

// ── Boundaries ──────────────────────────────────────────────────

#[test]
fn exact_fit_of_only_block_succeeds_without_split() {
    let mut heap = scenario_heap();
    let available = heap.stats().largest_free;
    let a = heap.allocate(available).unwrap();
    assert_eq!(layout_summary(&heap), vec![(0, available, false)]);
    assert_eq!(heap.allocate(1), None);
    heap.release(a);
    assert_eq!(layout_summary(&heap), vec![(0, available, true)]);
}

#[test]
fn one_byte_more_than_available_fails() {
    let mut heap = scenario_heap();
    let available = heap.stats().largest_free;
    assert_eq!(heap.allocate(available + 1), None);
    assert_eq!(layout_summary(&heap), vec![(0, available, true)]);
}

#[test]
fn aligned_exact_fit_on_default_config() {
    let mut heap = Heap::with_capacity(1024).unwrap();
    let available = heap.stats().largest_free;
    assert_eq!(available % 8, 0);
    assert!(heap.allocate(available + 1).is_none());
    assert!(heap.allocate(available).is_some());
    assert_eq!(heap.stats().block_count, 1);
}

#[test]
fn zero_size_request_is_refused() {
    let mut heap = scenario_heap();
    assert_eq!(heap.allocate(0), None);
}

#[test]
fn null_release_is_ignored() {
    let mut heap = scenario_heap();
    let a = heap.allocate(8).unwrap();
    heap.release(None::<Payload>);
    assert!(!block_for(&heap, a).unwrap().is_free);
}

// ── Round trip and idempotence ──────────────────────────────────

#[test]
fn allocate_release_allocate_returns_same_payload() {
    let mut heap = scenario_heap();
    let _keep = heap.allocate(16).unwrap();
    let a = heap.allocate(24).unwrap();
    heap.release(a);
    assert_eq!(heap.allocate(24), Some(a));
}

#[test]
fn double_initialize_matches_single() {
    let mut once = scenario_heap();
    once.allocate(40).unwrap();
    once.initialize();

    let mut twice = scenario_heap();
    twice.allocate(40).unwrap();
    twice.initialize();
    twice.initialize();

    assert_eq!(layout_summary(&once), layout_summary(&twice));
    assert_eq!(once.as_bytes(), twice.as_bytes());
    assert_eq!(layout_summary(&twice), vec![(0, 125, true)]);
}

#[test]
fn independent_heaps_do_not_share_state() {
    let mut first = scenario_heap();
    let second = scenario_heap();
    first.allocate(50).unwrap();
    assert_eq!(layout_summary(&second), vec![(0, 125, true)]);
}
