//! Benchmark workloads for the heapsim allocator.
//!
//! Provides deterministic operation streams and pre-built heap
//! configurations for benchmarks and examples:
//!
//! - [`churn_workload`]: seeded mix of allocations and releases
//! - [`refcount_workload`]: the same mix with acquire/relinquish traffic
//! - [`bench_config`]: 64 KiB arena with the requested fit policy

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use heapsim_arena::{FitPolicy, HeapConfig, OffsetWidth};
use heapsim_core::BlockAllocator;
use heapsim_test_utils::{Op, OpDriver};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Arena size used by every benchmark profile.
pub const BENCH_CAPACITY: usize = 64 * 1024;

/// 64 KiB arena, 16-bit header fields, 8-byte alignment.
pub fn bench_config(fit: FitPolicy) -> HeapConfig {
    HeapConfig::new(BENCH_CAPACITY)
        .with_offset_width(OffsetWidth::U16)
        .with_fit(fit)
}

/// `len` operations drawn from a seeded ChaCha8 stream.
///
/// Roughly 55% allocations of 1..=`max_size` bytes and 45% releases of
/// a random held payload. Identical seeds yield identical workloads.
pub fn churn_workload(seed: u64, len: usize, max_size: usize) -> Vec<Op> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let roll = rng.next_u32() % 100;
            let arg = rng.next_u32() as usize;
            if roll < 55 {
                Op::Allocate(1 + arg % max_size)
            } else {
                Op::Release(arg)
            }
        })
        .collect()
}

/// Like [`churn_workload`] but a quarter of the traffic adds or drops
/// holders.
pub fn refcount_workload(seed: u64, len: usize, max_size: usize) -> Vec<Op> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let roll = rng.next_u32() % 100;
            let arg = rng.next_u32() as usize;
            match roll {
                0..=49 => Op::Allocate(1 + arg % max_size),
                50..=62 => Op::Acquire(arg),
                63..=87 => Op::Relinquish(arg),
                _ => Op::Release(arg),
            }
        })
        .collect()
}

/// Replay `ops` against `alloc`, returning how many allocations failed.
pub fn run_workload<A: BlockAllocator>(alloc: &mut A, ops: &[Op]) -> usize {
    let mut driver = OpDriver::new();
    for op in ops {
        driver.apply(alloc, op);
    }
    driver.failed_allocations()
}
