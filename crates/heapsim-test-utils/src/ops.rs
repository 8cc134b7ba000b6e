//! Random operation sequences and a replay driver.
//!
//! An [`Op`] names its target by an arbitrary index that the driver
//! reduces modulo the number of payloads currently held, so every
//! generated sequence is valid against any allocator state.

use heapsim_core::{BlockAllocator, Payload, RefCounting};
use proptest::prelude::*;

/// One step of an allocator workload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    /// Request this many bytes.
    Allocate(usize),
    /// Release a held payload outright.
    Release(usize),
    /// Add a holder to a held payload.
    Acquire(usize),
    /// Drop one holder of a held payload.
    Relinquish(usize),
    /// Run the full coalescing sweep.
    CoalesceAll,
}

/// A payload the driver believes is allocated, with its expected
/// holder count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Holder {
    pub payload: Payload,
    pub holders: u64,
}

/// Replays [`Op`]s against an allocator while tracking what is held.
#[derive(Debug, Default)]
pub struct OpDriver {
    live: Vec<Holder>,
    failed_allocations: usize,
}

impl OpDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads currently held.
    pub fn live(&self) -> &[Holder] {
        &self.live
    }

    /// Allocation requests that came back `None`.
    pub fn failed_allocations(&self) -> usize {
        self.failed_allocations
    }

    fn pick(&self, index: usize) -> Option<usize> {
        (!self.live.is_empty()).then(|| index % self.live.len())
    }

    /// Apply `op` using only allocate/release. Holder operations act as
    /// a plain release (relinquish) or are skipped (acquire).
    pub fn apply<A: BlockAllocator>(&mut self, alloc: &mut A, op: &Op) {
        match *op {
            Op::Allocate(size) => match alloc.allocate(size) {
                Some(payload) => self.live.push(Holder {
                    payload,
                    holders: 1,
                }),
                None => self.failed_allocations += 1,
            },
            Op::Release(index) | Op::Relinquish(index) => {
                if let Some(i) = self.pick(index) {
                    let holder = self.live.swap_remove(i);
                    alloc.release(Some(holder.payload));
                }
            }
            Op::Acquire(_) => {}
            Op::CoalesceAll => {
                alloc.coalesce_all();
            }
        }
    }

    /// Apply `op` with holder counting. `Release` drops one holder like
    /// `Relinquish`.
    pub fn apply_counted<A: RefCounting>(&mut self, alloc: &mut A, op: &Op) {
        match *op {
            Op::Acquire(index) => {
                if let Some(i) = self.pick(index) {
                    alloc.acquire(Some(self.live[i].payload));
                    self.live[i].holders += 1;
                }
            }
            Op::Release(index) | Op::Relinquish(index) => {
                if let Some(i) = self.pick(index) {
                    alloc.relinquish(Some(self.live[i].payload));
                    self.live[i].holders -= 1;
                    if self.live[i].holders == 0 {
                        self.live.swap_remove(i);
                    }
                }
            }
            _ => self.apply(alloc, op),
        }
    }

    /// Panic unless the allocator's holder counts match the model.
    pub fn assert_counts<A: RefCounting>(&self, alloc: &A) {
        for holder in &self.live {
            assert_eq!(
                alloc.ref_count(holder.payload),
                Some(holder.holders),
                "holder count mismatch for payload {}",
                holder.payload
            );
        }
    }
}

/// A single weighted random operation with requests up to `max_size`.
pub fn arb_op(max_size: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1..=max_size).prop_map(Op::Allocate),
        3 => any::<usize>().prop_map(Op::Release),
        1 => any::<usize>().prop_map(Op::Acquire),
        2 => any::<usize>().prop_map(Op::Relinquish),
        1 => Just(Op::CoalesceAll),
    ]
}

/// Between 1 and `max_len - 1` random operations.
pub fn arb_ops(max_size: usize, max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(arb_op(max_size), 1..max_len)
}
