//! heapsim walkthrough: the three classic free-list demos.
//!
//! Demonstrates:
//!   1. A word-aligned 1 KiB heap: allocate, release, reuse
//!   2. A 128-byte byte-addressed heap: raw header bytes and a full sweep
//!   3. A 64-byte reference-counted heap: shared holders
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example walkthrough

use heapsim::prelude::*;

fn word_aligned() -> Result<(), ConfigError> {
    println!("== word-aligned heap ==");
    let mut heap = Heap::new(HeapConfig::default())?;

    let a = heap.allocate(100);
    let _b = heap.allocate(200);
    print!("{heap}");

    heap.release(a);
    print!("{heap}");

    let _c = heap.allocate(50);
    print!("{heap}");
    Ok(())
}

fn byte_addressed() -> Result<(), ConfigError> {
    println!("== byte-addressed heap ==");
    let mut heap = Heap::new(HeapConfig::compact(128))?;
    print!("{}", heap.hex_dump());

    let a = heap.allocate(20);
    let b = heap.allocate(30);
    print!("{heap}");

    heap.release(a);
    let _c = heap.allocate(10);
    print!("{heap}");

    heap.release(b);
    print!("{heap}");
    let merges = heap.coalesce_all();
    println!("full sweep merged {merges} block(s)");
    print!("{heap}");
    print!("{}", heap.hex_dump());
    Ok(())
}

fn ref_counted() -> Result<(), ConfigError> {
    println!("== reference-counted heap ==");
    let mut heap = RefCountedHeap::new(HeapConfig::compact(64))?;

    let a = heap.allocate(20);
    {
        let b = a;
        heap.acquire(b);
        print!("{heap}");

        let c = heap.allocate(10);
        print!("{heap}");

        heap.relinquish(c);
        heap.relinquish(b);
    }
    print!("{heap}");

    heap.relinquish(a);
    print!("{heap}");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    word_aligned()?;
    byte_addressed()?;
    ref_counted()?;
    Ok(())
}
