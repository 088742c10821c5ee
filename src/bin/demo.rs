//! Demonstration harness for the heap allocator.
//!
//! Walks through the allocator's behaviour scenario by scenario: basic
//! allocation, splitting, coalescing order, fragmentation, realloc growth,
//! calloc zeroing, edge cases, block reuse, and the process-wide facade.
//! Statistics reports and heap-layout tables are printed between steps;
//! allocator diagnostics (out of memory, double free, ...) appear on
//! stderr through the installed logger.

use std::ptr;

use log::{LevelFilter, Metadata, Record};

use hallocator::{global, HeapAllocator};

/// Minimal logger forwarding the library's diagnostics to stderr with a
/// level prefix.
struct StderrLogger;

impl log::Log for StderrLogger {
  fn enabled(
    &self,
    _metadata: &Metadata,
  ) -> bool {
    true
  }

  fn log(
    &self,
    record: &Record,
  ) {
    eprintln!("[{:<5}] {}", record.level(), record.args());
  }

  fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn print_header(title: &str) {
  println!();
  println!("┌─────────────────────────────────────────────────────────────┐");
  println!("│ {title:<60}│");
  println!("└─────────────────────────────────────────────────────────────┘");
}

fn print_layout(heap: &HeapAllocator) {
  println!();
  print!("{}", heap.render_layout());
}

/// 1) Allocate, use, and free a single block.
fn basic_allocation() {
  print_header("1) Basic allocation and deallocation");

  let mut heap = HeapAllocator::new(4096).unwrap();

  unsafe {
    let ptr = heap.allocate(100);
    assert!(!ptr.is_null());

    for i in 0..100usize {
      ptr.add(i).write((i * 10 % 256) as u8);
    }
    for i in 0..100usize {
      assert_eq!(ptr.add(i).read(), (i * 10 % 256) as u8);
    }
    println!("  Wrote and verified a 100-byte pattern at {ptr:?}");

    heap.deallocate(ptr);
  }

  println!("{}", heap.stats());
}

/// 2) Several sizes at once; watch the chain in the layout table.
fn multiple_sizes() {
  print_header("2) Multiple allocations of varying sizes");

  let mut heap = HeapAllocator::new(8192).unwrap();
  let sizes = [32usize, 64, 128, 256, 512, 1024];

  unsafe {
    let mut ptrs = Vec::new();
    for &size in &sizes {
      let ptr = heap.allocate(size);
      println!("  Allocated {size:>5} bytes at {ptr:?}");
      ptrs.push(ptr);
    }

    print_layout(&heap);

    for ptr in ptrs {
      heap.deallocate(ptr);
    }
  }

  println!("{}", heap.stats());
}

/// 3) Each allocation from the big initial block splits it.
fn splitting() {
  print_header("3) Block splitting");

  let mut heap = HeapAllocator::new(4096).unwrap();

  unsafe {
    let _a = heap.allocate(100);
    let _b = heap.allocate(200);
    let _c = heap.allocate(50);
  }

  print_layout(&heap);
  println!("\n  Split operations performed: {}", heap.stats().split_count);
}

/// 4) Coalescing depends on the order blocks are freed in.
fn coalescing() {
  print_header("4) Block coalescing");

  let mut heap = HeapAllocator::new(4096).unwrap();

  unsafe {
    let a = heap.allocate(100);
    let b = heap.allocate(100);
    let c = heap.allocate(100);

    println!("  Freeing the middle block: no merge possible");
    heap.deallocate(b);
    print_layout(&heap);

    println!("  Freeing the first block: merges forward into the hole");
    heap.deallocate(a);
    print_layout(&heap);

    println!("  Freeing the last block: everything collapses into one");
    heap.deallocate(c);
    print_layout(&heap);
  }

  println!("\n  Coalesce operations performed: {}", heap.stats().coalesce_count);
}

/// 5) Holes fragment the heap; the tail still serves large requests.
fn fragmentation() {
  print_header("5) Fragmentation");

  let mut heap = HeapAllocator::new(4096).unwrap();

  unsafe {
    let _a = heap.allocate(100);
    let b = heap.allocate(100);
    let _c = heap.allocate(100);
    let d = heap.allocate(100);
    let _e = heap.allocate(100);

    println!("  Freeing alternating blocks to punch holes");
    heap.deallocate(b);
    heap.deallocate(d);
    print_layout(&heap);

    println!(
      "\n  Fragmentation ratio: {:.2}%",
      heap.stats().fragmentation_ratio()
    );

    println!("  Allocating 300 bytes: skips the holes, uses the tail");
    let large = heap.allocate(300);
    assert!(!large.is_null());
    print_layout(&heap);
  }
}

/// 6) Growing realloc keeps the data, in place when possible.
fn realloc_growth() {
  print_header("6) Reallocation");

  let mut heap = HeapAllocator::new(4096).unwrap();

  unsafe {
    let message = b"Hello, Custom Allocator!\0";
    let ptr = heap.allocate(50);
    ptr::copy_nonoverlapping(message.as_ptr(), ptr, message.len());

    let grown = heap.reallocate(ptr, 100);
    let mut preserved = true;
    for (i, &byte) in message.iter().enumerate() {
      preserved &= grown.add(i).read() == byte;
    }

    println!("  Grew 50 -> 100 bytes, in place: {}", grown == ptr);
    println!("  Prefix preserved: {preserved}");

    heap.deallocate(grown);
  }
}

/// 7) Zeroed allocation.
fn calloc_zeroing() {
  print_header("7) Zeroed allocation");

  let mut heap = HeapAllocator::new(4096).unwrap();

  unsafe {
    let arr = heap.allocate_zeroed(10, 4).cast::<u32>();
    assert!(!arr.is_null());

    let mut all_zero = true;
    for i in 0..10 {
      all_zero &= arr.add(i).read() == 0;
    }
    println!("  10 u32 values zero-initialised: {all_zero}");

    heap.deallocate(arr.cast());
  }
}

/// 8) Soft failures: each emits one diagnostic line and leaves the heap
/// untouched.
fn edge_cases() {
  print_header("8) Edge cases (watch stderr for diagnostics)");

  let mut heap = HeapAllocator::new(1024).unwrap();

  unsafe {
    println!("  allocate(0) returns null: {}", heap.allocate(0).is_null());

    heap.deallocate(ptr::null_mut());
    println!("  deallocate(null) is a no-op");

    let ptr = heap.allocate(50);
    heap.deallocate(ptr);
    heap.deallocate(ptr);
    println!("  double free was detected and ignored");

    println!(
      "  allocate(2000) from a 1 KiB heap returns null: {}",
      heap.allocate(2000).is_null()
    );
  }
}

/// 9) A freed block is reused by the next fitting request.
fn reuse_after_free() {
  print_header("9) Memory reuse after free");

  let mut heap = HeapAllocator::new(2048).unwrap();

  unsafe {
    let first = heap.allocate(200);
    heap.deallocate(first);

    let second = heap.allocate(150);
    println!("  First allocation:  {first:?}");
    println!("  Second allocation: {second:?}");
    println!("  Block reused: {}", first == second);

    heap.deallocate(second);
  }

  println!("{}", heap.stats());
}

/// 10) The process-wide facade.
fn global_facade() {
  print_header("10) Global allocator facade");

  global::init(4096).unwrap();

  unsafe {
    let arr = global::malloc(5 * 4).cast::<u32>();
    for i in 0..5 {
      arr.add(i).write(i as u32 + 1);
    }

    let arr = global::realloc(arr.cast(), 10 * 4).cast::<u32>();
    for i in 5..10 {
      arr.add(i).write(i as u32 + 1);
    }

    let mut values = Vec::new();
    for i in 0..10 {
      values.push(arr.add(i).read());
    }
    println!("  Array grown through the facade: {values:?}");

    global::free(arr.cast());
  }

  println!("{}", global::stats().unwrap());

  global::teardown();
}

fn main() {
  log::set_logger(&LOGGER).expect("logger installed once");
  log::set_max_level(LevelFilter::Trace);

  println!("╔══════════════════════════════════════════════════════════════╗");
  println!("║        CUSTOM HEAP ALLOCATOR - DEMONSTRATION                 ║");
  println!("║                                                              ║");
  println!("║  First-fit free list over a fixed region, with block         ║");
  println!("║  splitting, coalescing, statistics, and layout rendering.    ║");
  println!("╚══════════════════════════════════════════════════════════════╝");

  basic_allocation();
  multiple_sizes();
  splitting();
  coalescing();
  fragmentation();
  realloc_growth();
  calloc_zeroing();
  edge_cases();
  reuse_after_free();
  global_facade();

  println!("\nDone.");
}
