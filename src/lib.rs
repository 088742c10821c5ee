//! # hallocator - A Custom Heap Allocator Library
//!
//! This crate provides a **first-fit free-list allocator** implementation
//! in Rust that manages a single contiguous region of memory.
//!
//! ## Overview
//!
//! The allocator carves variable-size blocks out of one fixed region and
//! hands the freed ones back to a free list, merging neighbours to fight
//! fragmentation:
//!
//! ```text
//!   Free-List Allocator Concept:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                        MANAGED REGION                                │
//!   │                                                                      │
//!   │   ┌────┬──────┬────┬──────┬────┬──────┬────┬────────────────────┐    │
//!   │   │ H  │ A1   │ H  │ free │ H  │ A2   │ H  │       free         │    │
//!   │   └────┴──────┴────┴──────┴────┴──────┴────┴────────────────────┘    │
//!   │     ▲            ▲                                                   │
//!   │     │            │                                                   │
//!   │   Header     freed blocks stay linked in place and are               │
//!   │   records    reused by the next allocation that fits                 │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Allocation walks the chain front to back and takes the first fit.
//!   Oversized blocks are split; freed neighbours are coalesced.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   hallocator
//!   ├── align      - Alignment constant and rounding macros (align!, align_to!)
//!   ├── block      - Block header record (internal)
//!   ├── heap       - HeapAllocator engine: allocate/deallocate/reallocate,
//!   │                splitting, coalescing, statistics, layout iteration
//!   ├── stats      - HeapStats accounting record and report rendering
//!   ├── error      - Construction error type
//!   └── global     - Process-wide convenience facade
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use hallocator::HeapAllocator;
//!
//! let mut heap = HeapAllocator::new(4096).unwrap();
//!
//! unsafe {
//!   // Allocate memory for a u64
//!   let ptr = heap.allocate(std::mem::size_of::<u64>()) as *mut u64;
//!
//!   // Use the memory
//!   *ptr = 42;
//!   assert_eq!(*ptr, 42);
//!
//!   // Free the memory
//!   heap.deallocate(ptr as *mut u8);
//! }
//!
//! println!("{}", heap.stats());
//! ```
//!
//! ## How It Works
//!
//! Every block carries a metadata header; headers plus payloads tile the
//! region exactly, and the headers form a doubly linked chain in address
//! order:
//!
//! ```text
//!   Single Block:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ is_free: false  │  │  │                          │  │
//!   │  │ next: null/ptr  │  │  │     N bytes usable       │  │
//!   │  │ prev: null/ptr  │  │  │                          │  │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! The `prev` link makes freeing O(1): a just-freed block merges with a
//! free forward neighbour and a free backward neighbour without any list
//! scan.
//!
//! ## Features
//!
//! - **Bounded memory**: everything lives in one caller-visible region
//! - **First-fit policy**: deterministic, easy to reason about
//! - **Split and coalesce**: large blocks split on allocation, free
//!   neighbours merge on deallocation
//! - **realloc / calloc**: in-place growth into a free neighbour, zeroed
//!   allocation with overflow detection
//! - **Introspection**: statistics snapshots, per-block layout iteration,
//!   rendered reports
//!
//! ## Limitations
//!
//! - **Single-threaded engine**: no internal synchronization; wrap it (or
//!   use the [`global`] facade, which adds a mutex)
//! - **Fixed region**: the heap never grows; exhaustion is a soft failure
//! - **No relocation**: fragmentation is mitigated by coalescing only
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory
//! management. Allocation and deallocation operations require `unsafe`
//! blocks; the usual malloc-family contracts apply (no double free, no
//! use after free, no foreign pointers).

#![deny(unsafe_op_in_unsafe_fn)]

pub mod align;
mod block;
mod error;
pub mod global;
mod heap;
mod stats;

pub use align::ALIGNMENT;
pub use error::AllocatorError;
pub use heap::{BlockInfo, Blocks, HeapAllocator, DEFAULT_HEAP_SIZE, MIN_BLOCK_SIZE};
pub use stats::HeapStats;
