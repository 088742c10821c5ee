//! # First-Fit Heap Allocator
//!
//! A free-list allocator managing a single contiguous region of memory.
//! The region is tiled end-to-end by headered blocks forming a doubly
//! linked chain in address order; the chain doubles as the free list.
//!
//! ## Memory Layout
//!
//! ```text
//!                        MANAGED REGION (heap_size bytes)
//!
//!   heap_start                                                  heap_end
//!      │                                                            │
//!      ▼                                                            ▼
//!   ┌────────┬─────────┬────────┬─────────┬────────┬─────────────────┐
//!   │ Header │ Payload │ Header │ Payload │ Header │     Payload     │
//!   │ [USED] │         │ [FREE] │         │ [USED] │                 │
//!   └────────┴─────────┴────────┴─────────┴────────┴─────────────────┘
//!      │                   ▲ │                 ▲
//!      │       next        │ │      next       │
//!      └───────────────────┘ └─────────────────┘
//!              (prev links run the other way)
//! ```
//!
//! Every byte of the region belongs to exactly one block. Blocks are
//! created by splitting a free block during allocation and destroyed by
//! merging neighbours during deallocation.
//!
//! ## Allocation (first fit)
//!
//! ```text
//!   Request: 100 bytes  (rounded up to 104)
//!
//!   ┌────────────┐    ┌────────────┐    ┌────────────┐
//!   │ size: 64   │───►│ size: 4000 │───►│ size: 200  │
//!   │ free: no   │    │ free: yes  │    │ free: yes  │
//!   └────────────┘    └────────────┘    └────────────┘
//!        skip           ✓ first fit
//!
//!   The 4000-byte block is split: a 104-byte block is carved off the
//!   front and the remainder becomes a new free block.
//! ```
//!
//! ## Deallocation (coalescing)
//!
//! ```text
//!   BEFORE free(p):                    AFTER free(p):
//!   [FREE 100][USED p][FREE 300]  ──►  [FREE 100+H+100+H+300]
//!
//!   The freed block absorbs its free forward neighbour, then its free
//!   backward neighbour absorbs the result. At most one neighbour on
//!   each side can be free because the merge invariant held before.
//! ```

use std::fmt::Write as _;
use std::marker::PhantomData;
use std::ptr;

use libc::c_void;

use crate::align;
use crate::block::{Block, HEADER_SIZE};
use crate::error::AllocatorError;
use crate::stats::HeapStats;

/// Minimum payload size of any block, in bytes. Splits that would leave a
/// remainder below `HEADER_SIZE + MIN_BLOCK_SIZE` are skipped.
pub const MIN_BLOCK_SIZE: usize = 16;

/// Heap size used by the global facade when no explicit size is given
/// (1 MiB).
pub const DEFAULT_HEAP_SIZE: usize = 1024 * 1024;

/// A first-fit free-list allocator over a single contiguous region.
///
/// # Example
///
/// ```rust
/// use hallocator::HeapAllocator;
///
/// let mut heap = HeapAllocator::new(4096).unwrap();
///
/// unsafe {
///   let ptr = heap.allocate(64);
///   assert!(!ptr.is_null());
///
///   ptr.write_bytes(0xAB, 64);
///   heap.deallocate(ptr);
/// }
///
/// assert_eq!(heap.stats().used_memory, 0);
/// ```
///
/// # Thread Safety
///
/// The engine is single-threaded: no internal locking, no atomics. It is
/// `Send` (the region is exclusively owned) but not `Sync`; multithreaded
/// callers must provide their own mutual exclusion, as the
/// [`global`](crate::global) facade does.
///
/// # Safety
///
/// Payload pointers handed out by [`allocate`](Self::allocate) are lent to
/// the caller and become invalid on `deallocate`, `reallocate`, `reset`,
/// or engine destruction.
pub struct HeapAllocator {
  /// First byte of the managed region.
  heap_start: *mut u8,

  /// One past the last byte of the managed region.
  heap_end: *mut u8,

  /// Total region size in bytes.
  heap_size: usize,

  /// Head of the block chain; always the block at `heap_start`.
  head: *mut Block,

  /// Accounting record, updated in lockstep with every structural change.
  stats: HeapStats,

  /// Whether `Drop` must return the region to the platform allocator.
  owns_memory: bool,
}

// SAFETY: all internal pointers target the region, which the engine owns
// exclusively. Nothing is shared, so moving the engine to another thread
// is sound. The engine is deliberately not Sync.
unsafe impl Send for HeapAllocator {}

impl HeapAllocator {
  /// Creates an allocator managing a fresh `heap_size`-byte region
  /// obtained from the platform allocator.
  ///
  /// # Errors
  ///
  /// [`AllocatorError::InvalidRegion`] if `heap_size` cannot hold a single
  /// block, [`AllocatorError::OutOfHostMemory`] if the platform refuses
  /// the request.
  pub fn new(heap_size: usize) -> Result<Self, AllocatorError> {
    if heap_size < HEADER_SIZE + MIN_BLOCK_SIZE {
      return Err(AllocatorError::InvalidRegion(
        "heap size cannot hold a single block",
      ));
    }

    // SAFETY: heap_size is non-zero; the null return is handled below.
    let region = unsafe { libc::malloc(heap_size) }.cast::<u8>();
    if region.is_null() {
      return Err(AllocatorError::OutOfHostMemory { requested: heap_size });
    }

    let mut allocator = Self {
      heap_start: region,
      // SAFETY: region points at a live heap_size-byte buffer.
      heap_end: unsafe { region.add(heap_size) },
      heap_size,
      head: ptr::null_mut(),
      stats: HeapStats::default(),
      owns_memory: true,
    };

    // SAFETY: the region was just obtained and is exclusively ours.
    unsafe { allocator.initialize_heap() };

    Ok(allocator)
  }

  /// Creates an allocator managing a caller-supplied region. The region is
  /// not released on drop; its lifetime is the caller's responsibility.
  ///
  /// # Errors
  ///
  /// [`AllocatorError::InvalidRegion`] if `region` is null, not aligned to
  /// [`ALIGNMENT`](crate::ALIGNMENT), or too small to hold a single block.
  ///
  /// # Safety
  ///
  /// `region` must point at `size` bytes of writable memory that stays
  /// valid and untouched by anyone else for the allocator's lifetime.
  pub unsafe fn with_region(
    region: *mut u8,
    size: usize,
  ) -> Result<Self, AllocatorError> {
    if region.is_null() {
      return Err(AllocatorError::InvalidRegion("null region pointer"));
    }
    if region as usize % align::ALIGNMENT != 0 {
      return Err(AllocatorError::InvalidRegion(
        "region pointer is not aligned",
      ));
    }
    if size < HEADER_SIZE + MIN_BLOCK_SIZE {
      return Err(AllocatorError::InvalidRegion(
        "region cannot hold a single block",
      ));
    }

    let mut allocator = Self {
      heap_start: region,
      // SAFETY: the caller guarantees region..region+size is valid.
      heap_end: unsafe { region.add(size) },
      heap_size: size,
      head: ptr::null_mut(),
      stats: HeapStats::default(),
      owns_memory: false,
    };

    // SAFETY: the caller lends us the region exclusively.
    unsafe { allocator.initialize_heap() };

    Ok(allocator)
  }

  /// Installs a single free block spanning the whole region and zeroes the
  /// counters.
  ///
  /// # Safety
  ///
  /// The region fields must describe a live, exclusively owned buffer of
  /// at least `HEADER_SIZE + MIN_BLOCK_SIZE` bytes.
  unsafe fn initialize_heap(&mut self) {
    unsafe {
      let head = self.heap_start.cast::<Block>();
      (*head).size = self.heap_size - HEADER_SIZE;
      (*head).is_free = true;
      (*head).next = ptr::null_mut();
      (*head).prev = ptr::null_mut();

      self.head = head;
      self.stats = HeapStats {
        total_heap_size: self.heap_size,
        free_memory: (*head).size,
        block_count: 1,
        free_block_count: 1,
        ..HeapStats::default()
      };
    }
  }

  /// Discards the block chain and restores the region to a single free
  /// block with zeroed counters.
  ///
  /// Any payload pointers still outstanding become invalid; not handing
  /// them back afterwards is the caller's contract.
  pub fn reset(&mut self) {
    // SAFETY: the region fields were validated at construction and have
    // not changed since.
    unsafe { self.initialize_heap() };
  }

  /// Allocates `size` bytes and returns the payload pointer, or null.
  ///
  /// The size is rounded up to a multiple of the alignment and raised to
  /// [`MIN_BLOCK_SIZE`]; the first free block large enough is used. A
  /// request of zero returns null without touching the heap; an
  /// unsatisfiable request returns null and emits a diagnostic.
  ///
  /// # Safety
  ///
  /// The returned pointer is only valid until it is handed back to
  /// [`deallocate`](Self::deallocate) / [`reallocate`](Self::reallocate)
  /// or the engine is reset or dropped.
  pub unsafe fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    if size == 0 {
      return ptr::null_mut();
    }

    let mut need = align!(size);
    if need < MIN_BLOCK_SIZE {
      need = MIN_BLOCK_SIZE;
    }

    unsafe {
      let block = self.find_free_block(need);
      if block.is_null() {
        log::error!(
          "allocate: out of memory, requested {need} bytes ({} bytes free)",
          self.stats.free_memory
        );
        return ptr::null_mut();
      }

      self.split_block(block, need);

      (*block).is_free = false;

      self.stats.used_memory += (*block).size;
      self.stats.free_memory -= (*block).size;
      self.stats.total_allocations += 1;
      self.stats.free_block_count -= 1;

      Block::payload(block)
    }
  }

  /// Releases the block identified by `payload` and merges it with any
  /// adjacent free neighbours.
  ///
  /// Null is a no-op. A pointer outside the region or a second free of
  /// the same block emits a diagnostic and leaves the heap untouched.
  ///
  /// # Safety
  ///
  /// A non-null `payload` must have been returned by this engine's
  /// [`allocate`](Self::allocate) / [`reallocate`](Self::reallocate) and
  /// not handed back since.
  pub unsafe fn deallocate(
    &mut self,
    payload: *mut u8,
  ) {
    if payload.is_null() {
      return;
    }

    if !self.is_valid_pointer(payload) {
      log::error!("deallocate: pointer {payload:?} is outside the managed region");
      return;
    }

    unsafe {
      let block = Block::from_payload(payload);

      if (*block).is_free {
        log::warn!("deallocate: double free of {payload:?}");
        return;
      }

      self.stats.used_memory -= (*block).size;
      self.stats.free_memory += (*block).size;
      self.stats.total_frees += 1;
      self.stats.free_block_count += 1;

      (*block).is_free = true;

      self.coalesce_block(block);
    }
  }

  /// Resizes the allocation at `payload` to at least `new_size` bytes,
  /// preserving the payload prefix up to the smaller of the two sizes.
  ///
  /// A null `payload` behaves as [`allocate`](Self::allocate); a zero
  /// `new_size` behaves as [`deallocate`](Self::deallocate) and returns
  /// null. Shrinking returns the pointer unchanged without splitting the
  /// tail. Growth first tries to absorb a free forward neighbour and
  /// falls back to relocating; a failed relocation returns null and
  /// leaves the original block intact.
  ///
  /// # Safety
  ///
  /// Same contract as [`deallocate`](Self::deallocate) for non-null
  /// `payload`; the old pointer is invalid after a successful relocation.
  pub unsafe fn reallocate(
    &mut self,
    payload: *mut u8,
    new_size: usize,
  ) -> *mut u8 {
    unsafe {
      if payload.is_null() {
        return self.allocate(new_size);
      }

      if new_size == 0 {
        self.deallocate(payload);
        return ptr::null_mut();
      }

      if !self.is_valid_pointer(payload) {
        log::error!("reallocate: pointer {payload:?} is outside the managed region");
        return ptr::null_mut();
      }

      let block = Block::from_payload(payload);
      let old_size = (*block).size;
      let need = align!(new_size);

      // Shrink or fit in place. The tail is not split back to the free
      // pool, keeping the shrink path O(1).
      if need <= old_size {
        return payload;
      }

      // Expand into the free forward neighbour when the combined payload
      // covers the request. The merged block is not re-split.
      let next = (*block).next;
      if !next.is_null() && (*next).is_free {
        let next_size = (*next).size;
        let combined = old_size + HEADER_SIZE + next_size;
        if combined >= need {
          (*block).size = combined;
          (*block).next = (*next).next;
          if !(*block).next.is_null() {
            (*(*block).next).prev = block;
          }

          // The absorbed payload and its header become used memory.
          self.stats.used_memory += HEADER_SIZE + next_size;
          self.stats.free_memory -= next_size;
          self.stats.block_count -= 1;
          self.stats.free_block_count -= 1;

          return payload;
        }
      }

      // Relocate: allocate fresh, copy the old payload, release the old
      // block. On failure the original allocation is left untouched.
      let new_payload = self.allocate(new_size);
      if new_payload.is_null() {
        return ptr::null_mut();
      }

      ptr::copy_nonoverlapping(payload, new_payload, old_size);
      self.deallocate(payload);

      new_payload
    }
  }

  /// Allocates room for `count` elements of `elem_size` bytes each and
  /// zeroes the entire rounded payload of the returned block.
  ///
  /// Returns null when the product overflows (with a diagnostic) or when
  /// the allocation itself fails.
  ///
  /// # Safety
  ///
  /// Same contract as [`allocate`](Self::allocate).
  pub unsafe fn allocate_zeroed(
    &mut self,
    count: usize,
    elem_size: usize,
  ) -> *mut u8 {
    let total = match count.checked_mul(elem_size) {
      Some(total) => total,
      None => {
        log::error!("allocate_zeroed: {count} x {elem_size} bytes overflows");
        return ptr::null_mut();
      }
    };

    unsafe {
      let payload = self.allocate(total);
      if !payload.is_null() {
        let block = Block::from_payload(payload);
        ptr::write_bytes(payload, 0, (*block).size);
      }
      payload
    }
  }

  /// First-fit search: returns the first free block in chain order whose
  /// payload covers `size`, or null.
  unsafe fn find_free_block(
    &self,
    size: usize,
  ) -> *mut Block {
    unsafe {
      let mut current: *mut Block = self.head;

      while !current.is_null() {
        if (*current).is_free && (*current).size >= size {
          return current;
        }
        current = (*current).next;
      }

      ptr::null_mut()
    }
  }

  /// Carves a `size`-byte block off the front of `block`, turning the
  /// remainder into a new free block linked after it.
  ///
  /// Skipped when the remainder could not hold a header plus a minimum
  /// payload; the caller then keeps the whole block.
  ///
  /// ```text
  ///   BEFORE:  [ Header │            size + H + rest            ]
  ///   AFTER:   [ Header │ size ][ Header │          rest        ]
  ///                               (new free block)
  /// ```
  unsafe fn split_block(
    &mut self,
    block: *mut Block,
    size: usize,
  ) -> bool {
    unsafe {
      debug_assert!((*block).size >= size);

      let remaining = (*block).size - size;
      if remaining < HEADER_SIZE + MIN_BLOCK_SIZE {
        return false;
      }

      let new_block = block.cast::<u8>().add(HEADER_SIZE + size).cast::<Block>();
      (*new_block).size = remaining - HEADER_SIZE;
      (*new_block).is_free = true;
      (*new_block).next = (*block).next;
      (*new_block).prev = block;

      if !(*new_block).next.is_null() {
        (*(*new_block).next).prev = new_block;
      }

      (*block).size = size;
      (*block).next = new_block;

      // The new header consumes a header's worth of formerly free bytes.
      self.stats.free_memory -= HEADER_SIZE;
      self.stats.block_count += 1;
      self.stats.free_block_count += 1;
      self.stats.split_count += 1;

      true
    }
  }

  /// Merges the just-freed `block` with its free neighbours, forward
  /// first, then backward. Each side merges at most once: no two
  /// neighbouring blocks were both free before this call.
  unsafe fn coalesce_block(
    &mut self,
    block: *mut Block,
  ) {
    unsafe {
      let next = (*block).next;
      if !next.is_null() && (*next).is_free {
        debug_assert_eq!(
          next.cast::<u8>(),
          block.cast::<u8>().add(HEADER_SIZE + (*block).size),
        );

        (*block).size += HEADER_SIZE + (*next).size;
        (*block).next = (*next).next;
        if !(*block).next.is_null() {
          (*(*block).next).prev = block;
        }

        self.stats.free_memory += HEADER_SIZE;
        self.stats.block_count -= 1;
        self.stats.free_block_count -= 1;
        self.stats.coalesce_count += 1;
      }

      let prev = (*block).prev;
      if !prev.is_null() && (*prev).is_free {
        debug_assert_eq!(
          block.cast::<u8>(),
          prev.cast::<u8>().add(HEADER_SIZE + (*prev).size),
        );

        (*prev).size += HEADER_SIZE + (*block).size;
        (*prev).next = (*block).next;
        if !(*prev).next.is_null() {
          (*(*prev).next).prev = prev;
        }

        self.stats.free_memory += HEADER_SIZE;
        self.stats.block_count -= 1;
        self.stats.free_block_count -= 1;
        self.stats.coalesce_count += 1;
      }
    }
  }

  /// Range check: true iff `ptr` could be a payload address inside the
  /// managed region. No boundary walk is performed; a crafted interior
  /// pointer passes this check.
  pub fn is_valid_pointer(
    &self,
    ptr: *const u8,
  ) -> bool {
    let p = ptr as usize;
    p >= self.heap_start as usize + HEADER_SIZE && p < self.heap_end as usize
  }

  /// Returns a by-value snapshot of the accounting record.
  pub fn stats(&self) -> HeapStats {
    self.stats
  }

  /// Iterates over the block chain in address order, yielding one
  /// [`BlockInfo`] per block.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      current: self.head,
      heap_start: self.heap_start,
      _marker: PhantomData,
    }
  }

  /// Renders the per-block layout table.
  ///
  /// ```text
  ///   Offset        Size          Status    Block #
  ///   0x00000000           104 B  [USED]    #0
  ///   0x00000088          3928 B  [FREE]    #1
  /// ```
  pub fn render_layout(&self) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  Offset        Size          Status    Block #");
    let _ = writeln!(out, "  ─────────────────────────────────────────────");

    for (index, info) in self.blocks().enumerate() {
      let status = if info.is_free { "[FREE]" } else { "[USED]" };
      let _ = writeln!(
        out,
        "  {:#010x}  {:>12} B  {}    #{}",
        info.offset, info.size, status, index
      );
    }

    out
  }
}

impl Drop for HeapAllocator {
  fn drop(&mut self) {
    if self.owns_memory && !self.heap_start.is_null() {
      // SAFETY: the region came from libc::malloc in `new` and is freed
      // exactly once.
      unsafe { libc::free(self.heap_start.cast::<c_void>()) };
    }
  }
}

/// Shape of one block as reported by [`HeapAllocator::blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Header offset from the start of the region.
  pub offset: usize,
  /// Payload size in bytes.
  pub size: usize,
  /// Whether the block is on the free list.
  pub is_free: bool,
}

/// Iterator over the block chain of a [`HeapAllocator`], in address order.
pub struct Blocks<'a> {
  current: *mut Block,
  heap_start: *mut u8,
  _marker: PhantomData<&'a HeapAllocator>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    if self.current.is_null() {
      return None;
    }

    // SAFETY: current points at a live header inside the region of the
    // borrowed engine, which cannot mutate while this iterator exists.
    unsafe {
      let info = BlockInfo {
        offset: self.current as usize - self.heap_start as usize,
        size: (*self.current).size,
        is_free: (*self.current).is_free,
      };
      self.current = (*self.current).next;
      Some(info)
    }
  }
}
