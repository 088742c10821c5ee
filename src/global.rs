//! Process-wide convenience facade.
//!
//! Owns a singleton [`HeapAllocator`] behind a mutex and forwards the
//! classic allocation entry points to it. The allocating entry points
//! ([`malloc`], [`realloc`], [`calloc`]) lazily create the singleton with
//! [`DEFAULT_HEAP_SIZE`] on first use; [`free`] on an uninitialised facade
//! is a no-op. [`init`] replaces any existing instance and [`teardown`]
//! releases it.
//!
//! The mutex is the external mutual exclusion the single-threaded engine
//! requires of multithreaded callers; the engine itself stays lock-free.

use std::ptr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::AllocatorError;
use crate::heap::{HeapAllocator, DEFAULT_HEAP_SIZE};
use crate::stats::HeapStats;

static ALLOCATOR: Mutex<Option<HeapAllocator>> = Mutex::new(None);

/// Locks the singleton slot. Poisoning is absorbed: a panic elsewhere
/// never turns facade calls into panics.
fn lock() -> MutexGuard<'static, Option<HeapAllocator>> {
  ALLOCATOR.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lazily creates the singleton with [`DEFAULT_HEAP_SIZE`].
fn ensure(slot: &mut Option<HeapAllocator>) -> Option<&mut HeapAllocator> {
  if slot.is_none() {
    match HeapAllocator::new(DEFAULT_HEAP_SIZE) {
      Ok(allocator) => *slot = Some(allocator),
      Err(err) => {
        log::error!("global allocator: lazy initialisation failed: {err}");
        return None;
      }
    }
  }
  slot.as_mut()
}

/// Creates the process-wide allocator with an explicit heap size,
/// replacing (and releasing) any existing instance.
///
/// # Errors
///
/// Forwards [`HeapAllocator::new`] construction errors; on error any
/// previous instance is left in place.
pub fn init(heap_size: usize) -> Result<(), AllocatorError> {
  let allocator = HeapAllocator::new(heap_size)?;
  *lock() = Some(allocator);
  Ok(())
}

/// Releases the process-wide allocator. All payload pointers obtained
/// through the facade become invalid.
pub fn teardown() {
  lock().take();
}

/// Returns a statistics snapshot of the process-wide allocator, or `None`
/// when it has not been initialised.
pub fn stats() -> Option<HeapStats> {
  lock().as_ref().map(HeapAllocator::stats)
}

/// Allocates `size` bytes from the process-wide allocator.
///
/// # Safety
///
/// Same contract as [`HeapAllocator::allocate`]; additionally the pointer
/// becomes invalid on [`teardown`] or a subsequent [`init`].
pub unsafe fn malloc(size: usize) -> *mut u8 {
  let mut slot = lock();
  match ensure(&mut slot) {
    // SAFETY: forwarded under the facade lock.
    Some(allocator) => unsafe { allocator.allocate(size) },
    None => ptr::null_mut(),
  }
}

/// Returns `payload` to the process-wide allocator. A no-op when the
/// facade has never been initialised.
///
/// # Safety
///
/// Same contract as [`HeapAllocator::deallocate`].
pub unsafe fn free(payload: *mut u8) {
  let mut slot = lock();
  if let Some(allocator) = slot.as_mut() {
    // SAFETY: forwarded under the facade lock.
    unsafe { allocator.deallocate(payload) };
  }
}

/// Resizes `payload` within the process-wide allocator.
///
/// # Safety
///
/// Same contract as [`HeapAllocator::reallocate`].
pub unsafe fn realloc(
  payload: *mut u8,
  new_size: usize,
) -> *mut u8 {
  let mut slot = lock();
  match ensure(&mut slot) {
    // SAFETY: forwarded under the facade lock.
    Some(allocator) => unsafe { allocator.reallocate(payload, new_size) },
    None => ptr::null_mut(),
  }
}

/// Allocates zeroed room for `count` elements of `elem_size` bytes from
/// the process-wide allocator.
///
/// # Safety
///
/// Same contract as [`HeapAllocator::allocate_zeroed`].
pub unsafe fn calloc(
  count: usize,
  elem_size: usize,
) -> *mut u8 {
  let mut slot = lock();
  match ensure(&mut slot) {
    // SAFETY: forwarded under the facade lock.
    Some(allocator) => unsafe { allocator.allocate_zeroed(count, elem_size) },
    None => ptr::null_mut(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // The facade is process-wide state, so everything is exercised in one
  // sequential test to keep the harness's parallel runner away from it.
  #[test]
  fn facade_round_trip() {
    teardown();
    assert!(stats().is_none());

    // Explicit initialisation with a small heap.
    init(4096).unwrap();
    assert_eq!(stats().unwrap().total_heap_size, 4096);

    unsafe {
      let p = malloc(64);
      assert!(!p.is_null());
      ptr::write_bytes(p, 0x42, 64);

      let zeroed = calloc(4, 8);
      assert!(!zeroed.is_null());
      for i in 0..32 {
        assert_eq!(zeroed.add(i).read(), 0);
      }

      let grown = realloc(p, 256);
      assert!(!grown.is_null());
      assert_eq!(grown.read(), 0x42);

      free(grown);
      free(zeroed);
    }

    let stats_after = stats().unwrap();
    assert_eq!(stats_after.used_memory, 0);
    assert_eq!(stats_after.active_allocations(), 0);

    // Re-initialisation replaces the instance.
    init(8192).unwrap();
    assert_eq!(stats().unwrap().total_heap_size, 8192);

    // After teardown, free is a no-op and malloc lazily re-creates the
    // singleton with the default heap size.
    teardown();
    unsafe {
      free(ptr::null_mut());
      let p = malloc(16);
      assert!(!p.is_null());
      free(p);
    }
    assert_eq!(stats().unwrap().total_heap_size, DEFAULT_HEAP_SIZE);

    teardown();
    assert!(stats().is_none());
  }
}
