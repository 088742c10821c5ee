//! Construction errors.
//!
//! Only engine construction fails with a `Result`. Per-request failures
//! (out of memory, invalid pointer, double free, size overflow) are soft:
//! the call returns null, emits a single diagnostic line, and leaves the
//! heap untouched.

use thiserror::Error;

/// Errors raised while constructing a [`HeapAllocator`].
///
/// [`HeapAllocator`]: crate::HeapAllocator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocatorError {
  /// The platform allocator refused to provide the requested region.
  #[error("out of host memory: could not obtain a {requested}-byte region")]
  OutOfHostMemory { requested: usize },

  /// The supplied or requested region cannot hold a single block.
  #[error("invalid memory region: {0}")]
  InvalidRegion(&'static str),
}
