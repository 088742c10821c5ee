//! Memory usage and fragmentation statistics.
//!
//! The allocator keeps a [`HeapStats`] record in lockstep with every
//! structural change to the block chain. [`HeapAllocator::stats`] hands out
//! a by-value snapshot; the [`Display`] implementation renders the boxed
//! report the demo binary prints between scenarios.
//!
//! [`HeapAllocator::stats`]: crate::HeapAllocator::stats
//! [`Display`]: std::fmt::Display

use std::fmt;

/// Statistics about memory usage and fragmentation.
///
/// Between public operations the record satisfies the accounting identity
///
/// ```text
/// used_memory + free_memory + block_count * HEADER_SIZE == total_heap_size
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
  /// Total size of the managed region in bytes.
  pub total_heap_size: usize,
  /// Sum of the payload sizes of all allocated blocks.
  pub used_memory: usize,
  /// Sum of the payload sizes of all free blocks.
  pub free_memory: usize,
  /// Number of successful allocations over the engine's lifetime.
  pub total_allocations: usize,
  /// Number of successful deallocations over the engine's lifetime.
  pub total_frees: usize,
  /// Total number of blocks in the chain.
  pub block_count: usize,
  /// Number of free blocks in the chain.
  pub free_block_count: usize,
  /// Number of merges performed while freeing.
  pub coalesce_count: usize,
  /// Number of splits performed while allocating.
  pub split_count: usize,
}

impl HeapStats {
  /// Fragmentation as a percentage in `0..=100`.
  ///
  /// A single free block means no fragmentation; the figure grows with the
  /// number of separate free blocks.
  pub fn fragmentation_ratio(&self) -> f64 {
    if self.free_block_count < 2 {
      return 0.0;
    }
    (self.free_block_count - 1) as f64 / self.free_block_count as f64 * 100.0
  }

  /// Number of allocations that have not been freed yet.
  pub fn active_allocations(&self) -> usize {
    self.total_allocations - self.total_frees
  }
}

impl fmt::Display for HeapStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "╔══════════════════════════════════════════╗")?;
    writeln!(f, "║           HEAP ALLOCATOR STATISTICS      ║")?;
    writeln!(f, "╠══════════════════════════════════════════╣")?;
    writeln!(f, "║  Heap Size:          {:>12} bytes  ║", self.total_heap_size)?;
    writeln!(f, "║  Used Memory:        {:>12} bytes  ║", self.used_memory)?;
    writeln!(f, "║  Free Memory:        {:>12} bytes  ║", self.free_memory)?;
    writeln!(f, "╠══════════════════════════════════════════╣")?;
    writeln!(f, "║  Total Allocations:  {:>12}        ║", self.total_allocations)?;
    writeln!(f, "║  Total Frees:        {:>12}        ║", self.total_frees)?;
    writeln!(f, "║  Active Allocations: {:>12}        ║", self.active_allocations())?;
    writeln!(f, "╠══════════════════════════════════════════╣")?;
    writeln!(f, "║  Total Blocks:       {:>12}        ║", self.block_count)?;
    writeln!(f, "║  Free Blocks:        {:>12}        ║", self.free_block_count)?;
    writeln!(f, "║  Split Operations:   {:>12}        ║", self.split_count)?;
    writeln!(f, "║  Coalesce Operations:{:>12}        ║", self.coalesce_count)?;
    writeln!(f, "╠══════════════════════════════════════════╣")?;
    writeln!(f, "║  Fragmentation:      {:>11.2}%        ║", self.fragmentation_ratio())?;
    write!(f, "╚══════════════════════════════════════════╝")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fragmentation_is_zero_with_fewer_than_two_free_blocks() {
    let mut stats = HeapStats::default();
    assert_eq!(stats.fragmentation_ratio(), 0.0);

    stats.free_block_count = 1;
    assert_eq!(stats.fragmentation_ratio(), 0.0);
  }

  #[test]
  fn fragmentation_grows_with_free_block_count() {
    let mut stats = HeapStats {
      free_block_count: 2,
      ..HeapStats::default()
    };
    assert_eq!(stats.fragmentation_ratio(), 50.0);

    stats.free_block_count = 4;
    assert_eq!(stats.fragmentation_ratio(), 75.0);

    stats.free_block_count = 100;
    assert_eq!(stats.fragmentation_ratio(), 99.0);
  }

  #[test]
  fn active_allocations_is_the_difference_of_the_counters() {
    let stats = HeapStats {
      total_allocations: 7,
      total_frees: 3,
      ..HeapStats::default()
    };
    assert_eq!(stats.active_allocations(), 4);
  }

  #[test]
  fn report_renders_the_key_figures() {
    let stats = HeapStats {
      total_heap_size: 4096,
      used_memory: 1024,
      free_memory: 2976,
      total_allocations: 5,
      total_frees: 2,
      block_count: 4,
      free_block_count: 2,
      coalesce_count: 1,
      split_count: 5,
    };

    let report = stats.to_string();
    assert!(report.contains("4096"));
    assert!(report.contains("1024"));
    assert!(report.contains("2976"));
    assert!(report.contains("50.00%"));
  }
}
