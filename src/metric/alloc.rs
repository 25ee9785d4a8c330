//! Heap accounting for the "Memory Allocated" metric.
//!
//! # Usage
//!
//! Install the allocator in the binary that should be traced:
//!
//! ```rust,ignore
//! #[global_allocator]
//! static ALLOC: spike_trace::metric::CountingAllocator = spike_trace::metric::CountingAllocator;
//! ```
//!
//! The builtin registry only adds the memory metric when it sees that this
//! allocator has served at least one allocation.

use super::definition::MetricDef;
use crate::utils::error::RegistryError;
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

static ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);
static FREED_BYTES: AtomicU64 = AtomicU64::new(0);
static INSTALLED: AtomicBool = AtomicBool::new(false);

const BYTES_PER_MB: f64 = 1e6;

thread_local! {
    // Read inside the allocator: must stay const-initialised and drop-free
    static UNTRACKED_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// A global allocator that counts allocated and freed bytes.
///
/// Wraps `std::alloc::System`; the counters are relaxed atomics so the
/// bookkeeping never blocks. Memory the tracer uses for its own span
/// bookkeeping is not counted (see [`untracked`]).
pub struct CountingAllocator;

impl CountingAllocator {
    #[inline]
    fn tracking() -> bool {
        // During thread teardown the slot may be gone; count as usual
        UNTRACKED_DEPTH.try_with(|depth| depth.get() == 0).unwrap_or(true)
    }

    #[inline]
    fn record_alloc(size: usize) {
        if !INSTALLED.load(Ordering::Relaxed) {
            INSTALLED.store(true, Ordering::Relaxed);
        }
        if Self::tracking() {
            ALLOCATED_BYTES.fetch_add(size as u64, Ordering::Relaxed);
        }
    }

    #[inline]
    fn record_free(size: usize) {
        if Self::tracking() {
            FREED_BYTES.fetch_add(size as u64, Ordering::Relaxed);
        }
    }
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            Self::record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        Self::record_free(layout.size());
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            Self::record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        // A failed realloc leaves the old block in place
        if !new_ptr.is_null() {
            Self::record_free(layout.size());
            Self::record_alloc(new_size);
        }
        new_ptr
    }
}

/// Restores the calling thread's tracking when dropped
struct UntrackedGuard;

impl UntrackedGuard {
    fn enter() -> Self {
        UNTRACKED_DEPTH.with(|depth| depth.set(depth.get() + 1));
        UntrackedGuard
    }
}

impl Drop for UntrackedGuard {
    fn drop(&mut self) {
        UNTRACKED_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Run `f` without counting the allocations and frees it makes on this
/// thread.
///
/// The tracer wraps its own span bookkeeping in this, so the memory metric
/// only sees what the traced code allocates. Calls nest.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _guard = UntrackedGuard::enter();
    f()
}

/// Whether [`CountingAllocator`] is the process's global allocator
pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::Relaxed)
}

/// Counted bytes allocated minus counted bytes freed.
///
/// Can dip below zero when a block allocated inside [`untracked`] is freed
/// outside it; only differences between two readings are meaningful.
pub fn live_bytes() -> i64 {
    let allocated = ALLOCATED_BYTES.load(Ordering::Relaxed);
    let freed = FREED_BYTES.load(Ordering::Relaxed);
    allocated.wrapping_sub(freed) as i64
}

/// "Memory Allocated" metric, in megabytes of live heap
pub fn allocation_metric() -> Result<MetricDef, RegistryError> {
    MetricDef::builder("Memory Allocated", "MB", || live_bytes() as f64 / BYTES_PER_MB).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_without_install() {
        // The test harness uses the system allocator, so nothing is counted
        assert!(!is_installed());
        assert_eq!(live_bytes(), 0);
    }

    #[test]
    fn test_untracked_nests_and_restores() {
        assert!(CountingAllocator::tracking());

        untracked(|| {
            assert!(!CountingAllocator::tracking());
            untracked(|| assert!(!CountingAllocator::tracking()));
            assert!(!CountingAllocator::tracking());
        });

        assert!(CountingAllocator::tracking());
    }

    #[test]
    fn test_allocation_metric_definition() {
        let metric = allocation_metric().unwrap();
        assert_eq!(metric.name(), "Memory Allocated");
        assert_eq!(metric.unit(), "MB");
        assert_eq!(metric.prune_pct(), 0.0);
        assert_eq!(metric.sample(), Some(0.0));
    }
}
