//! Tracked guest allocator.
//!
//! Every allocation made anywhere in the guest module passes through this
//! allocator so a panic inside `observe` can release every outstanding
//! block rather than leaking memory across calls to the same module
//! instance — the module instance, not the call, is long-lived.

use reglet_abi::DEFAULT_MAX_TOTAL_ALLOC_BYTES;
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};

thread_local! {
    static OUTSTANDING: RefCell<Vec<(usize, Layout)>> = RefCell::new(Vec::new());
    /// Set while this allocator is mutating `OUTSTANDING`'s own backing
    /// storage, so a `Vec` growth that reenters `alloc`/`dealloc` skips
    /// bookkeeping instead of hitting a second `borrow_mut` on the same
    /// `RefCell`.
    static TRACKING: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

static TOTAL_BYTES: AtomicUsize = AtomicUsize::new(0);
static CEILING: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_TOTAL_ALLOC_BYTES);

/// Override the total-allocation ceiling. Intended for tests; plugin
/// authors should leave the default (~100 MiB) in place.
pub fn set_ceiling(bytes: usize) {
    CEILING.store(bytes, Ordering::SeqCst);
}

/// Bytes currently allocated and not yet freed, across the whole module.
pub fn total_outstanding() -> usize {
    TOTAL_BYTES.load(Ordering::SeqCst)
}

/// Free every block allocated since the last call and reset the tracked
/// total to zero. The `observe`/`manifest` export wrappers call this after
/// catching a panic; it is a no-op when nothing is outstanding.
pub fn release_all() {
    OUTSTANDING.with(|blocks| {
        let mut blocks = blocks.borrow_mut();
        for (ptr, layout) in blocks.drain(..) {
            unsafe { System.dealloc(ptr as *mut u8, layout) };
        }
    });
    TOTAL_BYTES.store(0, Ordering::SeqCst);
}

/// Runs `f` over the outstanding-blocks list, unless this thread is
/// already inside a `track` call — which happens when growing
/// `OUTSTANDING`'s own backing storage allocates through this same global
/// allocator. The reentrant call sees an unchanged list and the outer call
/// finishes the bookkeeping once it regains control.
fn track(f: impl FnOnce(&mut Vec<(usize, Layout)>)) {
    if TRACKING.with(|flag| flag.replace(true)) {
        return;
    }
    OUTSTANDING.with(|blocks| f(&mut blocks.borrow_mut()));
    TRACKING.with(|flag| flag.set(false));
}

/// A `GlobalAlloc` wrapper around the system allocator enforcing a total
/// outstanding-bytes ceiling and recording every live block.
pub struct TrackedAllocator;

unsafe impl GlobalAlloc for TrackedAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let projected = TOTAL_BYTES.load(Ordering::SeqCst).saturating_add(layout.size());
        if projected > CEILING.load(Ordering::SeqCst) {
            return std::ptr::null_mut();
        }
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            TOTAL_BYTES.fetch_add(layout.size(), Ordering::SeqCst);
            track(|blocks| blocks.push((ptr as usize, layout)));
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        track(|blocks| {
            if let Some(pos) = blocks.iter().position(|(p, _)| *p == ptr as usize) {
                blocks.remove(pos);
            }
        });
        TOTAL_BYTES.fetch_sub(layout.size(), Ordering::SeqCst);
        System.dealloc(ptr, layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These exercise the bookkeeping directly rather than through
    // `#[global_allocator]` — a process can only install one global
    // allocator, and the test binary's is already `System`.

    #[test]
    fn release_all_resets_total_to_zero_even_when_empty() {
        release_all();
        assert_eq!(total_outstanding(), 0);
    }

    #[test]
    fn ceiling_is_configurable() {
        set_ceiling(4096);
        assert_eq!(CEILING.load(Ordering::SeqCst), 4096);
        set_ceiling(DEFAULT_MAX_TOTAL_ALLOC_BYTES);
    }

    #[test]
    fn reentrant_track_call_is_skipped_rather_than_double_borrowing() {
        // Stands in for a `Vec` growth inside the outer `push` reentering
        // this global allocator; without the `TRACKING` guard this would
        // panic on a second `RefCell::borrow_mut`.
        track(|blocks| {
            blocks.push((1, Layout::new::<u8>()));
            track(|inner| inner.push((2, Layout::new::<u8>())));
            assert_eq!(blocks.len(), 1);
        });
        OUTSTANDING.with(|blocks| {
            assert_eq!(blocks.borrow().len(), 1);
            blocks.borrow_mut().clear();
        });
    }
}
