//! This module is for testing only

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::ptr::null_mut;
use std::rc::Rc;

/// Heap that forwards to `System` until its budget of successful allocations and
/// reallocations is spent, then returns null. Clones share the budget.
#[derive(Clone)]
pub struct BudgetHeap {
    remaining: Rc<Cell<usize>>,
}

impl BudgetHeap {
    pub fn new(calls: usize) -> BudgetHeap {
        BudgetHeap {
            remaining: Rc::new(Cell::new(calls)),
        }
    }

    pub fn refill(&self, calls: usize) {
        self.remaining.set(calls);
    }

    pub fn remaining(&self) -> usize {
        self.remaining.get()
    }

    fn spend(&self) -> bool {
        match self.remaining.get() {
            0 => false,
            left => {
                self.remaining.set(left - 1);
                true
            },
        }
    }
}

unsafe impl GlobalAlloc for BudgetHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if self.spend() { System.alloc(layout) } else { null_mut() }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if self.spend() { System.realloc(ptr, layout, new_size) } else { null_mut() }
    }
}

/// Heap whose reallocation always moves the block to a fresh address.
pub struct RelocatingHeap;

unsafe impl GlobalAlloc for RelocatingHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_layout = Layout::from_size_align_unchecked(new_size, layout.align());
        let moved = System.alloc(new_layout);
        if !moved.is_null() {
            std::ptr::copy_nonoverlapping(ptr, moved, layout.size().min(new_size));
            System.dealloc(ptr, layout);
        }
        moved
    }
}

#[cfg(feature = "logging")]
mod capture {
    use std::sync::{Mutex, Once};

    static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());
    static INSTALL: Once = Once::new();

    struct WarningCapture;

    impl log::Log for WarningCapture {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                LINES.lock().expect("lock").push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static LOGGER: WarningCapture = WarningCapture;

    /// Installs the capturing logger on first use and returns every warning seen so far.
    pub fn captured_warnings() -> Vec<String> {
        INSTALL.call_once(|| {
            if log::set_logger(&LOGGER).is_ok() {
                log::set_max_level(log::LevelFilter::Warn);
            }
        });
        LINES.lock().expect("lock").clone()
    }
}

#[cfg(feature = "logging")]
pub use capture::captured_warnings;

#[test]
fn budget_runs_out() {
    let heap = BudgetHeap::new(1);
    let layout = Layout::new::<u64>();
    unsafe {
        let ptr = heap.alloc(layout);
        assert!(!ptr.is_null());
        assert_eq!(0, heap.remaining());
        assert!(heap.alloc(layout).is_null());
        heap.dealloc(ptr, layout);
    }
    heap.refill(2);
    assert_eq!(2, heap.remaining());
}
