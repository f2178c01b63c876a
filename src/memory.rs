use crate::ledger::{BlockRecord, DEFAULT_BUCKETS};
#[cfg(debug_assertions)]
use crate::ledger::BlockTable;
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::RefCell;
use std::fmt::{self, Debug, Display};
use std::ptr::NonNull;
use std::rc::Rc;

/// Reasons a heap request could not be satisfied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The underlying heap can not hand out zero-sized blocks.
    ZeroSized,
    /// The requested item count does not fit into a valid layout.
    CapacityOverflow { capacity: usize },
    /// The requested byte size does not fit into a valid layout.
    InvalidLayout { size: usize },
    /// The underlying heap returned null.
    OutOfMemory { size: usize },
    /// The vector is full and was created with a zero growth increment.
    GrowthDisabled,
}

impl Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::ZeroSized => Display::fmt("Zero-sized heap blocks are not supported", f),
            AllocError::CapacityOverflow { capacity } => write!(f, "Capacity of {} items overflows the address space", capacity),
            AllocError::InvalidLayout { size } => write!(f, "Block of {} bytes has no valid layout", size),
            AllocError::OutOfMemory { size } => write!(f, "Heap could not provide {} bytes", size),
            AllocError::GrowthDisabled => Display::fmt("Vector is full and its growth increment is zero", f),
        }
    }
}

impl std::error::Error for AllocError {}

struct TrackerInstance {
    heap: Box<dyn GlobalAlloc>,
    #[cfg(debug_assertions)]
    blocks: BlockTable,
    #[cfg(debug_assertions)]
    outstanding: usize,
}

impl TrackerInstance {
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Err(AllocError::ZeroSized);
        }
        let ptr = NonNull::new(unsafe { self.heap.alloc(layout) })
            .ok_or(AllocError::OutOfMemory { size: layout.size() })?;

        #[cfg(debug_assertions)]
        self.track(ptr, layout.size());

        Ok(ptr)
    }

    unsafe fn release(&mut self, ptr: Option<NonNull<u8>>, layout: Layout) {
        let ptr = match ptr {
            Some(ptr) => ptr,
            None => return,
        };

        #[cfg(debug_assertions)]
        self.untrack(ptr, layout.size());

        self.heap.dealloc(ptr.as_ptr(), layout);
    }

    unsafe fn reallocate(&mut self, ptr: Option<NonNull<u8>>, old_layout: Layout, new_size: usize) -> Result<NonNull<u8>, AllocError> {
        let ptr = match ptr {
            Some(ptr) => ptr,
            None => {
                let layout = Layout::from_size_align(new_size, old_layout.align())
                    .map_err(|_| AllocError::InvalidLayout { size: new_size })?;
                return self.allocate(layout);
            }
        };
        if new_size == 0 {
            return Err(AllocError::ZeroSized);
        }
        Layout::from_size_align(new_size, old_layout.align())
            .map_err(|_| AllocError::InvalidLayout { size: new_size })?;

        #[cfg(debug_assertions)]
        self.expect_tracked(ptr, old_layout.size(), "reallocate");

        let resized = NonNull::new(self.heap.realloc(ptr.as_ptr(), old_layout, new_size))
            .ok_or(AllocError::OutOfMemory { size: new_size })?;

        #[cfg(debug_assertions)]
        {
            if resized == ptr {
                self.resize(ptr, new_size);
            } else {
                self.relocate(ptr, resized, new_size);
            }
        }

        Ok(resized)
    }
}

#[cfg(debug_assertions)]
impl TrackerInstance {
    fn track(&mut self, ptr: NonNull<u8>, size: usize) {
        let address = ptr.as_ptr() as usize;
        if let Some(stale) = self.blocks.insert(address, size) {
            panic!("block {:#x} was handed out while still tracked with {} bytes", address, stale);
        }
        self.outstanding += size;
        debug!("allocating {} bytes, memory allocated {} bytes", size, self.outstanding);
    }

    fn expect_tracked(&self, ptr: NonNull<u8>, size: usize, operation: &str) {
        let address = ptr.as_ptr() as usize;
        match self.blocks.get(address) {
            None => panic!("{} of untracked block {:#x}", operation, address),
            Some(recorded) => assert_eq!(
                recorded, size,
                "{} of block {:#x} with {} bytes, but {} bytes are tracked", operation, address, size, recorded
            ),
        }
    }

    fn untrack(&mut self, ptr: NonNull<u8>, size: usize) {
        self.expect_tracked(ptr, size, "release");
        self.blocks.remove(ptr.as_ptr() as usize);
        self.outstanding -= size;
        debug!("releasing {} bytes, memory allocated {} bytes", size, self.outstanding);
    }

    fn resize(&mut self, ptr: NonNull<u8>, new_size: usize) {
        let address = ptr.as_ptr() as usize;
        let old_size = match self.blocks.get_mut(address) {
            Some(size) => std::mem::replace(size, new_size),
            None => panic!("reallocate of untracked block {:#x}", address),
        };
        self.outstanding = self.outstanding - old_size + new_size;
        self.report_delta(old_size, new_size);
    }

    fn relocate(&mut self, old: NonNull<u8>, new: NonNull<u8>, new_size: usize) {
        let old_size = match self.blocks.remove(old.as_ptr() as usize) {
            Some(size) => size,
            None => panic!("reallocate of untracked block {:#x}", old.as_ptr() as usize),
        };
        if let Some(stale) = self.blocks.insert(new.as_ptr() as usize, new_size) {
            panic!("block {:#x} was handed out while still tracked with {} bytes", new.as_ptr() as usize, stale);
        }
        self.outstanding = self.outstanding - old_size + new_size;
        self.report_delta(old_size, new_size);
    }

    fn report_leaks(&self) -> Vec<BlockRecord> {
        let leaked: Vec<BlockRecord> = self.blocks.iter().copied().collect();
        for record in &leaked {
            warn!("leaked {} bytes at {:#x}", record.size, record.address);
        }
        leaked
    }

    fn report_delta(&self, old_size: usize, new_size: usize) {
        if new_size >= old_size {
            debug!("reallocate: allocating {} bytes, memory allocated {} bytes", new_size - old_size, self.outstanding);
        } else {
            debug!("reallocate: releasing {} bytes, memory allocated {} bytes", old_size - new_size, self.outstanding);
        }
    }
}

#[cfg(debug_assertions)]
impl Drop for TrackerInstance {
    fn drop(&mut self) {
        if !self.blocks.is_empty() {
            self.report_leaks();
            warn!("{} bytes in {} blocks were never released", self.outstanding, self.blocks.len());
        }
    }
}

/// Builder for a `Tracker` with a custom underlying heap or block table size.
pub struct TrackerBuilder {
    heap: Option<Box<dyn GlobalAlloc>>,
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    buckets: usize,
}

impl TrackerBuilder {
    pub fn new() -> TrackerBuilder {
        TrackerBuilder {
            heap: None,
            buckets: DEFAULT_BUCKETS,
        }
    }

    /// Heap the tracker forwards to. Defaults to `std::alloc::System`.
    pub fn heap(mut self, heap: impl GlobalAlloc + 'static) -> TrackerBuilder {
        self.heap = Some(Box::new(heap));
        self
    }

    /// Bucket count of the block table, preferably prime. Zero selects the default.
    pub fn buckets(mut self, count: usize) -> TrackerBuilder {
        self.buckets = count;
        self
    }

    pub fn build(self) -> Tracker {
        let instance = TrackerInstance {
            heap: self.heap.unwrap_or_else(|| Box::new(System)),
            #[cfg(debug_assertions)]
            blocks: BlockTable::with_buckets(self.buckets),
            #[cfg(debug_assertions)]
            outstanding: 0,
        };
        Tracker {
            shared: Rc::new(RefCell::new(instance)),
        }
    }
}

impl Default for TrackerBuilder {
    fn default() -> Self {
        TrackerBuilder::new()
    }
}

/// Heap wrapper that attributes every live block to a running byte total.
///
/// In debug builds each successful allocation is recorded by address, releases and
/// reallocations update the records, and a release of a block this tracker never handed out
/// panics before the heap is touched. In release builds the tracker forwards straight to the heap.
///
/// Clones share the same bookkeeping. The tracker is single-threaded.
#[derive(Clone)]
pub struct Tracker {
    shared: Rc<RefCell<TrackerInstance>>,
}

impl Tracker {
    pub fn new() -> Tracker {
        TrackerBuilder::new().build()
    }

    pub fn builder() -> TrackerBuilder {
        TrackerBuilder::new()
    }

    /// Allocates a block for `layout`. Nothing is recorded if the heap fails.
    #[inline(always)]
    pub fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.shared.borrow_mut().allocate(layout)
    }

    /// Releases a block, does nothing for `None`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from this tracker and `layout` must be the layout it currently has.
    #[inline(always)]
    pub unsafe fn release(&self, ptr: Option<NonNull<u8>>, layout: Layout) {
        self.shared.borrow_mut().release(ptr, layout)
    }

    /// Resizes a block to `new_size` bytes, possibly moving it. `None` allocates a fresh block
    /// aligned like `old_layout`.
    ///
    /// On failure the original block is untouched and still tracked.
    ///
    /// # Safety
    ///
    /// `ptr` must come from this tracker and `old_layout` must be the layout it currently has.
    #[inline(always)]
    pub unsafe fn reallocate(&self, ptr: Option<NonNull<u8>>, old_layout: Layout, new_size: usize) -> Result<NonNull<u8>, AllocError> {
        self.shared.borrow_mut().reallocate(ptr, old_layout, new_size)
    }

    /// Returns true if this build keeps block records.
    pub fn is_tracking(&self) -> bool {
        cfg!(debug_assertions)
    }

    /// Bytes currently attributed to live blocks.
    pub fn outstanding(&self) -> usize {
        #[cfg(debug_assertions)]
        let outstanding = {
            let instance = self.shared.borrow();
            debug_assert_eq!(instance.blocks.total(), instance.outstanding, "running total drifted from block records");
            instance.outstanding
        };
        #[cfg(not(debug_assertions))]
        let outstanding = 0;
        outstanding
    }

    /// Number of live blocks.
    pub fn live_blocks(&self) -> usize {
        #[cfg(debug_assertions)]
        let count = self.shared.borrow().blocks.len();
        #[cfg(not(debug_assertions))]
        let count = 0;
        count
    }

    /// Snapshot of all live blocks, in no particular order.
    pub fn blocks(&self) -> Vec<BlockRecord> {
        #[cfg(debug_assertions)]
        let blocks = self.shared.borrow().blocks.iter().copied().collect();
        #[cfg(not(debug_assertions))]
        let blocks = Vec::new();
        blocks
    }

    /// Reports every live block with `warn!` and returns them.
    ///
    /// Vectors keep their tracker alive, so a leaked vector also keeps the tracker from
    /// reporting on drop. Call this at teardown to see such leaks.
    pub fn report_leaks(&self) -> Vec<BlockRecord> {
        #[cfg(debug_assertions)]
        let leaked = self.shared.borrow().report_leaks();
        #[cfg(not(debug_assertions))]
        let leaked = Vec::new();
        leaked
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Tracker::new()
    }
}

impl Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("outstanding", &self.outstanding())
            .field("live_blocks", &self.live_blocks())
            .finish()
    }
}
