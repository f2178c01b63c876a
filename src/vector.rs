use crate::{AllocError, Tracker};
use std::alloc::Layout;
use std::fmt::Debug;
use std::ptr::NonNull;

/// Element type stored in a `Vector`.
pub type Item = u64;

/// Growable array of `Item`s backed by a buffer from a `Tracker`.
///
/// When the buffer is full, `append` grows it by exactly `alloc_step` slots. Growth is
/// arithmetic, never doubling, so memory use stays predictable at the cost of more frequent
/// reallocation. Removing items never shrinks the buffer; `clear` releases it.
///
/// The buffer is released when the `Vector` is dropped.
pub struct Vector {
    memory: Tracker,
    items: Option<NonNull<Item>>,
    capacity: usize,
    len: usize,
    alloc_step: usize,
}

impl Vector {
    fn layout_for(capacity: usize) -> Result<Layout, AllocError> {
        Layout::array::<Item>(capacity).map_err(|_| AllocError::CapacityOverflow { capacity })
    }

    /// Creates an empty vector with room for `capacity` items that grows by `alloc_step` items.
    ///
    /// With `alloc_step` of zero the vector never grows past `capacity`.
    pub fn new(memory: &Tracker, capacity: usize, alloc_step: usize) -> Result<Vector, AllocError> {
        let items = if capacity == 0 {
            None
        } else {
            Some(memory.allocate(Self::layout_for(capacity)?)?.cast::<Item>())
        };
        Ok(Vector {
            memory: memory.clone(),
            items,
            capacity,
            len: 0,
            alloc_step,
        })
    }

    /// Creates an independent vector with the same capacity, growth increment and items.
    pub fn copy(&self) -> Result<Vector, AllocError> {
        let mut copy = Vector::new(&self.memory, self.capacity, self.alloc_step)?;
        if let (Some(from), Some(to)) = (self.items, copy.items) {
            unsafe { std::ptr::copy_nonoverlapping(from.as_ptr(), to.as_ptr(), self.len) };
        }
        copy.len = self.len;
        Ok(copy)
    }

    /// Number of items in the vector.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of item slots in the buffer.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots added each time the buffer runs full.
    #[inline(always)]
    pub fn alloc_step(&self) -> usize {
        self.alloc_step
    }

    /// The tracker this vector allocates from.
    pub fn memory(&self) -> &Tracker {
        &self.memory
    }

    pub fn as_slice(&self) -> &[Item] {
        match self.items {
            Some(items) => unsafe { std::slice::from_raw_parts(items.as_ptr(), self.len) },
            None => &[],
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [Item] {
        match self.items {
            Some(items) => unsafe { std::slice::from_raw_parts_mut(items.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item=&Item> {
        self.as_slice().iter()
    }

    /// Returns the item at `position`, or `None` past the end.
    #[inline(always)]
    pub fn at(&self, position: usize) -> Option<Item> {
        self.as_slice().get(position).copied()
    }

    /// Overwrites the item at `position`. Does nothing past the end.
    pub fn set(&mut self, position: usize, value: Item) {
        if let Some(slot) = self.as_mut_slice().get_mut(position) {
            *slot = value;
        }
    }

    /// Appends `value` and returns its position.
    ///
    /// If the buffer has to grow and the reallocation fails, the vector is left as it was.
    pub fn append(&mut self, value: Item) -> Result<usize, AllocError> {
        if self.len == self.capacity {
            self.grow()?;
        }
        let position = self.len;
        match self.items {
            Some(items) => unsafe { items.as_ptr().add(position).write(value) },
            None => unreachable!("buffer exists after successful growth"),
        }
        self.len += 1;
        Ok(position)
    }

    fn grow(&mut self) -> Result<(), AllocError> {
        if self.alloc_step == 0 {
            return Err(AllocError::GrowthDisabled);
        }
        let capacity = self.capacity.checked_add(self.alloc_step)
            .ok_or(AllocError::CapacityOverflow { capacity: usize::MAX })?;
        let new_layout = Self::layout_for(capacity)?;
        let old_layout = Self::layout_for(self.capacity)?;
        let items = unsafe {
            self.memory.reallocate(self.items.map(NonNull::cast::<u8>), old_layout, new_layout.size())?
        };
        trace!("grow vector from {} to {} items", self.capacity, capacity);
        self.items = Some(items.cast::<Item>());
        self.capacity = capacity;
        Ok(())
    }

    /// Removes the item at `position`, shifting the following items one slot left.
    ///
    /// Returns false if `position` is past the end. Capacity is unchanged.
    pub fn remove(&mut self, position: usize) -> bool {
        if position >= self.len {
            return false;
        }
        self.as_mut_slice().copy_within(position + 1.., position);
        self.len -= 1;
        true
    }

    pub fn contains(&self, value: Item) -> bool {
        self.as_slice().contains(&value)
    }

    /// Position of the first `value` at or after `from`.
    pub fn index_of(&self, value: Item, from: usize) -> Option<usize> {
        self.as_slice()
            .get(from..)?
            .iter()
            .position(|item| *item == value)
            .map(|offset| from + offset)
    }

    /// Overwrites positions `start..=end` with `value`.
    ///
    /// `end` past the last item is clamped to it; nothing happens if `start` is past the end
    /// or `end < start`. The length never changes.
    pub fn fill(&mut self, value: Item, start: usize, end: usize) {
        if start >= self.len || end < start {
            return;
        }
        let last = end.min(self.len - 1);
        self.as_mut_slice()[start..=last].fill(value);
    }

    /// Releases the buffer and resets capacity and length to zero. The growth increment stays.
    pub fn clear(&mut self) {
        if let Some(items) = self.items.take() {
            let layout = Self::layout_for(self.capacity)
                .expect("layout of an allocated buffer is valid");
            unsafe { self.memory.release(Some(items.cast::<u8>()), layout) };
        }
        self.capacity = 0;
        self.len = 0;
    }
}

impl Drop for Vector {
    fn drop(&mut self) {
        trace!("drop vector with {} items", self.len);
        self.clear();
    }
}

impl Debug for Vector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl PartialEq for Vector {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice().eq(other.as_slice())
    }
}

impl PartialEq<[Item]> for Vector {
    fn eq(&self, other: &[Item]) -> bool {
        self.as_slice().eq(other)
    }
}

impl Eq for Vector {}
