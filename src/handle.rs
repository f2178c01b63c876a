//! Handle-style calls over `Option<Vector>` for front ends that report failures
//! as sentinels instead of `Result`s.
//!
//! An absent vector is `None`. Every call accepts it and answers with a no-op,
//! `false`, or one of the sentinels below; none of them panic.

use crate::{Item, Tracker, Vector};

/// Returned instead of a position when there is none.
pub const INVALID_POSITION: usize = usize::MAX;

/// Returned by `length` for an absent vector.
pub const INVALID_LENGTH: usize = usize::MAX;

pub fn create(memory: &Tracker, capacity: usize, alloc_step: usize) -> Option<Vector> {
    match Vector::new(memory, capacity, alloc_step) {
        Ok(vector) => Some(vector),
        Err(e) => {
            debug!("create failed: {}", e);
            None
        },
    }
}

pub fn copy(source: Option<&Vector>) -> Option<Vector> {
    match source?.copy() {
        Ok(vector) => Some(vector),
        Err(e) => {
            debug!("copy failed: {}", e);
            None
        },
    }
}

pub fn length(vector: Option<&Vector>) -> usize {
    vector.map_or(INVALID_LENGTH, Vector::len)
}

/// Writes the item at `position` to `value` and returns true, or returns false if the vector
/// or the output slot is absent, or `position` is out of range.
pub fn at(vector: Option<&Vector>, position: usize, value: Option<&mut Item>) -> bool {
    match (vector.and_then(|v| v.at(position)), value) {
        (Some(item), Some(out)) => {
            *out = item;
            true
        },
        _ => false,
    }
}

pub fn set(vector: Option<&mut Vector>, position: usize, value: Item) {
    if let Some(vector) = vector {
        vector.set(position, value);
    }
}

pub fn append(vector: Option<&mut Vector>, value: Item) -> usize {
    match vector.map(|v| v.append(value)) {
        Some(Ok(position)) => position,
        Some(Err(e)) => {
            debug!("append failed: {}", e);
            INVALID_POSITION
        },
        None => INVALID_POSITION,
    }
}

pub fn remove(vector: Option<&mut Vector>, position: usize) -> bool {
    vector.map_or(false, |v| v.remove(position))
}

pub fn contains(vector: Option<&Vector>, value: Item) -> bool {
    vector.map_or(false, |v| v.contains(value))
}

pub fn index_of(vector: Option<&Vector>, value: Item, from: usize) -> usize {
    vector
        .and_then(|v| v.index_of(value, from))
        .unwrap_or(INVALID_POSITION)
}

pub fn fill(vector: Option<&mut Vector>, value: Item, start: usize, end: usize) {
    if let Some(vector) = vector {
        vector.fill(value, start, end);
    }
}

pub fn clear(vector: Option<&mut Vector>) {
    if let Some(vector) = vector {
        vector.clear();
    }
}

/// Releases the vector and leaves `None` in the handle.
pub fn destroy(handle: &mut Option<Vector>) {
    if let Some(vector) = handle.take() {
        std::mem::drop(vector);
    }
}
