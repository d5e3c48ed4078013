//! Ordered-set cursors.
//!
//! A set symbol is traversed through a [`SetCursor`]: a forward-only iterator
//! over opaque byte keys, one per set member. Cursors compose without
//! modifying each other:
//! - [`FilteredCursor`] skips members rejected by a predicate
//! - [`UnionSetCursor`] merges two sorted cursors, de-duplicating keys
//! - [`TreeSet`] materializes keys into an ordered set and hands out a [`TreeCursor`]
//! - [`SliceSetCursor`] walks a pre-sorted vector of keys

mod filtered;
mod tree;
mod union;

pub use filtered::FilteredCursor;
pub use tree::{TreeCursor, TreeSet};
pub use union::UnionSetCursor;

use crate::types::SortOrder;

/// Forward-only cursor over the member keys of a set.
pub trait SetCursor {
    /// Advances to the next member. No-op once the cursor is invalid.
    fn next(&mut self);

    /// Returns true while the cursor is positioned on a member.
    fn is_valid(&self) -> bool;

    /// Returns the key of the current member, or None once exhausted.
    fn current(&self) -> Option<&[u8]>;

    /// Returns the seekable view of this cursor, if it supports seeking.
    fn as_seekable(&mut self) -> Option<&mut dyn SeekableSetCursor> {
        None
    }
}

/// A cursor that can be positioned directly on a key.
pub trait SeekableSetCursor: SetCursor {
    /// Positions the cursor on the first key not before `key` in the
    /// cursor's traversal order. The position is absolute; seeking backwards is allowed.
    fn seek(&mut self, key: &[u8]);
}

impl<C: SetCursor + ?Sized> SetCursor for Box<C> {
    fn next(&mut self) {
        (**self).next();
    }

    fn is_valid(&self) -> bool {
        (**self).is_valid()
    }

    fn current(&self) -> Option<&[u8]> {
        (**self).current()
    }

    fn as_seekable(&mut self) -> Option<&mut dyn SeekableSetCursor> {
        (**self).as_seekable()
    }
}

/// Counts the remaining members of a cursor, consuming it.
pub fn count_members(cursor: &mut dyn SetCursor) -> i64 {
    let mut count = 0;
    while cursor.is_valid() {
        count += 1;
        cursor.next();
    }
    count
}

/// Collects the remaining keys of a cursor, consuming it.
pub fn collect_keys(cursor: &mut dyn SetCursor) -> Vec<Vec<u8>> {
    let mut keys = Vec::new();
    while let Some(key) = cursor.current() {
        keys.push(key.to_vec());
        cursor.next();
    }
    keys
}

/// A cursor over nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCursor;

impl SetCursor for EmptyCursor {
    fn next(&mut self) {}

    fn is_valid(&self) -> bool {
        false
    }

    fn current(&self) -> Option<&[u8]> {
        None
    }
}

/// Cursor over a fixed, already sorted vector of keys.
#[derive(Debug, Clone)]
pub struct SliceSetCursor {
    keys: Vec<Vec<u8>>,
    order: SortOrder,
    pos: usize,
}

impl SliceSetCursor {
    /// Creates an ascending cursor. The keys must already be sorted ascending.
    #[must_use]
    pub fn new(keys: Vec<Vec<u8>>) -> Self {
        Self::with_order(keys, SortOrder::Ascending)
    }

    /// Creates a cursor whose keys are sorted in `order`.
    #[must_use]
    pub fn with_order(keys: Vec<Vec<u8>>, order: SortOrder) -> Self {
        SliceSetCursor {
            keys,
            order,
            pos: 0,
        }
    }

    /// Sorts and de-duplicates `keys` before creating the cursor.
    #[must_use]
    pub fn sorted(mut keys: Vec<Vec<u8>>, order: SortOrder) -> Self {
        keys.sort_unstable_by(|a, b| order.apply(a.cmp(b)));
        keys.dedup();
        Self::with_order(keys, order)
    }
}

impl SetCursor for SliceSetCursor {
    fn next(&mut self) {
        if self.pos < self.keys.len() {
            self.pos += 1;
        }
    }

    fn is_valid(&self) -> bool {
        self.pos < self.keys.len()
    }

    fn current(&self) -> Option<&[u8]> {
        self.keys.get(self.pos).map(Vec::as_slice)
    }

    fn as_seekable(&mut self) -> Option<&mut dyn SeekableSetCursor> {
        Some(self)
    }
}

impl SeekableSetCursor for SliceSetCursor {
    fn seek(&mut self, key: &[u8]) {
        let order = self.order;
        self.pos = self
            .keys
            .partition_point(|k| order.apply(k.as_slice().cmp(key)).is_lt());
    }
}
