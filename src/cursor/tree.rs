//! Tree-backed ordered set of byte keys.

use std::collections::BTreeSet;
use std::ops::Bound;

use super::{SeekableSetCursor, SetCursor};
use crate::types::SortOrder;

/// An ordered set of byte keys, traversed ascending or descending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSet {
    keys: BTreeSet<Vec<u8>>,
    order: SortOrder,
}

impl TreeSet {
    /// Creates an empty set traversed in `order`.
    #[must_use]
    pub fn new(order: SortOrder) -> Self {
        TreeSet {
            keys: BTreeSet::new(),
            order,
        }
    }

    /// Materializes the remaining keys of a cursor.
    pub fn from_cursor(cursor: &mut dyn SetCursor, order: SortOrder) -> Self {
        let mut set = TreeSet::new(order);
        while let Some(key) = cursor.current() {
            set.insert(key.to_vec());
            cursor.next();
        }
        set
    }

    /// Inserts a key. Returns false if it was already present.
    pub fn insert(&mut self, key: Vec<u8>) -> bool {
        self.keys.insert(key)
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.keys.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the traversal order.
    #[must_use]
    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Converts the set into a cursor positioned on its first key.
    #[must_use]
    pub fn into_cursor(self) -> TreeCursor {
        let current = match self.order {
            SortOrder::Ascending => self.keys.first().cloned(),
            SortOrder::Descending => self.keys.last().cloned(),
        };
        TreeCursor {
            keys: self.keys,
            order: self.order,
            current,
        }
    }
}

impl FromIterator<Vec<u8>> for TreeSet {
    fn from_iter<I: IntoIterator<Item = Vec<u8>>>(iter: I) -> Self {
        TreeSet {
            keys: iter.into_iter().collect(),
            order: SortOrder::Ascending,
        }
    }
}

/// Owning cursor over a [`TreeSet`].
#[derive(Debug, Clone)]
pub struct TreeCursor {
    keys: BTreeSet<Vec<u8>>,
    order: SortOrder,
    current: Option<Vec<u8>>,
}

impl SetCursor for TreeCursor {
    fn next(&mut self) {
        let Some(current) = self.current.take() else {
            return;
        };
        let bound = Bound::Excluded(current.as_slice());
        self.current = match self.order {
            SortOrder::Ascending => self
                .keys
                .range::<[u8], _>((bound, Bound::Unbounded))
                .next()
                .cloned(),
            SortOrder::Descending => self
                .keys
                .range::<[u8], _>((Bound::Unbounded, bound))
                .next_back()
                .cloned(),
        };
    }

    fn is_valid(&self) -> bool {
        self.current.is_some()
    }

    fn current(&self) -> Option<&[u8]> {
        self.current.as_deref()
    }

    fn as_seekable(&mut self) -> Option<&mut dyn SeekableSetCursor> {
        Some(self)
    }
}

impl SeekableSetCursor for TreeCursor {
    fn seek(&mut self, key: &[u8]) {
        let bound = Bound::Included(key);
        self.current = match self.order {
            SortOrder::Ascending => self
                .keys
                .range::<[u8], _>((bound, Bound::Unbounded))
                .next()
                .cloned(),
            SortOrder::Descending => self
                .keys
                .range::<[u8], _>((Bound::Unbounded, bound))
                .next_back()
                .cloned(),
        };
    }
}
