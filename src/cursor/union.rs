//! Sorted merge of two cursors.

use std::cmp::Ordering;

use super::SetCursor;
use crate::types::SortOrder;

/// Merges two cursors that are both sorted in `order`, byte-lexicographically.
///
/// Keys present in both inputs are emitted once.
pub struct UnionSetCursor<'a> {
    left: Box<dyn SetCursor + 'a>,
    right: Box<dyn SetCursor + 'a>,
    order: SortOrder,
    from_left: bool,
}

impl<'a> UnionSetCursor<'a> {
    /// Creates the union of `left` and `right`.
    #[must_use]
    pub fn new(
        left: Box<dyn SetCursor + 'a>,
        right: Box<dyn SetCursor + 'a>,
        order: SortOrder,
    ) -> Self {
        let mut cursor = UnionSetCursor {
            left,
            right,
            order,
            from_left: true,
        };
        cursor.select();
        cursor
    }

    fn select(&mut self) {
        self.from_left = match (self.left.current(), self.right.current()) {
            (Some(l), Some(r)) => self.order.apply(l.cmp(r)) != Ordering::Greater,
            (Some(_), None) | (None, None) => true,
            (None, Some(_)) => false,
        };
    }
}

impl SetCursor for UnionSetCursor<'_> {
    fn next(&mut self) {
        let (advance_left, advance_right) = match (self.left.current(), self.right.current()) {
            (Some(l), Some(r)) if l == r => (true, true),
            (Some(_), _) if self.from_left => (true, false),
            (_, Some(_)) => (false, true),
            _ => (false, false),
        };
        if advance_left {
            self.left.next();
        }
        if advance_right {
            self.right.next();
        }
        self.select();
    }

    fn is_valid(&self) -> bool {
        self.left.is_valid() || self.right.is_valid()
    }

    fn current(&self) -> Option<&[u8]> {
        if self.from_left {
            self.left.current()
        } else {
            self.right.current()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{collect_keys, EmptyCursor, SliceSetCursor};

    fn cursor(items: &[u8], order: SortOrder) -> Box<dyn SetCursor> {
        Box::new(SliceSetCursor::sorted(
            items.iter().map(|b| vec![*b]).collect(),
            order,
        ))
    }

    #[test]
    fn test_ascending_union_dedups() {
        let mut union = UnionSetCursor::new(
            cursor(&[1, 3, 5], SortOrder::Ascending),
            cursor(&[2, 3, 6], SortOrder::Ascending),
            SortOrder::Ascending,
        );
        let keys: Vec<u8> = collect_keys(&mut union).into_iter().map(|k| k[0]).collect();
        assert_eq!(keys, vec![1, 2, 3, 5, 6]);
    }

    #[test]
    fn test_descending_union() {
        let mut union = UnionSetCursor::new(
            cursor(&[9, 4], SortOrder::Descending),
            cursor(&[7, 4, 1], SortOrder::Descending),
            SortOrder::Descending,
        );
        let keys: Vec<u8> = collect_keys(&mut union).into_iter().map(|k| k[0]).collect();
        assert_eq!(keys, vec![9, 7, 4, 1]);
    }

    #[test]
    fn test_union_with_empty_side() {
        let mut union = UnionSetCursor::new(
            Box::new(EmptyCursor),
            cursor(&[1, 2], SortOrder::Ascending),
            SortOrder::Ascending,
        );
        assert_eq!(collect_keys(&mut union), vec![vec![1], vec![2]]);

        let union = UnionSetCursor::new(
            Box::new(EmptyCursor),
            Box::new(EmptyCursor),
            SortOrder::Ascending,
        );
        assert!(!union.is_valid());
    }
}
