//! Predicate-filtered cursor.

use super::{EmptyCursor, SetCursor};

/// Wraps a cursor and exposes only the keys accepted by a predicate.
pub struct FilteredCursor<'a, F> {
    inner: Box<dyn SetCursor + 'a>,
    predicate: F,
}

impl<'a, F> FilteredCursor<'a, F>
where
    F: FnMut(&[u8]) -> bool + 'a,
{
    /// Wraps `inner`, positioning on the first accepted key.
    ///
    /// Collapses to an [`EmptyCursor`] when `inner` starts invalid.
    pub fn wrap(inner: Box<dyn SetCursor + 'a>, predicate: F) -> Box<dyn SetCursor + 'a> {
        if !inner.is_valid() {
            return Box::new(EmptyCursor);
        }
        let mut cursor = FilteredCursor { inner, predicate };
        cursor.skip_rejected();
        Box::new(cursor)
    }

    fn skip_rejected(&mut self) {
        while let Some(key) = self.inner.current() {
            if (self.predicate)(key) {
                return;
            }
            self.inner.next();
        }
    }
}

impl<'a, F> SetCursor for FilteredCursor<'a, F>
where
    F: FnMut(&[u8]) -> bool + 'a,
{
    fn next(&mut self) {
        if self.inner.is_valid() {
            self.inner.next();
            self.skip_rejected();
        }
    }

    fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }

    fn current(&self) -> Option<&[u8]> {
        self.inner.current()
    }
}
