//! Contract tests for set cursors.
//!
//! These tests verify the cursor library contracts:
//! - Exhausted cursors stay exhausted
//! - Seeks are absolute and respect the traversal order
//! - Filtering and union compose without disturbing their inputs

use filterql::cursor::{
    collect_keys, count_members, EmptyCursor, FilteredCursor, SeekableSetCursor, SetCursor,
    SliceSetCursor, TreeSet, UnionSetCursor,
};
use filterql::types::SortOrder;

fn keys(items: &[&str]) -> Vec<Vec<u8>> {
    items.iter().map(|s| s.as_bytes().to_vec()).collect()
}

fn strings(keys: Vec<Vec<u8>>) -> Vec<String> {
    keys.into_iter()
        .map(|k| String::from_utf8(k).unwrap())
        .collect()
}

fn tree(items: &[&str], order: SortOrder) -> TreeSet {
    let mut set = TreeSet::new(order);
    for key in keys(items) {
        set.insert(key);
    }
    set
}

#[test]
fn test_empty_cursor_is_invalid() {
    // Contract: an empty cursor is never valid and next is a no-op
    let mut cursor = EmptyCursor;
    assert!(!cursor.is_valid());
    cursor.next();
    assert_eq!(cursor.current(), None);
    assert!(cursor.as_seekable().is_none());
}

#[test]
fn test_next_past_end_is_noop() {
    // Contract: advancing an exhausted cursor keeps it exhausted
    let mut cursor = SliceSetCursor::new(keys(&["a"]));
    cursor.next();
    cursor.next();
    assert!(!cursor.is_valid());
    assert_eq!(cursor.current(), None);
}

#[test]
fn test_tree_cursor_orders() {
    let ascending = tree(&["b", "c", "a"], SortOrder::Ascending);
    assert_eq!(strings(collect_keys(&mut ascending.into_cursor())), vec!["a", "b", "c"]);
    let descending = tree(&["b", "c", "a"], SortOrder::Descending);
    assert_eq!(strings(collect_keys(&mut descending.into_cursor())), vec!["c", "b", "a"]);
}

#[test]
fn test_seek_is_absolute() {
    // Contract: seek positions on the first key not before the target,
    // including targets behind the current position
    let mut cursor = tree(&["a", "c", "e"], SortOrder::Ascending).into_cursor();
    cursor.seek(b"d");
    assert_eq!(cursor.current(), Some(&b"e"[..]));
    cursor.seek(b"b");
    assert_eq!(cursor.current(), Some(&b"c"[..]));
    cursor.seek(b"f");
    assert!(!cursor.is_valid());
}

#[test]
fn test_seek_descending() {
    // Contract: "not before" follows the traversal order
    let mut cursor = tree(&["a", "c", "e"], SortOrder::Descending).into_cursor();
    cursor.seek(b"d");
    assert_eq!(cursor.current(), Some(&b"c"[..]));
    let mut slice = SliceSetCursor::with_order(keys(&["e", "c", "a"]), SortOrder::Descending);
    slice.seek(b"d");
    assert_eq!(slice.current(), Some(&b"c"[..]));
}

#[test]
fn test_filtered_cursor_skips_rejected() {
    let inner = Box::new(SliceSetCursor::new(keys(&["a1", "b1", "a2", "b2"])));
    let mut cursor = FilteredCursor::wrap(inner, |key: &[u8]| key.starts_with(b"b"));
    assert_eq!(strings(collect_keys(cursor.as_mut())), vec!["b1", "b2"]);
}

#[test]
fn test_filtered_cursor_on_empty_input() {
    // Contract: wrapping an exhausted cursor yields an empty cursor
    let cursor = FilteredCursor::wrap(Box::new(EmptyCursor), |_: &[u8]| true);
    assert!(!cursor.is_valid());
}

#[test]
fn test_filtered_cursor_rejecting_everything() {
    let inner = Box::new(SliceSetCursor::new(keys(&["a", "b"])));
    let mut cursor = FilteredCursor::wrap(inner, |_: &[u8]| false);
    assert_eq!(count_members(cursor.as_mut()), 0);
}

#[test]
fn test_union_merges_and_deduplicates() {
    let left = Box::new(SliceSetCursor::new(keys(&["a", "c", "e"])));
    let right = Box::new(SliceSetCursor::new(keys(&["b", "c", "f"])));
    let mut union = UnionSetCursor::new(left, right, SortOrder::Ascending);
    assert_eq!(
        strings(collect_keys(&mut union)),
        vec!["a", "b", "c", "e", "f"]
    );
}

#[test]
fn test_union_descending_with_empty_side() {
    let left = Box::new(tree(&["x", "m"], SortOrder::Descending).into_cursor());
    let mut union = UnionSetCursor::new(left, Box::new(EmptyCursor), SortOrder::Descending);
    assert_eq!(strings(collect_keys(&mut union)), vec!["x", "m"]);
}

#[test]
fn test_tree_set_from_cursor() {
    let mut source = SliceSetCursor::sorted(keys(&["q", "p", "q"]), SortOrder::Ascending);
    let set = TreeSet::from_cursor(&mut source, SortOrder::Ascending);
    assert_eq!(set.len(), 2);
    assert!(set.contains(b"p"));
    assert!(!source.is_valid());
}
