//! B+-tree search, leaf insert & split, and (as the adopted completion of
//! the design-note option (b) — see SPEC_FULL.md §9) internal-node split,
//! letting the tree grow past the single-leaf-plus-root capacity instead
//! of aborting.

use crate::node::{init_internal, init_leaf, max_key};
use crate::page::{self, NodeType, Page, LEAF_NODE_LEFT_SPLIT_COUNT,
    LEAF_NODE_MAX_CELLS, LEAF_NODE_RIGHT_SPLIT_COUNT, PAGE_SIZE,
    INTERNAL_NODE_LEFT_SPLIT_COUNT, INTERNAL_NODE_RIGHT_SPLIT_COUNT};
use crate::pager::{Pager, TABLE_MAX_PAGES};
use crate::errors::Error;
use crate::row::{Row, ROW_SIZE};

/// The root is always page 0 for the life of the table (invariant 3).
pub const ROOT_PAGE_NUM: u32 = 0;

#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub page_num: u32,
    pub cell_num: u32,
    pub end_of_table: bool,
}

/// Binary search within a leaf for `key`: an exact match, or the unique
/// insertion point that keeps the leaf sorted (§4.D step 2).
fn leaf_find_cell(page: &Page, key: u32) -> usize {
    let mut lo = 0usize;
    let mut hi = page::leaf_num_cells(page) as usize;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let mid_key = page::leaf_key(page, mid);
        if key == mid_key {
            return mid;
        } else if key < mid_key {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Binary search an internal node for the smallest key `>= key`, the
/// index of the child whose subtree may contain it (§4.D step 3).
fn internal_find_child_index(page: &Page, key: u32) -> usize {
    let num_keys = page::internal_num_keys(page) as usize;
    let mut lo = 0usize;
    let mut hi = num_keys;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if page::internal_key(page, mid) >= key {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Recursive descent from the root (§4.D). Returns the chain of internal
/// ancestor page numbers (root first, immediate parent last) together with
/// the cursor at the resulting leaf cell.
fn find_path(pager: &mut Pager, key: u32) -> Result<(Vec<u32>, Cursor), Error> {
    let mut ancestors = Vec::new();
    let mut page_num = ROOT_PAGE_NUM;
    loop {
        let page = pager.get(page_num)?;
        match page::node_type(page)? {
            NodeType::Leaf => {
                let cell_num = leaf_find_cell(page, key) as u32;
                return Ok((
                    ancestors,
                    Cursor {
                        page_num,
                        cell_num,
                        end_of_table: false,
                    },
                ));
            }
            NodeType::Internal => {
                let child_idx = internal_find_child_index(page, key);
                let child = page::internal_child_at(page, child_idx);
                ancestors.push(page_num);
                if ancestors.len() >= TABLE_MAX_PAGES {
                    return Err(Error::CorruptFile);
                }
                page_num = child;
            }
        }
    }
}

/// `find(table, key)` — descends to the leaf cursor for `key`, exact match
/// or insertion point (§4.D).
pub fn find(pager: &mut Pager, key: u32) -> Result<Cursor, Error> {
    find_path(pager, key).map(|(_, cursor)| cursor)
}

/// Inserts `row` under `key`, rejecting an exact-match duplicate (§4.E,
/// §4.G duplicate-key policy).
pub fn insert(pager: &mut Pager, key: u32, row: &Row) -> Result<(), Error> {
    let (ancestors, cursor) = find_path(pager, key)?;

    let page = pager.get(cursor.page_num)?;
    let num_cells = page::leaf_num_cells(page) as usize;
    let cell_num = cursor.cell_num as usize;
    if cell_num < num_cells && page::leaf_key(page, cell_num) == key {
        return Err(Error::DuplicateKey);
    }

    if num_cells < LEAF_NODE_MAX_CELLS {
        leaf_insert(page, cell_num, key, row);
        Ok(())
    } else {
        // A leaf split always allocates a new sibling, and (only if the split
        // reaches the root) one more page to hold the copied-out old root;
        // refuse before either allocation would run the pager past its fixed
        // page count. This doesn't budget for a cascading internal-node split
        // (update_parent_after_split / internal_split_and_insert, which can
        // allocate 1-2 more pages of its own): INTERNAL_NODE_MAX_CELLS keeps
        // an internal node's fan-out large enough that, with TABLE_MAX_PAGES
        // this small, the tree always runs out of leaf room long before any
        // internal node could fill up and cascade.
        debug_assert!(page::INTERNAL_NODE_MAX_CELLS > TABLE_MAX_PAGES);
        let needed = if page::is_root(page) { 2 } else { 1 };
        if pager.allocate() as usize + needed > TABLE_MAX_PAGES {
            return Err(Error::TableFull);
        }
        leaf_split_and_insert(pager, &ancestors, cursor.page_num, cell_num, key, row)
    }
}

fn leaf_insert(page: &mut Page, cell_num: usize, key: u32, row: &Row) {
    let num_cells = page::leaf_num_cells(page) as usize;
    if cell_num < num_cells {
        page::shift_leaf_cells_right(page, cell_num, num_cells);
    }
    page::set_leaf_key(page, cell_num, key);
    let mut value = [0u8; ROW_SIZE];
    row.write_to(&mut value);
    page::leaf_value_mut(page, cell_num).copy_from_slice(&value);
    page::set_leaf_num_cells(page, (num_cells + 1) as u32);
}

/// Splits a full leaf into two, redistributing the 13 existing cells plus
/// the new one across old (left) and new (right) per the exact `LEFT`/
/// `RIGHT` formula in §4.E, then either creates a new root (if `old` was
/// the root) or propagates the new sibling into the parent.
fn leaf_split_and_insert(
    pager: &mut Pager,
    ancestors: &[u32],
    old_page_num: u32,
    cell_num: usize,
    key: u32,
    row: &Row,
) -> Result<(), Error> {
    const LEFT: usize = LEAF_NODE_LEFT_SPLIT_COUNT;
    const RIGHT: usize = LEAF_NODE_RIGHT_SPLIT_COUNT;

    let old_snapshot = *pager.get(old_page_num)?;
    let was_root = page::is_root(&old_snapshot);

    let new_page_num = pager.allocate();
    {
        let new_page = pager.get(new_page_num)?;
        init_leaf(new_page);
    }

    let mut value = [0u8; ROW_SIZE];
    row.write_to(&mut value);

    for i in (0..=LEAF_NODE_MAX_CELLS).rev() {
        let dest_index = i % LEFT;
        let in_new = i >= LEFT;

        if i == cell_num {
            let dest = pager.get(if in_new { new_page_num } else { old_page_num })?;
            page::set_leaf_key(dest, dest_index, key);
            page::leaf_value_mut(dest, dest_index).copy_from_slice(&value);
        } else {
            let src_index = if i > cell_num { i - 1 } else { i };
            let dest = pager.get(if in_new { new_page_num } else { old_page_num })?;
            page::copy_leaf_cell(&old_snapshot, src_index, dest, dest_index);
        }
    }

    page::set_leaf_num_cells(pager.get(old_page_num)?, LEFT as u32);
    page::set_leaf_num_cells(pager.get(new_page_num)?, RIGHT as u32);

    page::set_leaf_next_leaf(pager.get(new_page_num)?, page::leaf_next_leaf(&old_snapshot));
    page::set_leaf_next_leaf(pager.get(old_page_num)?, new_page_num);

    if was_root {
        create_new_root(pager, new_page_num)
    } else {
        let parent_page_num = *ancestors.last().ok_or(Error::SplitOfNonRoot)?;
        update_parent_after_split(
            pager,
            &ancestors[..ancestors.len() - 1],
            parent_page_num,
            old_page_num,
            new_page_num,
        )
    }
}

/// Handles splitting the root (§4.E.i): the old root's contents move to a
/// freshly allocated left page; page 0 is re-initialized as an internal
/// node pointing at the left and right children.
fn create_new_root(pager: &mut Pager, right_child_page_num: u32) -> Result<(), Error> {
    let left_page_num = pager.allocate();
    let old_root = *pager.get(ROOT_PAGE_NUM)?;
    *pager.get(left_page_num)? = old_root;
    page::set_is_root(pager.get(left_page_num)?, false);

    let left_max_key = max_key(pager, left_page_num)?;

    let root = pager.get(ROOT_PAGE_NUM)?;
    init_internal(root);
    page::set_is_root(root, true);
    page::set_internal_num_keys(root, 1);
    page::set_internal_child(root, 0, left_page_num);
    page::set_internal_key(root, 0, left_max_key);
    page::set_internal_right_child(root, right_child_page_num);
    Ok(())
}

/// Locates the cell (or the right-child slot) in `parent` that currently
/// points at `child_page_num`. Children are few enough in practice that a
/// linear scan is simpler, and just as correct, as threading key-based
/// binary search through a page whose keys may be mid-update.
fn find_child_index(page: &Page, child_page_num: u32) -> Result<usize, Error> {
    let num_keys = page::internal_num_keys(page) as usize;
    for i in 0..=num_keys {
        if page::internal_child_at(page, i) == child_page_num {
            return Ok(i);
        }
    }
    Err(Error::CorruptFile)
}

/// After `old_child_page_num` has split into itself (now holding only its
/// left half) plus `new_child_page_num` (the right half), updates
/// `parent_page_num` to reference both, splitting the parent in turn if it
/// is itself full.
fn update_parent_after_split(
    pager: &mut Pager,
    ancestors_above_parent: &[u32],
    parent_page_num: u32,
    old_child_page_num: u32,
    new_child_page_num: u32,
) -> Result<(), Error> {
    let old_key = max_key(pager, old_child_page_num)?;
    let new_key = max_key(pager, new_child_page_num)?;

    let idx = find_child_index(pager.get(parent_page_num)?, old_child_page_num)?;
    let num_keys = page::internal_num_keys(pager.get(parent_page_num)?) as usize;

    if num_keys < page::INTERNAL_NODE_MAX_CELLS {
        internal_insert(
            pager.get(parent_page_num)?,
            idx,
            old_key,
            new_key,
            old_child_page_num,
            new_child_page_num,
        );
        Ok(())
    } else {
        internal_split_and_insert(
            pager,
            ancestors_above_parent,
            parent_page_num,
            idx,
            old_key,
            new_key,
            old_child_page_num,
            new_child_page_num,
        )
    }
}

/// Inserts a new (child, key) pair into a non-full internal node at
/// position `idx`, shifting later cells right. `idx == num_keys` means
/// `old_child_page_num` was previously the `right_child`.
fn internal_insert(
    page: &mut Page,
    idx: usize,
    old_key: u32,
    new_key: u32,
    old_child: u32,
    new_child: u32,
) {
    let num_keys = page::internal_num_keys(page) as usize;
    if idx == num_keys {
        page::set_internal_child(page, num_keys, old_child);
        page::set_internal_key(page, num_keys, old_key);
        page::set_internal_right_child(page, new_child);
    } else {
        let snapshot = *page;
        for i in (idx + 1..=num_keys).rev() {
            page::copy_internal_cell(&snapshot, i - 1, page, i);
        }
        page::set_internal_key(page, idx, old_key);
        page::set_internal_child(page, idx + 1, new_child);
        page::set_internal_key(page, idx + 1, new_key);
    }
    page::set_internal_num_keys(page, (num_keys + 1) as u32);
}

fn build_internal_node(children: &[u32], keys: &[u32]) -> Page {
    debug_assert_eq!(children.len(), keys.len() + 1);
    let mut page = [0u8; PAGE_SIZE];
    init_internal(&mut page);
    for (i, &k) in keys.iter().enumerate() {
        page::set_internal_child(&mut page, i, children[i]);
        page::set_internal_key(&mut page, i, k);
    }
    page::set_internal_right_child(&mut page, *children.last().unwrap());
    page::set_internal_num_keys(&mut page, keys.len() as u32);
    page
}

/// Splits a full internal node, the natural completion of option (b) in
/// §9: materializes its (child, key) cells plus the pending insertion as
/// plain vectors, splits them at the midpoint (the promoted key), and
/// writes the two halves back — recursing into the grandparent, or
/// creating a new root, exactly as a leaf split does.
fn internal_split_and_insert(
    pager: &mut Pager,
    ancestors_above_parent: &[u32],
    old_parent_page_num: u32,
    insert_idx: usize,
    old_key: u32,
    new_key: u32,
    old_child: u32,
    new_child: u32,
) -> Result<(), Error> {
    let parent_snapshot = *pager.get(old_parent_page_num)?;
    let num_keys = page::internal_num_keys(&parent_snapshot) as usize;

    let mut children: Vec<u32> = (0..=num_keys)
        .map(|i| page::internal_child_at(&parent_snapshot, i))
        .collect();
    let mut keys: Vec<u32> = (0..num_keys).map(|i| page::internal_key(&parent_snapshot, i)).collect();
    if children[insert_idx] != old_child {
        return Err(Error::CorruptFile);
    }

    if insert_idx == num_keys {
        keys.push(old_key);
        children.insert(num_keys + 1, new_child);
    } else {
        keys[insert_idx] = old_key;
        keys.insert(insert_idx + 1, new_key);
        children.insert(insert_idx + 1, new_child);
    }

    // One key (the one promoted into the parent) is excluded from both
    // children, so the combined keys array is one longer than LEFT+RIGHT.
    debug_assert_eq!(keys.len(), INTERNAL_NODE_LEFT_SPLIT_COUNT + INTERNAL_NODE_RIGHT_SPLIT_COUNT + 1);
    let left_count = INTERNAL_NODE_LEFT_SPLIT_COUNT;
    let promoted_key = keys[left_count];

    let left_buf = build_internal_node(&children[..=left_count], &keys[..left_count]);
    let right_buf = build_internal_node(&children[left_count + 1..], &keys[left_count + 1..]);

    let new_sibling_page_num = pager.allocate();
    *pager.get(new_sibling_page_num)? = right_buf;

    if old_parent_page_num == ROOT_PAGE_NUM {
        let left_page_num = pager.allocate();
        *pager.get(left_page_num)? = left_buf;

        let root = pager.get(ROOT_PAGE_NUM)?;
        init_internal(root);
        page::set_is_root(root, true);
        page::set_internal_num_keys(root, 1);
        page::set_internal_child(root, 0, left_page_num);
        page::set_internal_key(root, 0, promoted_key);
        page::set_internal_right_child(root, new_sibling_page_num);
        Ok(())
    } else {
        *pager.get(old_parent_page_num)? = left_buf;
        let grandparent = *ancestors_above_parent
            .last()
            .ok_or(Error::SplitOfNonRoot)?;
        update_parent_after_split(
            pager,
            &ancestors_above_parent[..ancestors_above_parent.len() - 1],
            grandparent,
            old_parent_page_num,
            new_sibling_page_num,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;
    use tempfile::NamedTempFile;

    fn open_empty() -> (Pager, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(file.path()).unwrap();
        init_leaf(pager.get(ROOT_PAGE_NUM).unwrap());
        page::set_is_root(pager.get(ROOT_PAGE_NUM).unwrap(), true);
        (pager, file)
    }

    #[test]
    fn inserting_ascending_keys_keeps_leaf_sorted() {
        let (mut pager, _file) = open_empty();
        for id in 1..=5u32 {
            let row = Row::new(id, "u", "e@x");
            insert(&mut pager, id, &row).unwrap();
        }
        let page = pager.get(ROOT_PAGE_NUM).unwrap();
        assert_eq!(page::leaf_num_cells(page), 5);
        for i in 0..5 {
            assert_eq!(page::leaf_key(page, i), (i + 1) as u32);
        }
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let (mut pager, _file) = open_empty();
        let row = Row::new(1, "a", "a@x");
        insert(&mut pager, 1, &row).unwrap();
        let again = Row::new(1, "b", "b@x");
        assert!(matches!(insert(&mut pager, 1, &again), Err(Error::DuplicateKey)));
    }

    #[test]
    fn fourteenth_insert_splits_root_into_internal_with_two_seven_cell_leaves() {
        let (mut pager, _file) = open_empty();
        for id in 1..=14u32 {
            let row = Row::new(id, "u", "e@x");
            insert(&mut pager, id, &row).unwrap();
        }

        let root = pager.get(ROOT_PAGE_NUM).unwrap();
        assert_eq!(page::node_type(root).unwrap(), NodeType::Internal);
        assert_eq!(page::internal_num_keys(root), 1);
        let left_page_num = page::internal_child(root, 0);
        let right_page_num = page::internal_right_child(root);
        // leaf_split_and_insert allocates the right sibling first (page 1);
        // create_new_root then allocates the copied-root left child second
        // (page 2), matching c-bata-db_tutorial's allocation order.
        assert_eq!(left_page_num, 2);
        assert_eq!(right_page_num, 1);

        let left = pager.get(2).unwrap();
        assert_eq!(page::leaf_num_cells(left), 7);
        for i in 0..7 {
            assert_eq!(page::leaf_key(left, i), (i + 1) as u32);
        }
        assert_eq!(page::leaf_next_leaf(left), 1);

        let right = pager.get(1).unwrap();
        assert_eq!(page::leaf_num_cells(right), 7);
        for i in 0..7 {
            assert_eq!(page::leaf_key(right, i), (i + 8) as u32);
        }
        assert_eq!(page::leaf_next_leaf(right), page::NO_LEAF);
    }

    #[test]
    fn find_after_split_descends_through_the_internal_root() {
        let (mut pager, _file) = open_empty();
        for id in 1..=14u32 {
            let row = Row::new(id, "u", "e@x");
            insert(&mut pager, id, &row).unwrap();
        }
        let cursor = find(&mut pager, 10).unwrap();
        assert_eq!(cursor.page_num, 1);
        assert_eq!(cursor.cell_num, 2);
    }

    #[test]
    fn split_without_room_to_allocate_reports_table_full() {
        let (mut pager, _file) = open_empty();
        for id in 1..=LEAF_NODE_MAX_CELLS as u32 {
            let row = Row::new(id, "u", "e@x");
            insert(&mut pager, id, &row).unwrap();
        }
        // Force the pager to the brink of its fixed page count, leaving less
        // room than a split needs.
        pager.get((TABLE_MAX_PAGES - 2) as u32).unwrap();

        let overflow_key = LEAF_NODE_MAX_CELLS as u32 + 1;
        let row = Row::new(overflow_key, "u", "e@x");
        assert!(matches!(
            insert(&mut pager, overflow_key, &row),
            Err(Error::TableFull)
        ));
    }

    // internal_split_and_insert is unreachable through insert() under this
    // crate's TABLE_MAX_PAGES/INTERNAL_NODE_MAX_CELLS ratio (see the
    // debug_assert! in insert()), so it gets direct coverage here instead of
    // only via the public insert() path.
    #[test]
    fn internal_node_split_promotes_midpoint_key_into_new_root() {
        let (mut pager, _file) = open_empty();

        let max_cells = page::INTERNAL_NODE_MAX_CELLS;
        let root = pager.get(ROOT_PAGE_NUM).unwrap();
        init_internal(root);
        page::set_is_root(root, true);
        page::set_internal_num_keys(root, max_cells as u32);
        for i in 0..max_cells {
            page::set_internal_child(root, i, (i + 1) as u32);
            page::set_internal_key(root, i, ((i + 1) * 10) as u32);
        }
        let right_child = (max_cells + 1) as u32;
        page::set_internal_right_child(root, right_child);

        // Simulate `right_child` having just split into itself plus a new
        // sibling, the way update_parent_after_split would call this.
        let new_sibling = 90_000u32;
        let old_key = (max_cells as u32) * 10 + 1;
        let new_key = old_key + 1;

        internal_split_and_insert(
            &mut pager,
            &[],
            ROOT_PAGE_NUM,
            max_cells,
            old_key,
            new_key,
            right_child,
            new_sibling,
        )
        .unwrap();

        let new_root = pager.get(ROOT_PAGE_NUM).unwrap();
        assert_eq!(page::node_type(new_root).unwrap(), NodeType::Internal);
        assert_eq!(page::internal_num_keys(new_root), 1);

        let left_page_num = page::internal_child(new_root, 0);
        let right_page_num = page::internal_right_child(new_root);

        let left = pager.get(left_page_num).unwrap();
        assert_eq!(page::node_type(left).unwrap(), NodeType::Internal);
        assert_eq!(
            page::internal_num_keys(left) as usize,
            page::INTERNAL_NODE_LEFT_SPLIT_COUNT
        );
        assert_eq!(page::internal_child(left, 0), 1);

        let right = pager.get(right_page_num).unwrap();
        assert_eq!(page::node_type(right).unwrap(), NodeType::Internal);
        assert_eq!(
            page::internal_num_keys(right) as usize,
            page::INTERNAL_NODE_RIGHT_SPLIT_COUNT
        );
        assert_eq!(page::internal_right_child(right), new_sibling);
    }
}
