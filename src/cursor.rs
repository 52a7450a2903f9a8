//! Positions at a `(page, cell)`, advances across the leaf chain, exposes
//! the byte slot backing the current row (§4.F).

use crate::btree::{self, Cursor};
use crate::errors::Error;
use crate::page;
use crate::pager::Pager;
use crate::row::{Row, ROW_SIZE};

/// `start(table)`: `find(table, 0)`, flagged end-of-table if the root leaf
/// is empty.
pub fn start(pager: &mut Pager) -> Result<Cursor, Error> {
    let mut cursor = btree::find(pager, 0)?;
    let page = pager.get(cursor.page_num)?;
    cursor.end_of_table = page::leaf_num_cells(page) == 0;
    Ok(cursor)
}

/// `end(table)`: positions at the last cell of the root. Vestigial —
/// `insert` always routes through `find`; kept only because §4.F still
/// names it as part of the cursor's operation set.
pub fn end(pager: &mut Pager) -> Result<Cursor, Error> {
    let page = pager.get(btree::ROOT_PAGE_NUM)?;
    let num_cells = page::leaf_num_cells(page);
    Ok(Cursor {
        page_num: btree::ROOT_PAGE_NUM,
        cell_num: num_cells,
        end_of_table: true,
    })
}

/// Advances one cell; once the current leaf is exhausted, follows
/// `next_leaf` into the sibling leaf rather than stopping, so a scan
/// started before a split still visits every leaf in order.
pub fn advance(cursor: &mut Cursor, pager: &mut Pager) -> Result<(), Error> {
    let page = pager.get(cursor.page_num)?;
    cursor.cell_num += 1;
    if cursor.cell_num >= page::leaf_num_cells(page) {
        let next = page::leaf_next_leaf(page);
        if next == page::NO_LEAF {
            cursor.end_of_table = true;
        } else {
            cursor.page_num = next;
            cursor.cell_num = 0;
        }
    }
    Ok(())
}

/// The row at the cursor's current cell.
pub fn row(cursor: &Cursor, pager: &mut Pager) -> Result<Row, Error> {
    let page = pager.get(cursor.page_num)?;
    let value: &[u8; ROW_SIZE] = page::leaf_value(page, cursor.cell_num as usize);
    Ok(Row::read_from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::init_leaf;
    use tempfile::NamedTempFile;

    fn open_empty() -> (Pager, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(file.path()).unwrap();
        init_leaf(pager.get(btree::ROOT_PAGE_NUM).unwrap());
        page::set_is_root(pager.get(btree::ROOT_PAGE_NUM).unwrap(), true);
        (pager, file)
    }

    #[test]
    fn start_on_empty_table_is_end_of_table() {
        let (mut pager, _file) = open_empty();
        let cursor = start(&mut pager).unwrap();
        assert!(cursor.end_of_table);
    }

    #[test]
    fn end_positions_past_the_last_cell_of_the_root() {
        let (mut pager, _file) = open_empty();
        for id in 1..=5u32 {
            btree::insert(&mut pager, id, &Row::new(id, "u", "e@x")).unwrap();
        }
        let cursor = end(&mut pager).unwrap();
        assert_eq!(cursor.page_num, btree::ROOT_PAGE_NUM);
        assert_eq!(cursor.cell_num, 5);
        assert!(cursor.end_of_table);
    }

    #[test]
    fn advance_crosses_leaf_boundary_after_a_split() {
        let (mut pager, _file) = open_empty();
        for id in 1..=14u32 {
            btree::insert(&mut pager, id, &Row::new(id, "u", "e@x")).unwrap();
        }

        let mut cursor = start(&mut pager).unwrap();
        let mut seen = Vec::new();
        while !cursor.end_of_table {
            seen.push(row(&cursor, &mut pager).unwrap().id);
            advance(&mut cursor, &mut pager).unwrap();
        }
        assert_eq!(seen, (1..=14u32).collect::<Vec<_>>());
    }
}
