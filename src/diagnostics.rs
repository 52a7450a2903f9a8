//! `.constants` and `.btree` meta-command output (§6, §8 scenario 5).

use crate::errors::Error;
use crate::page::{
    self, NodeType, INTERNAL_NODE_CELL_SIZE, INTERNAL_NODE_MAX_CELLS, LEAF_NODE_CELL_SIZE,
    LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS, LEAF_NODE_SPACE_FOR_CELLS,
};
use crate::pager::{Pager, TABLE_MAX_PAGES};
use crate::row::ROW_SIZE;

pub fn constants() -> String {
    format!(
        "ROW_SIZE: {}\n\
         LEAF_NODE_HEADER_SIZE: {}\n\
         LEAF_NODE_CELL_SIZE: {}\n\
         LEAF_NODE_SPACE_FOR_CELLS: {}\n\
         LEAF_NODE_MAX_CELLS: {}\n\
         INTERNAL_NODE_CELL_SIZE: {}\n\
         INTERNAL_NODE_MAX_CELLS: {}\n",
        ROW_SIZE,
        LEAF_NODE_HEADER_SIZE,
        LEAF_NODE_CELL_SIZE,
        LEAF_NODE_SPACE_FOR_CELLS,
        LEAF_NODE_MAX_CELLS,
        INTERNAL_NODE_CELL_SIZE,
        INTERNAL_NODE_MAX_CELLS,
    )
}

/// Recursively renders the tree rooted at `page_num`, two spaces per depth.
pub fn btree(pager: &mut Pager, page_num: u32) -> Result<String, Error> {
    let mut out = String::new();
    print_node(pager, page_num, 0, &mut out)?;
    Ok(out)
}

fn print_node(pager: &mut Pager, page_num: u32, depth: usize, out: &mut String) -> Result<(), Error> {
    if depth >= TABLE_MAX_PAGES {
        return Err(Error::CorruptFile);
    }
    let indent = "  ".repeat(depth);
    let page = pager.get(page_num)?;
    match page::node_type(page)? {
        NodeType::Leaf => {
            let num_cells = page::leaf_num_cells(page);
            out.push_str(&format!("{}- leaf (size {})\n", indent, num_cells));
            let keys: Vec<u32> = (0..num_cells).map(|i| page::leaf_key(page, i as usize)).collect();
            let child_indent = "  ".repeat(depth + 1);
            for key in keys {
                out.push_str(&format!("{}- {}\n", child_indent, key));
            }
        }
        NodeType::Internal => {
            let num_keys = page::internal_num_keys(page);
            out.push_str(&format!("{}- internal (size {})\n", indent, num_keys));
            let mut children = Vec::with_capacity(num_keys as usize + 1);
            let mut keys = Vec::with_capacity(num_keys as usize);
            for i in 0..num_keys {
                children.push(page::internal_child_at(page, i as usize));
                keys.push(page::internal_key(page, i as usize));
            }
            children.push(page::internal_right_child(page));

            let child_indent = "  ".repeat(depth + 1);
            for (i, child) in children.iter().enumerate() {
                print_node(pager, *child, depth + 1, out)?;
                if i < keys.len() {
                    out.push_str(&format!("{}- key {}\n", child_indent, keys[i]));
                }
            }
        }
    }
    Ok(())
}
