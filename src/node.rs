//! Typed node constructors and the one accessor that needs to dispatch on
//! node kind (`max_key`). Everything else lives in the page codec
//! (`crate::page`), which these just compose.

use crate::errors::Error;
use crate::pager::{Pager, TABLE_MAX_PAGES};
use crate::page::{self, NodeType, Page, NO_LEAF};

pub fn init_leaf(page: &mut Page) {
    page::set_node_type(page, NodeType::Leaf);
    page::set_is_root(page, false);
    page::set_leaf_num_cells(page, 0);
    page::set_leaf_next_leaf(page, NO_LEAF);
}

pub fn init_internal(page: &mut Page) {
    page::set_node_type(page, NodeType::Internal);
    page::set_is_root(page, false);
    page::set_internal_num_keys(page, 0);
}

/// The largest key stored in (or below) the node at `page_num`. For a
/// leaf, the key of its last cell. For an internal node, the max key of
/// its `right_child` subtree — `internal_key(n - 1)` only bounds the
/// second-to-last child, not the node as a whole — so this recurses
/// through the pager until it reaches a leaf.
pub fn max_key(pager: &mut Pager, page_num: u32) -> Result<u32, Error> {
    max_key_bounded(pager, page_num, 0)
}

fn max_key_bounded(pager: &mut Pager, page_num: u32, depth: usize) -> Result<u32, Error> {
    if depth >= TABLE_MAX_PAGES {
        return Err(Error::CorruptFile);
    }
    let page = pager.get(page_num)?;
    match page::node_type(page)? {
        NodeType::Leaf => {
            let n = page::leaf_num_cells(page);
            debug_assert!(n > 0, "max_key of an empty leaf");
            Ok(page::leaf_key(page, (n - 1) as usize))
        }
        NodeType::Internal => {
            let n = page::internal_num_keys(page);
            debug_assert!(n > 0, "max_key of an empty internal node");
            let right_child = page::internal_right_child(page);
            max_key_bounded(pager, right_child, depth + 1)
        }
    }
}
