//! Opens/closes the store, initializes the root leaf on an empty file,
//! and offers `find`/`insert`/`iterate_all` (§4.G).

use std::path::Path;

use crate::btree::{self, ROOT_PAGE_NUM};
use crate::cursor;
use crate::errors::Error;
use crate::node::init_leaf;
use crate::page;
use crate::pager::Pager;
use crate::row::Row;

pub struct Table {
    pager: Pager,
}

impl Table {
    pub fn open(path: impl AsRef<Path>) -> Result<Table, Error> {
        let mut pager = Pager::open(path)?;
        if pager.allocate() == 0 {
            let root = pager.get(ROOT_PAGE_NUM)?;
            init_leaf(root);
            page::set_is_root(root, true);
            tracing::info!("initialized empty root leaf");
        }
        Ok(Table { pager })
    }

    pub fn close(self) -> Result<(), Error> {
        self.pager.close()
    }

    pub fn insert(&mut self, row: Row) -> Result<(), Error> {
        btree::insert(&mut self.pager, row.id, &row)
    }

    /// Lazily walks every row in ascending key order via the leaf chain.
    pub fn iterate_all(&mut self) -> Result<Vec<Row>, Error> {
        let mut rows = Vec::new();
        let mut c = cursor::start(&mut self.pager)?;
        while !c.end_of_table {
            rows.push(cursor::row(&c, &mut self.pager)?);
            cursor::advance(&mut c, &mut self.pager)?;
        }
        Ok(rows)
    }

    pub fn pager_mut(&mut self) -> &mut Pager {
        &mut self.pager
    }
}
