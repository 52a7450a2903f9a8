//! Owns the sole file descriptor and a fixed-size array of page slots.
//! Lazily reads pages on demand, writes dirty pages back on close,
//! allocates new page numbers by simple append. Not thread-safe; no
//! operation suspends (§5).

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::errors::Error;
use crate::page::{Page, PAGE_SIZE};

pub const TABLE_MAX_PAGES: usize = 100;

pub struct Pager {
    file: File,
    /// Page count of the file as it was when opened. Pages below this are
    /// backed by real bytes on disk; pages at or above it exist only in
    /// memory until `flush`/`close` writes them out. Distinct from
    /// `num_pages`, which also tracks pages allocated fresh this session.
    disk_pages: u32,
    num_pages: u32,
    /// Each slot is boxed so the 4096-byte pages live on the heap — a plain
    /// `heapless::Vec<Option<Page>, _>` would put the whole `TABLE_MAX_PAGES
    /// * PAGE_SIZE` array inline in `Pager`, overflowing a normal thread
    /// stack on every by-value move.
    pages: heapless::Vec<Option<Box<Page>>, TABLE_MAX_PAGES>,
}

impl Pager {
    pub fn open(path: impl AsRef<Path>) -> Result<Pager, Error> {
        let mut open_options = OpenOptions::new();
        open_options.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            open_options.mode(0o600);
        }
        let mut file = open_options.open(path)?;

        let file_length = file.seek(SeekFrom::End(0))?;
        if file_length as usize % PAGE_SIZE != 0 {
            return Err(Error::CorruptFile);
        }
        let num_pages = (file_length as usize / PAGE_SIZE) as u32;

        let mut pages = heapless::Vec::new();
        for _ in 0..TABLE_MAX_PAGES {
            let _ = pages.push(None);
        }

        tracing::info!(num_pages, "opened pager");
        Ok(Pager {
            file,
            disk_pages: num_pages,
            num_pages,
            pages,
        })
    }

    /// Returns the page slot for `page_num`, materializing it from disk
    /// (or as a fresh zeroed buffer) on first access.
    pub fn get(&mut self, page_num: u32) -> Result<&mut Page, Error> {
        if page_num as usize >= TABLE_MAX_PAGES {
            return Err(Error::PageOutOfBounds(page_num));
        }

        if self.pages[page_num as usize].is_none() {
            let mut buf = Box::new([0u8; PAGE_SIZE]);
            if page_num < self.disk_pages {
                self.file
                    .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
                self.file.read_exact(buf.as_mut())?;
                tracing::trace!(page_num, "page fault: read from disk");
            } else {
                tracing::trace!(page_num, "page fault: new zeroed page");
            }
            self.pages[page_num as usize] = Some(buf);
            if page_num >= self.num_pages {
                self.num_pages = page_num + 1;
            }
        }

        Ok(self.pages[page_num as usize].as_mut().unwrap())
    }

    /// Returns the page number the next page allocation would use.
    /// Append-only: there is no free list, so deletion is unsupported.
    pub fn allocate(&self) -> u32 {
        self.num_pages
    }

    pub fn flush(&mut self, page_num: u32) -> Result<(), Error> {
        match &self.pages[page_num as usize] {
            Some(page) => {
                self.file
                    .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
                self.file.write_all(page.as_ref())?;
                Ok(())
            }
            None => Err(Error::FlushEmptySlot(page_num)),
        }
    }

    /// Flushes every resident slot and closes the file.
    pub fn close(mut self) -> Result<(), Error> {
        let mut flushed = 0u32;
        for page_num in 0..self.num_pages {
            if self.pages[page_num as usize].is_some() {
                self.flush(page_num)?;
                flushed += 1;
            }
        }
        tracing::info!(flushed, "closed pager");
        Ok(())
    }
}
