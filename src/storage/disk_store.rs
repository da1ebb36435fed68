//! The page store contract the buffer pool is written against.
//!
//! A [`DiskStore`] reads, writes, allocates and deallocates fixed-size pages
//! by [`PageId`]. [`DiskManager`](super::DiskManager) keeps pages in a file;
//! [`MemoryDiskManager`](super::MemoryDiskManager) keeps them in memory.

use std::collections::BTreeSet;

use crate::common::config::MAX_PAGES;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Page-granular storage consumed by frames and the buffer pool.
pub trait DiskStore {
    /// Fill `page` with the stored bytes of `page_id`.
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()>;

    /// Persist `page` as the contents of `page_id`.
    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()>;

    /// Allocate `count` pages with consecutive ids, returning the first.
    fn allocate_pages(&mut self, count: u32) -> Result<PageId>;

    /// Release `count` consecutive pages starting at `first`.
    fn deallocate_pages(&mut self, first: PageId, count: u32) -> Result<()>;

    /// Allocate a single page.
    fn allocate_page(&mut self) -> Result<PageId> {
        self.allocate_pages(1)
    }

    /// Release a single page.
    fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        self.deallocate_pages(page_id, 1)
    }
}

impl<D: DiskStore + ?Sized> DiskStore for Box<D> {
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        (**self).read_page(page_id, page)
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        (**self).write_page(page_id, page)
    }

    fn allocate_pages(&mut self, count: u32) -> Result<PageId> {
        (**self).allocate_pages(count)
    }

    fn deallocate_pages(&mut self, first: PageId, count: u32) -> Result<()> {
        (**self).deallocate_pages(first, count)
    }
}

/// Result of [`PageAllocator::allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Allocation {
    pub first: PageId,
    /// How many pages were appended past the previous end of the store.
    pub appended: u32,
}

/// Id bookkeeping shared by the store implementations.
///
/// Ids below `page_count` are allocated unless they sit in `freed`.
/// Allocation reuses the lowest run of `count` consecutive freed ids and
/// otherwise appends at the end.
#[derive(Debug, Default)]
pub(crate) struct PageAllocator {
    page_count: u32,
    freed: BTreeSet<u32>,
    capacity: Option<u32>,
}

impl PageAllocator {
    pub fn new(page_count: u32, capacity: Option<u32>) -> Self {
        Self {
            page_count,
            freed: BTreeSet::new(),
            capacity,
        }
    }

    /// Ids ever handed out, freed ones included.
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Ids currently allocated.
    pub fn allocated_count(&self) -> u32 {
        self.page_count - self.freed.len() as u32
    }

    pub fn is_allocated(&self, page_id: PageId) -> bool {
        page_id.is_valid() && page_id.0 < self.page_count && !self.freed.contains(&page_id.0)
    }

    pub fn check_allocated(&self, page_id: PageId) -> Result<()> {
        if self.is_allocated(page_id) {
            Ok(())
        } else {
            Err(Error::PageNotFound(page_id))
        }
    }

    fn find_free_run(&self, count: u32) -> Option<u32> {
        let mut run_start = None;
        let mut run_len = 0;
        let mut prev = None;

        for &id in &self.freed {
            if prev.map_or(false, |p: u32| p + 1 == id) {
                run_len += 1;
            } else {
                run_start = Some(id);
                run_len = 1;
            }
            if run_len == count {
                return run_start;
            }
            prev = Some(id);
        }
        None
    }

    pub fn allocate(&mut self, count: u32) -> Result<Allocation> {
        if count == 0 {
            return Err(Error::InvalidAllocation(count));
        }

        if let Some(first) = self.find_free_run(count) {
            for id in first..first + count {
                self.freed.remove(&id);
            }
            return Ok(Allocation {
                first: PageId::new(first),
                appended: 0,
            });
        }

        let end = self.page_count as u64 + count as u64;
        let limit = self.capacity.map_or(MAX_PAGES, u64::from);
        if end > limit {
            return Err(Error::DiskFull { requested: count });
        }

        let first = PageId::new(self.page_count);
        self.page_count = end as u32;
        Ok(Allocation {
            first,
            appended: count,
        })
    }

    pub fn deallocate(&mut self, first: PageId, count: u32) -> Result<()> {
        for i in 0..count {
            self.check_allocated(first.offset(i))?;
        }
        self.freed.extend(first.0..first.0 + count);
        Ok(())
    }

    /// Undo `allocation` of `count` pages, e.g. when the store could not
    /// initialize them.
    pub fn rollback(&mut self, allocation: Allocation, count: u32) {
        if allocation.appended > 0 {
            self.page_count -= allocation.appended;
        } else {
            self.freed
                .extend(allocation.first.0..allocation.first.0 + count);
        }
    }
}
