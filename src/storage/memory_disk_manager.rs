//! In-memory page store.
//!
//! [`MemoryDiskManager`] keeps pages in memory behind a shared handle, so a
//! clone kept by the caller can inspect I/O counts and stored bytes after
//! the original has been moved into a buffer pool. Reads, writes and
//! allocations can be made to fail on demand.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{Error, PageId, Result};
use crate::storage::disk_store::{DiskStore, PageAllocator};
use crate::storage::page::Page;

#[derive(Default)]
struct MemoryDisk {
    pages: Vec<Box<Page>>,
    allocator: PageAllocator,
    reads: u64,
    writes: u64,
    fail_reads: bool,
    fail_writes: bool,
    fail_allocations: bool,
}

fn injected(op: &str) -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::Other,
        format!("injected {op} failure"),
    ))
}

/// A cloneable handle to an in-memory page store.
///
/// # Example
/// ```
/// use heapstore::storage::{DiskStore, MemoryDiskManager};
/// use heapstore::storage::page::Page;
///
/// let disk = MemoryDiskManager::new();
/// let mut handle = disk.clone();
///
/// let pid = handle.allocate_page().unwrap();
/// handle.write_page(pid, &Page::new()).unwrap();
/// assert_eq!(disk.writes(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MemoryDiskManager {
    inner: Arc<Mutex<MemoryDisk>>,
}

impl MemoryDiskManager {
    /// An unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses to grow past `max_pages` pages.
    pub fn with_capacity(max_pages: u32) -> Self {
        let disk = MemoryDisk {
            allocator: PageAllocator::new(0, Some(max_pages)),
            ..MemoryDisk::default()
        };
        Self {
            inner: Arc::new(Mutex::new(disk)),
        }
    }

    /// Successful page reads so far.
    pub fn reads(&self) -> u64 {
        self.inner.lock().reads
    }

    /// Successful page writes so far.
    pub fn writes(&self) -> u64 {
        self.inner.lock().writes
    }

    /// Zero both I/O counters.
    pub fn reset_counters(&self) {
        let mut disk = self.inner.lock();
        disk.reads = 0;
        disk.writes = 0;
    }

    /// Number of pages currently allocated.
    pub fn allocated_count(&self) -> u32 {
        self.inner.lock().allocator.allocated_count()
    }

    /// Whether `page_id` is currently allocated.
    pub fn is_allocated(&self, page_id: PageId) -> bool {
        self.inner.lock().allocator.is_allocated(page_id)
    }

    /// Copy of the stored bytes of an allocated page, bypassing counters and
    /// injected failures.
    pub fn page_bytes(&self, page_id: PageId) -> Option<Vec<u8>> {
        let disk = self.inner.lock();
        disk.allocator
            .is_allocated(page_id)
            .then(|| disk.pages[page_id.0 as usize].as_slice().to_vec())
    }

    /// Make every read fail until switched off.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.lock().fail_reads = fail;
    }

    /// Make every write fail until switched off.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Make every allocation fail until switched off.
    pub fn set_fail_allocations(&self, fail: bool) {
        self.inner.lock().fail_allocations = fail;
    }
}

impl DiskStore for MemoryDiskManager {
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        let mut disk = self.inner.lock();
        if disk.fail_reads {
            return Err(injected("read"));
        }
        disk.allocator.check_allocated(page_id)?;

        page.copy_from(&disk.pages[page_id.0 as usize]);
        disk.reads += 1;
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        let mut disk = self.inner.lock();
        if disk.fail_writes {
            return Err(injected("write"));
        }
        disk.allocator.check_allocated(page_id)?;

        disk.pages[page_id.0 as usize].copy_from(page);
        disk.writes += 1;
        Ok(())
    }

    fn allocate_pages(&mut self, count: u32) -> Result<PageId> {
        let mut disk = self.inner.lock();
        if disk.fail_allocations {
            return Err(injected("allocation"));
        }

        let allocation = disk.allocator.allocate(count)?;
        for _ in 0..allocation.appended {
            disk.pages.push(Box::new(Page::new()));
        }
        for i in 0..count {
            disk.pages[allocation.first.offset(i).0 as usize].reset();
        }
        Ok(allocation.first)
    }

    fn deallocate_pages(&mut self, first: PageId, count: u32) -> Result<()> {
        self.inner.lock().allocator.deallocate(first, count)
    }
}
