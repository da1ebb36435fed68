//! Disk Manager - file-backed page store.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing pages, verifying a CRC32 per page
//! - Allocating and deallocating page runs
//! - Managing the database file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::disk_store::{DiskStore, PageAllocator};
use crate::storage::page::Page;

/// Bytes of checksum stored after each page.
const CHECKSUM_SIZE: usize = 4;

/// Bytes one page occupies in the file.
const SLOT_SIZE: usize = PAGE_SIZE + CHECKSUM_SIZE;

/// Manages disk I/O for a single database file.
///
/// # File Layout
/// Pages are laid out sequentially, each followed by the CRC32 of its bytes:
/// ```text
/// ┌─────────────┬─────┬─────────────┬─────┬─────┐
/// │ Page 0      │ crc │ Page 1      │ crc │ ... │
/// │ (4KB)       │ (4) │ (4KB)       │ (4) │     │
/// └─────────────┴─────┴─────────────┴─────┴─────┘
/// Offset: 0           4100                8200
/// ```
///
/// Page N is located at file offset `N × (PAGE_SIZE + 4)`.
///
/// # Deallocation
/// Freed ids are reused by later allocations of this instance. The free
/// set lives in memory only; reopening a file treats every page as
/// allocated.
///
/// # Durability
/// All writes are followed by `fsync()`.
pub struct DiskManager {
    file: File,
    allocator: PageAllocator,
}

impl DiskManager {
    /// Create a new database file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            allocator: PageAllocator::default(),
        })
    }

    /// Open an existing database file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        let page_count = (file_size / SLOT_SIZE as u64) as u32;
        debug!(page_count, "opened database file");

        Ok(Self {
            file,
            allocator: PageAllocator::new(page_count, None),
        })
    }

    /// Open an existing database file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Number of page ids ever allocated, freed ones included.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.allocator.page_count()
    }

    /// Number of pages currently allocated.
    #[inline]
    pub fn allocated_count(&self) -> u32 {
        self.allocator.allocated_count()
    }

    /// Whether `page_id` is currently allocated.
    pub fn is_allocated(&self, page_id: PageId) -> bool {
        self.allocator.is_allocated(page_id)
    }

    /// Get the total size of the database file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count() as u64) * (SLOT_SIZE as u64)
    }

    fn write_slot(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.file.seek(SeekFrom::Start(page_id.file_offset(SLOT_SIZE)))?;
        self.file.write_all(page.as_slice())?;
        self.file.write_all(&page.checksum().to_le_bytes())?;
        Ok(())
    }

    fn zero_pages(&mut self, first: PageId, count: u32) -> Result<()> {
        let zeros = Page::new();
        for i in 0..count {
            self.write_slot(first.offset(i), &zeros)?;
        }
        self.file.sync_all()?;
        Ok(())
    }
}

impl DiskStore for DiskManager {
    /// Read a page from disk, verifying its checksum.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page isn't allocated
    /// - `Error::ChecksumMismatch` if the stored bytes are corrupt
    ///
    /// `page` is only overwritten once the checksum verifies.
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        self.allocator.check_allocated(page_id)?;

        let mut scratch = Page::new();
        self.file.seek(SeekFrom::Start(page_id.file_offset(SLOT_SIZE)))?;
        self.file.read_exact(scratch.as_mut_slice())?;

        let mut stored = [0u8; CHECKSUM_SIZE];
        self.file.read_exact(&mut stored)?;
        let expected = u32::from_le_bytes(stored);
        let actual = scratch.checksum();
        if expected != actual {
            return Err(Error::ChecksumMismatch {
                page_id,
                expected,
                actual,
            });
        }

        page.copy_from(&scratch);
        Ok(())
    }

    /// Write a page and its checksum to disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page isn't allocated.
    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.allocator.check_allocated(page_id)?;

        self.write_slot(page_id, page)?;
        self.file.sync_all()?; // fsync for durability

        Ok(())
    }

    /// Allocate `count` consecutive pages.
    ///
    /// Every page handed out is zero-filled, reused ids included. If the
    /// pages cannot be written the allocation is undone.
    fn allocate_pages(&mut self, count: u32) -> Result<PageId> {
        let allocation = self.allocator.allocate(count)?;

        if let Err(err) = self.zero_pages(allocation.first, count) {
            warn!(first = %allocation.first, count, error = %err, "page allocation failed");
            self.allocator.rollback(allocation, count);
            if allocation.appended > 0 {
                if let Err(truncate) = self.file.set_len(self.file_size()) {
                    warn!(error = %truncate, "could not trim partially grown file");
                }
            }
            return Err(err);
        }

        debug!(first = %allocation.first, count, "allocated pages");
        Ok(allocation.first)
    }

    fn deallocate_pages(&mut self, first: PageId, count: u32) -> Result<()> {
        self.allocator.deallocate(first, count)?;
        debug!(%first, count, "deallocated pages");
        Ok(())
    }
}
