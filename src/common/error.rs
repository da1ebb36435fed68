//! Error types for heapstore.

use thiserror::Error;

use crate::common::PageId;
use crate::storage::page::RecordId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
/// This is a common Rust pattern (see `std::io::Result`).
pub type Result<T> = std::result::Result<T, Error>;

/// All hard failures in heapstore.
///
/// Benign outcomes are not errors: a full heap page yields `None` from
/// `insert_record`, an exhausted scan yields `None` from `next_record`, and
/// a fully pinned frame array yields `None` from `pick_victim`.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page is not allocated in the disk store.
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// The sentinel page id was passed where a real page is required.
    #[error("invalid page id: {0}")]
    InvalidPageId(PageId),

    /// Buffer pool has no unpinned frame to hand out.
    ///
    /// This happens when all frames are pinned.
    #[error("no free frames available in buffer pool")]
    NoFreeFrames,

    /// The page is not held by any frame in the buffer pool.
    #[error("{0} is not resident in the buffer pool")]
    PageNotResident(PageId),

    /// Attempted to unpin a page that wasn't pinned.
    ///
    /// This indicates a bug - unpinning should match pinning.
    #[error("{0} is not pinned")]
    PageNotPinned(PageId),

    /// The page is still in use by other holders.
    #[error("{page_id} is pinned ({pin_count} pins)")]
    PagePinned { page_id: PageId, pin_count: u32 },

    /// `flush_all_pages` drained frames that were still pinned.
    #[error("{0} pinned frame(s) were flushed")]
    PagesStillPinned(usize),

    /// Page allocation was requested for zero pages.
    #[error("cannot allocate {0} pages")]
    InvalidAllocation(u32),

    /// The disk store has no room for the requested allocation.
    #[error("disk full: cannot allocate {requested} pages")]
    DiskFull { requested: u32 },

    /// Page bytes on disk don't match their stored checksum.
    #[error("checksum mismatch on {page_id}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        page_id: PageId,
        expected: u32,
        actual: u32,
    },

    /// Record id names another page, a slot out of range, or a deleted slot.
    #[error("invalid record id: {0}")]
    InvalidRecordId(RecordId),

    /// Caller-provided buffer cannot hold the record.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
}
