//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds a [`Page`] plus metadata needed for buffer management:
//! - Which page is loaded (`PageId::INVALID` if none)
//! - Pin count for reference counting
//! - Dirty flag for write-back tracking
//! - Recency tick of the last pin, read by the LRU replacer

use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;
use crate::storage::DiskStore;

/// A frame in the buffer pool.
///
/// Frames are the "slots" in the buffer pool. Each frame can hold one page.
/// The buffer pool allocates all frames at startup and reuses each frame's
/// page buffer for its whole lifetime.
///
/// Mutation goes through `&mut self`; replacers only ever see `&[Frame]`.
pub struct Frame {
    /// The page data.
    page: Page,

    /// Which page is currently loaded, or `PageId::INVALID` if empty.
    page_id: PageId,

    /// Number of active holders of this frame.
    pin_count: u32,

    /// Whether the page has been modified since loading.
    is_dirty: bool,

    /// Pool tick of the last pin or reset.
    last_touch: u64,
}

impl Frame {
    /// Create a new empty frame.
    pub fn new() -> Self {
        Self {
            page: Page::new(),
            page_id: PageId::INVALID,
            pin_count: 0,
            is_dirty: false,
            last_touch: 0,
        }
    }

    // ========================================================================
    // Page access
    // ========================================================================

    #[inline]
    pub fn page(&self) -> &Page {
        &self.page
    }

    #[inline]
    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    // ========================================================================
    // Page ID management
    // ========================================================================

    /// Get the page ID of the loaded page.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Stamp a page id without reading it from disk.
    #[inline]
    pub(crate) fn set_page_id(&mut self, page_id: PageId) {
        self.page_id = page_id;
    }

    // ========================================================================
    // Pin count operations
    // ========================================================================

    /// Increment the pin count and record `tick` as the latest use.
    /// Returns the new pin count.
    #[inline]
    pub fn pin(&mut self, tick: u64) -> u32 {
        self.pin_count += 1;
        self.last_touch = tick;
        self.pin_count
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0.
    #[inline]
    pub fn unpin(&mut self) -> u32 {
        assert!(self.pin_count > 0, "pin count underflow");
        self.pin_count -= 1;
        self.pin_count
    }

    /// Get the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    /// Check if the frame is currently pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    /// Tick of the most recent pin or reset.
    #[inline]
    pub fn last_touch(&self) -> u64 {
        self.last_touch
    }

    // ========================================================================
    // Dirty flag operations
    // ========================================================================

    /// Mark the frame as dirty (modified).
    #[inline]
    pub fn mark_dirty(&mut self) {
        debug_assert!(self.page_id.is_valid(), "empty frame marked dirty");
        self.is_dirty = true;
    }

    /// Check if the frame is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    // ========================================================================
    // Frame state queries
    // ========================================================================

    /// Check if the frame is empty (no page loaded).
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.page_id.is_valid()
    }

    /// Check if the frame may be handed out as a victim.
    ///
    /// Empty frames are always evictable.
    #[inline]
    pub fn is_evictable(&self) -> bool {
        !self.is_pinned()
    }

    /// Reset the frame to empty state.
    ///
    /// The page buffer is zeroed in place rather than reallocated.
    pub fn reset(&mut self, tick: u64) {
        self.page.reset();
        self.page_id = PageId::INVALID;
        self.pin_count = 0;
        self.is_dirty = false;
        self.last_touch = tick;
    }

    // ========================================================================
    // Disk I/O
    // ========================================================================

    /// Load `page_id` from `disk` into this frame.
    ///
    /// The resident page id changes only if the read succeeds.
    pub fn read<D: DiskStore + ?Sized>(&mut self, page_id: PageId, disk: &mut D) -> Result<()> {
        disk.read_page(page_id, &mut self.page)?;
        self.page_id = page_id;
        Ok(())
    }

    /// Persist the frame's bytes under its resident page id.
    ///
    /// The dirty flag is left alone; the caller decides what a successful
    /// write means for the frame.
    pub fn write<D: DiskStore + ?Sized>(&self, disk: &mut D) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidPageId(self.page_id));
        }
        disk.write_page(self.page_id, &self.page)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
