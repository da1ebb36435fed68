//! RAII guard for page access.
//!
//! [`PageGuard`] keeps one pin on a page for as long as it lives and
//! releases it on drop. Mutable access through the guard marks the page
//! dirty, so callers never pass the dirty flag by hand.

use std::ops::{Deref, DerefMut};

use tracing::warn;

use crate::common::{FrameId, PageId};
use crate::storage::page::{HeapPage, Page};
use crate::storage::DiskStore;

use super::buffer_pool_manager::BufferPoolManager;

/// A pinned page borrowed from the pool.
///
/// The guard holds the pool mutably, so at most one guard exists at a time
/// and the pool cannot be used until it is dropped.
///
/// # Example
/// ```
/// use heapstore::{BufferPoolManager, MemoryDiskManager};
///
/// let mut bpm = BufferPoolManager::new(4, MemoryDiskManager::new());
/// let pid = {
///     let mut guard = bpm.create_page().unwrap();
///     guard.as_mut_slice()[0] = 1; // marks the page dirty
///     guard.page_id()
/// }; // unpinned here
///
/// assert_eq!(bpm.pin_count(pid), Some(0));
/// assert_eq!(bpm.is_dirty(pid), Some(true));
/// ```
pub struct PageGuard<'a, D: DiskStore> {
    /// Reference back to BPM for unpin on drop.
    bpm: &'a mut BufferPoolManager<D>,
    /// Frame holding this page.
    frame_id: FrameId,
    page_id: PageId,
    /// Set once the page has been handed out mutably.
    dirty: bool,
}

impl<'a, D: DiskStore> PageGuard<'a, D> {
    /// Called by `BufferPoolManager::fetch_page()` and `create_page()`
    /// with the page already pinned.
    pub(crate) fn new(bpm: &'a mut BufferPoolManager<D>, frame_id: FrameId, page_id: PageId) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            dirty: false,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Whether the page will be unpinned as dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force the page to be unpinned as dirty.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Read the page through the slotted heap layout.
    pub fn heap_page(&self) -> HeapPage<&Page> {
        HeapPage::new(&**self)
    }

    /// Modify the page through the slotted heap layout. Marks it dirty.
    pub fn heap_page_mut(&mut self) -> HeapPage<&mut Page> {
        HeapPage::new(&mut **self)
    }
}

impl<D: DiskStore> Deref for PageGuard<'_, D> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        self.bpm.frame(self.frame_id).page()
    }
}

impl<D: DiskStore> DerefMut for PageGuard<'_, D> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        self.dirty = true;
        self.bpm.frame_mut(self.frame_id).page_mut()
    }
}

impl<D: DiskStore> Drop for PageGuard<'_, D> {
    fn drop(&mut self) {
        if let Err(err) = self.bpm.unpin_page(self.page_id, self.dirty) {
            warn!(page_id = %self.page_id, error = %err, "page guard failed to unpin");
        }
    }
}
