//! Buffer Pool Manager - the core page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between a [`DiskStore`] and memory
//! - Pin-based reference counting
//! - Dirty page write-back on eviction and flush
//! - Pluggable eviction policies

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::buffer::replacer::Replacer;
use crate::buffer::{BufferPoolStats, Frame, PageGuard, StatsSnapshot};
use crate::common::config::BufferPoolConfig;
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::page::Page;
use crate::storage::{DiskManager, DiskStore};

/// Manages a pool of buffer frames for caching disk pages.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │        frames: Vec<Frame>         │   │
/// │  │PageId → Fid  │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │    stats     │  │   replacer   │  │     disk     │      │
/// │  │  counters    │  │ dyn Replacer │  │ D: DiskStore │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// The page table always agrees with the frames: a page id maps to a frame
/// exactly when that frame holds the page, so no page is resident twice.
///
/// # Single caller
/// Every mutating call takes `&mut self` and returned page references
/// borrow the pool, so a page handle cannot be held across another pool
/// call.
///
/// # Usage
/// ```
/// use heapstore::{BufferPoolManager, MemoryDiskManager};
///
/// let mut bpm = BufferPoolManager::new(10, MemoryDiskManager::new());
///
/// let (pid, page) = bpm.new_page(1).unwrap();
/// page.as_mut_slice()[0] = 0xAB;
/// bpm.unpin_page(pid, true).unwrap();
///
/// let page = bpm.pin_page(pid, false).unwrap();
/// assert_eq!(page.as_slice()[0], 0xAB);
/// bpm.unpin_page(pid, false).unwrap();
/// ```
pub struct BufferPoolManager<D: DiskStore = DiskManager> {
    /// Fixed pool of frames allocated at startup.
    frames: Vec<Frame>,

    /// Maps resident page IDs to frame IDs.
    page_table: HashMap<PageId, FrameId>,

    /// Eviction policy for selecting victim frames.
    replacer: Box<dyn Replacer>,

    /// Handles all disk I/O.
    disk: D,

    /// Performance statistics.
    stats: BufferPoolStats,

    /// Logical clock stamped on frames at every pin and reset.
    tick: u64,
}

impl<D: DiskStore> BufferPoolManager<D> {
    /// Create a pool of `pool_size` frames using the default policy.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk: D) -> Self {
        Self::with_config(BufferPoolConfig::new(pool_size), disk)
    }

    /// Create a pool from a [`BufferPoolConfig`].
    ///
    /// # Panics
    /// Panics if `config.pool_size` is 0.
    pub fn with_config(config: BufferPoolConfig, disk: D) -> Self {
        let replacer = config.replacer.build(config.pool_size);
        Self::with_replacer(config.pool_size, disk, replacer)
    }

    /// Create a pool driven by a caller-supplied replacer.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn with_replacer(pool_size: usize, disk: D, replacer: Box<dyn Replacer>) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        // Allocate all frames upfront
        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();

        debug!(pool_size, replacer = replacer.name(), "created buffer pool");

        Self {
            frames,
            page_table: HashMap::with_capacity(pool_size),
            replacer,
            disk,
            stats: BufferPoolStats::new(),
            tick: 0,
        }
    }

    // ========================================================================
    // Public API: Pin and unpin
    // ========================================================================

    /// Pin `page_id` and return its buffer.
    ///
    /// A resident page is pinned again (a hit). Otherwise the replacer picks
    /// a victim frame, which is written back if dirty, and the page is read
    /// from disk into it. With `is_empty` the read is skipped and the frame
    /// starts zeroed; use this when the caller will overwrite the whole
    /// page.
    ///
    /// # Errors
    /// - `Error::InvalidPageId` for the sentinel id
    /// - `Error::NoFreeFrames` if all frames are pinned
    /// - disk errors from writing the victim or reading the page
    pub fn pin_page(&mut self, page_id: PageId, is_empty: bool) -> Result<&mut Page> {
        let frame_id = self.pin_frame(page_id, is_empty)?;
        Ok(self.frames[frame_id.0].page_mut())
    }

    /// Drop one pin on `page_id`, marking it dirty if `is_dirty`.
    ///
    /// The dirty flag is sticky: unpinning with `false` never clears it.
    ///
    /// # Errors
    /// - `Error::PageNotResident` if the page isn't in the pool
    /// - `Error::PageNotPinned` if its pin count is already 0
    pub fn unpin_page(&mut self, page_id: PageId, is_dirty: bool) -> Result<()> {
        let frame_id = self
            .find_frame(page_id)
            .ok_or(Error::PageNotResident(page_id))?;
        let frame = &mut self.frames[frame_id.0];

        if !frame.is_pinned() {
            return Err(Error::PageNotPinned(page_id));
        }

        frame.unpin();
        if is_dirty {
            frame.mark_dirty();
        }
        Ok(())
    }

    /// Pin `page_id` behind a guard that unpins on drop.
    pub fn fetch_page(&mut self, page_id: PageId) -> Result<PageGuard<'_, D>> {
        let frame_id = self.pin_frame(page_id, false)?;
        Ok(PageGuard::new(self, frame_id, page_id))
    }

    // ========================================================================
    // Public API: Create and delete pages
    // ========================================================================

    /// Allocate `how_many` consecutive pages on disk and pin the first.
    ///
    /// The first page is pinned as empty (zeroed, not read). If it cannot be
    /// pinned, the whole run is deallocated again before the error is
    /// returned.
    ///
    /// # Errors
    /// - `Error::InvalidAllocation` if `how_many` is 0
    /// - `Error::NoFreeFrames` if all frames are pinned
    /// - disk errors from allocation
    pub fn new_page(&mut self, how_many: u32) -> Result<(PageId, &mut Page)> {
        let (page_id, frame_id) = self.new_page_frame(how_many)?;
        Ok((page_id, self.frames[frame_id.0].page_mut()))
    }

    /// Allocate one page and pin it behind a guard.
    pub fn create_page(&mut self) -> Result<PageGuard<'_, D>> {
        let (page_id, frame_id) = self.new_page_frame(1)?;
        Ok(PageGuard::new(self, frame_id, page_id))
    }

    /// Drop `page_id` from the pool and deallocate it on disk.
    ///
    /// The caller may still hold one pin on the page; it is released along
    /// with any unwritten changes.
    ///
    /// # Errors
    /// - `Error::PagePinned` if the page has more than one pin
    /// - disk errors from deallocation (the pool is left unchanged)
    pub fn free_page(&mut self, page_id: PageId) -> Result<()> {
        let Some(frame_id) = self.find_frame(page_id) else {
            self.disk.deallocate_page(page_id)?;
            debug!(%page_id, "freed non-resident page");
            return Ok(());
        };

        let pin_count = self.frames[frame_id.0].pin_count();
        if pin_count > 1 {
            return Err(Error::PagePinned { page_id, pin_count });
        }

        self.disk.deallocate_page(page_id)?;
        self.evict_to_empty(frame_id);
        debug!(%page_id, frame = %frame_id, "freed resident page");
        Ok(())
    }

    // ========================================================================
    // Public API: Flush pages
    // ========================================================================

    /// Write `page_id` back if dirty and empty its frame.
    ///
    /// If the write fails the frame is emptied anyway and the error is
    /// returned.
    ///
    /// # Errors
    /// - `Error::InvalidPageId` for the sentinel id
    /// - `Error::PageNotResident` if the page isn't in the pool
    /// - `Error::PagePinned` if the page is pinned
    pub fn flush_page(&mut self, page_id: PageId) -> Result<()> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }
        let frame_id = self
            .find_frame(page_id)
            .ok_or(Error::PageNotResident(page_id))?;

        let pin_count = self.frames[frame_id.0].pin_count();
        if pin_count > 0 {
            return Err(Error::PagePinned { page_id, pin_count });
        }

        let written = self.write_back(frame_id);
        self.evict_to_empty(frame_id);
        debug!(%page_id, "flushed page");
        written
    }

    /// Write back every dirty page and empty every frame.
    ///
    /// Pinned frames are drained too; each one is logged and the call
    /// reports `Error::PagesStillPinned` once everything is flushed. A
    /// failed write takes precedence over that.
    pub fn flush_all_pages(&mut self) -> Result<()> {
        let mut pinned = 0;
        let mut first_error = None;

        for index in 0..self.frames.len() {
            let frame_id = FrameId::new(index);
            let frame = &self.frames[index];

            if frame.is_pinned() {
                pinned += 1;
                warn!(
                    page_id = %frame.page_id(),
                    pin_count = frame.pin_count(),
                    "flushing pinned page"
                );
            }

            if let Err(err) = self.write_back(frame_id) {
                warn!(frame = %frame_id, error = %err, "write-back failed during flush");
                first_error.get_or_insert(err);
            }

            let tick = self.next_tick();
            self.frames[index].reset(tick);
        }
        self.page_table.clear();
        debug!(pinned, "flushed all pages");

        match first_error {
            Some(err) => Err(err),
            None if pinned > 0 => Err(Error::PagesStillPinned(pinned)),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Snapshot of the pool's counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Zero the pool's counters.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Human-readable statistics report.
    pub fn stats_report(&self) -> String {
        format!("{} ({} frames, {})", self.stats(), self.pool_size(), self.replacer.name())
    }

    /// Get the pool size.
    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    /// Name of the eviction policy in use.
    pub fn replacer_name(&self) -> &'static str {
        self.replacer.name()
    }

    /// Number of frames with pin count 0, empty frames included.
    pub fn num_unpinned_frames(&self) -> usize {
        self.frames.iter().filter(|f| !f.is_pinned()).count()
    }

    /// Number of frames holding a page.
    pub fn resident_count(&self) -> usize {
        self.page_table.len()
    }

    /// Frame holding `page_id`, if any.
    pub fn find_frame(&self, page_id: PageId) -> Option<FrameId> {
        self.page_table.get(&page_id).copied()
    }

    /// Pin count of a resident page.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        self.find_frame(page_id)
            .map(|fid| self.frames[fid.0].pin_count())
    }

    /// Dirty flag of a resident page.
    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        self.find_frame(page_id)
            .map(|fid| self.frames[fid.0].is_dirty())
    }

    /// Read-only view of all frames.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Read-only buffer of a page the caller has already pinned.
    ///
    /// # Errors
    /// - `Error::PageNotResident` if the page isn't in the pool
    /// - `Error::PageNotPinned` if nobody holds a pin on it
    pub fn page(&self, page_id: PageId) -> Result<&Page> {
        let frame_id = self
            .find_frame(page_id)
            .ok_or(Error::PageNotResident(page_id))?;
        let frame = &self.frames[frame_id.0];
        if !frame.is_pinned() {
            return Err(Error::PageNotPinned(page_id));
        }
        Ok(frame.page())
    }

    /// Buffer of a page the caller has already pinned.
    ///
    /// Same errors as [`BufferPoolManager::page`].
    pub fn page_mut(&mut self, page_id: PageId) -> Result<&mut Page> {
        let frame_id = self
            .find_frame(page_id)
            .ok_or(Error::PageNotResident(page_id))?;
        let frame = &mut self.frames[frame_id.0];
        if !frame.is_pinned() {
            return Err(Error::PageNotPinned(page_id));
        }
        Ok(frame.page_mut())
    }

    /// The underlying page store.
    pub fn disk(&self) -> &D {
        &self.disk
    }

    /// Mutable access to the underlying page store.
    pub fn disk_mut(&mut self) -> &mut D {
        &mut self.disk
    }

    // ========================================================================
    // Internal: Called by PageGuard
    // ========================================================================

    pub(crate) fn frame(&self, frame_id: FrameId) -> &Frame {
        &self.frames[frame_id.0]
    }

    pub(crate) fn frame_mut(&mut self, frame_id: FrameId) -> &mut Frame {
        &mut self.frames[frame_id.0]
    }

    // ========================================================================
    // Internal: Core pin logic
    // ========================================================================

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Pin a page into a frame, returning the frame ID.
    fn pin_frame(&mut self, page_id: PageId, is_empty: bool) -> Result<FrameId> {
        if let Some(frame_id) = self.find_frame(page_id) {
            // Cache hit!
            let tick = self.next_tick();
            self.frames[frame_id.0].pin(tick);
            self.stats.record_request(true);
            trace!(%page_id, frame = %frame_id, "pin hit");
            return Ok(frame_id);
        }

        self.stats.record_request(false);
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }

        let frame_id = self
            .replacer
            .pick_victim(&self.frames)
            .ok_or(Error::NoFreeFrames)?;
        debug_assert!(!self.frames[frame_id.0].is_pinned(), "replacer chose a pinned frame");

        self.evict(frame_id)?;

        if is_empty {
            self.frames[frame_id.0].set_page_id(page_id);
        } else {
            self.frames[frame_id.0].read(page_id, &mut self.disk)?;
            self.stats.record_read();
        }

        self.page_table.insert(page_id, frame_id);
        let tick = self.next_tick();
        self.frames[frame_id.0].pin(tick);

        debug!(%page_id, frame = %frame_id, is_empty, "pin miss");
        Ok(frame_id)
    }

    fn new_page_frame(&mut self, how_many: u32) -> Result<(PageId, FrameId)> {
        if how_many == 0 {
            return Err(Error::InvalidAllocation(how_many));
        }

        let first = self.disk.allocate_pages(how_many)?;

        match self.pin_frame(first, true) {
            Ok(frame_id) => {
                debug!(%first, how_many, "allocated new pages");
                Ok((first, frame_id))
            }
            Err(err) => {
                warn!(%first, how_many, error = %err, "rolling back page allocation");
                if let Err(rollback) = self.disk.deallocate_pages(first, how_many) {
                    warn!(%first, how_many, error = %rollback, "rollback deallocation failed");
                }
                Err(err)
            }
        }
    }

    // ========================================================================
    // Internal: Eviction and write-back
    // ========================================================================

    /// Clear a victim frame so it can take a new page.
    ///
    /// A dirty resident page is written back first; if that fails the
    /// victim stays resident and the error is returned.
    fn evict(&mut self, frame_id: FrameId) -> Result<()> {
        let old_page_id = self.frames[frame_id.0].page_id();
        if old_page_id.is_valid() {
            self.write_back(frame_id)?;
            self.stats.record_eviction();
            debug!(page_id = %old_page_id, frame = %frame_id, "evicted page");
        }
        self.evict_to_empty(frame_id);
        Ok(())
    }

    /// Forget whatever `frame_id` holds, without writing it.
    fn evict_to_empty(&mut self, frame_id: FrameId) {
        let old_page_id = self.frames[frame_id.0].page_id();
        if old_page_id.is_valid() {
            self.page_table.remove(&old_page_id);
        }
        let tick = self.next_tick();
        self.frames[frame_id.0].reset(tick);
    }

    /// Write the frame to disk if it holds a dirty page.
    fn write_back(&mut self, frame_id: FrameId) -> Result<()> {
        let frame = &self.frames[frame_id.0];
        if frame.is_empty() || !frame.is_dirty() {
            return Ok(());
        }

        frame.write(&mut self.disk)?;
        self.stats.record_dirty_write();
        trace!(page_id = %frame.page_id(), "wrote dirty page");
        Ok(())
    }
}

impl<D: DiskStore> Drop for BufferPoolManager<D> {
    fn drop(&mut self) {
        if let Err(err) = self.flush_all_pages() {
            warn!(error = %err, "flush on buffer pool teardown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::replacer::ReplacerKind;
    use crate::storage::MemoryDiskManager;

    fn create_test_bpm(pool_size: usize) -> (BufferPoolManager<MemoryDiskManager>, MemoryDiskManager) {
        let disk = MemoryDiskManager::new();
        (BufferPoolManager::new(pool_size, disk.clone()), disk)
    }

    /// Allocate `n` pages directly on disk, bypassing the pool.
    fn allocate(disk: &MemoryDiskManager, n: u32) -> PageId {
        disk.clone().allocate_pages(n).unwrap()
    }

    fn assert_table_consistent(bpm: &BufferPoolManager<MemoryDiskManager>) {
        for (index, frame) in bpm.frames.iter().enumerate() {
            if frame.is_empty() {
                continue;
            }
            assert_eq!(bpm.page_table.get(&frame.page_id()), Some(&FrameId::new(index)));
        }
        assert_eq!(
            bpm.page_table.len(),
            bpm.frames.iter().filter(|f| !f.is_empty()).count()
        );
    }

    #[test]
    fn test_new_page() {
        let (mut bpm, _disk) = create_test_bpm(10);

        let (pid, _) = bpm.new_page(1).unwrap();
        assert_eq!(pid, PageId::new(0));
        assert_eq!(bpm.pin_count(pid), Some(1));

        let (pid, _) = bpm.new_page(3).unwrap();
        assert_eq!(pid, PageId::new(1));
        // Only the first page of the run is pinned.
        assert_eq!(bpm.pin_count(PageId::new(2)), None);
        assert_table_consistent(&bpm);
    }

    #[test]
    fn test_new_page_skips_disk_read() {
        let (mut bpm, disk) = create_test_bpm(4);
        bpm.new_page(1).unwrap();
        assert_eq!(disk.reads(), 0);
    }

    #[test]
    fn test_pin_hit_and_miss_counting() {
        let (mut bpm, disk) = create_test_bpm(4);
        let pid = allocate(&disk, 1);

        bpm.pin_page(pid, false).unwrap();
        bpm.pin_page(pid, false).unwrap();

        let stats = bpm.stats();
        assert_eq!(stats.pin_requests, 2);
        assert_eq!(stats.pin_hits, 1);
        assert_eq!(stats.pages_read, 1);
        assert_eq!(bpm.pin_count(pid), Some(2));
    }

    #[test]
    fn test_tick_advances_on_pin() {
        let (mut bpm, disk) = create_test_bpm(2);
        let pid = allocate(&disk, 1);

        bpm.pin_page(pid, false).unwrap();
        let fid = bpm.find_frame(pid).unwrap();
        let first = bpm.frames[fid.0].last_touch();

        bpm.pin_page(pid, false).unwrap();
        assert!(bpm.frames[fid.0].last_touch() > first);
    }

    #[test]
    fn test_unpin_errors() {
        let (mut bpm, disk) = create_test_bpm(2);
        let pid = allocate(&disk, 1);

        assert!(matches!(
            bpm.unpin_page(pid, false),
            Err(Error::PageNotResident(_))
        ));

        bpm.pin_page(pid, false).unwrap();
        bpm.unpin_page(pid, false).unwrap();
        assert!(matches!(
            bpm.unpin_page(pid, false),
            Err(Error::PageNotPinned(_))
        ));
        assert_eq!(bpm.pin_count(pid), Some(0));
    }

    #[test]
    fn test_dirty_is_sticky() {
        let (mut bpm, disk) = create_test_bpm(2);
        let pid = allocate(&disk, 1);

        bpm.pin_page(pid, false).unwrap();
        bpm.pin_page(pid, false).unwrap();
        bpm.unpin_page(pid, true).unwrap();
        bpm.unpin_page(pid, false).unwrap();

        assert_eq!(bpm.is_dirty(pid), Some(true));
    }

    #[test]
    fn test_dirty_victim_written_back() {
        let (mut bpm, disk) = create_test_bpm(1);

        let (pid0, page) = bpm.new_page(1).unwrap();
        page.as_mut_slice()[0] = 0x42;
        bpm.unpin_page(pid0, true).unwrap();

        let (pid1, _) = bpm.new_page(1).unwrap();
        assert_eq!(bpm.find_frame(pid0), None);
        assert_eq!(disk.page_bytes(pid0).unwrap()[0], 0x42);

        let stats = bpm.stats();
        assert_eq!(stats.dirty_writes, 1);
        assert_eq!(stats.evictions, 1);

        bpm.unpin_page(pid1, false).unwrap();
        let page = bpm.pin_page(pid0, false).unwrap();
        assert_eq!(page.as_slice()[0], 0x42);
    }

    #[test]
    fn test_failed_victim_write_keeps_victim() {
        let (mut bpm, disk) = create_test_bpm(1);
        let (pid0, _) = bpm.new_page(1).unwrap();
        bpm.unpin_page(pid0, true).unwrap();
        let pid1 = allocate(&disk, 1);

        disk.set_fail_writes(true);
        assert!(matches!(bpm.pin_page(pid1, false), Err(Error::Io(_))));
        assert_eq!(bpm.find_frame(pid0), Some(FrameId::new(0)));
        assert_eq!(bpm.is_dirty(pid0), Some(true));
        disk.set_fail_writes(false);
    }

    #[test]
    fn test_failed_read_leaves_frame_empty() {
        let (mut bpm, disk) = create_test_bpm(2);
        let pid = allocate(&disk, 1);

        disk.set_fail_reads(true);
        assert!(bpm.pin_page(pid, false).is_err());
        disk.set_fail_reads(false);

        assert_eq!(bpm.find_frame(pid), None);
        assert_eq!(bpm.num_unpinned_frames(), 2);
        assert_table_consistent(&bpm);
    }

    #[test]
    fn test_pin_invalid_page() {
        let (mut bpm, _disk) = create_test_bpm(2);
        assert!(matches!(
            bpm.pin_page(PageId::INVALID, true),
            Err(Error::InvalidPageId(_))
        ));
        assert_eq!(bpm.stats().pin_requests, 1);
    }

    #[test]
    fn test_new_page_rolls_back_when_pool_full() {
        let (mut bpm, disk) = create_test_bpm(1);
        bpm.new_page(1).unwrap();
        let allocated = disk.allocated_count();

        assert!(matches!(bpm.new_page(4), Err(Error::NoFreeFrames)));
        assert_eq!(disk.allocated_count(), allocated);
    }

    #[test]
    fn test_new_page_zero() {
        let (mut bpm, disk) = create_test_bpm(1);
        assert!(matches!(bpm.new_page(0), Err(Error::InvalidAllocation(0))));
        assert_eq!(disk.allocated_count(), 0);
    }

    #[test]
    fn test_free_page_resident() {
        let (mut bpm, disk) = create_test_bpm(2);
        let (pid, _) = bpm.new_page(1).unwrap();

        // The caller's own pin is tolerated.
        bpm.free_page(pid).unwrap();
        assert_eq!(bpm.find_frame(pid), None);
        assert!(!disk.is_allocated(pid));
        assert_eq!(bpm.num_unpinned_frames(), 2);
    }

    #[test]
    fn test_free_page_shared_fails() {
        let (mut bpm, disk) = create_test_bpm(2);
        let (pid, _) = bpm.new_page(1).unwrap();
        bpm.pin_page(pid, false).unwrap();

        assert!(matches!(
            bpm.free_page(pid),
            Err(Error::PagePinned { pin_count: 2, .. })
        ));
        assert!(disk.is_allocated(pid));
        assert_eq!(bpm.pin_count(pid), Some(2));
    }

    #[test]
    fn test_free_page_not_resident() {
        let (mut bpm, disk) = create_test_bpm(2);
        let pid = allocate(&disk, 1);

        bpm.free_page(pid).unwrap();
        assert!(!disk.is_allocated(pid));
        assert!(bpm.free_page(pid).is_err());
    }

    #[test]
    fn test_flush_page() {
        let (mut bpm, disk) = create_test_bpm(4);
        let (pid, page) = bpm.new_page(1).unwrap();
        page.as_mut_slice()[7] = 0xFF;

        assert!(matches!(bpm.flush_page(pid), Err(Error::PagePinned { .. })));

        bpm.unpin_page(pid, true).unwrap();
        bpm.flush_page(pid).unwrap();

        assert_eq!(disk.writes(), 1);
        assert_eq!(disk.page_bytes(pid).unwrap()[7], 0xFF);
        assert_eq!(bpm.stats().dirty_writes, 1);
        assert_eq!(bpm.find_frame(pid), None);
        assert!(matches!(bpm.flush_page(pid), Err(Error::PageNotResident(_))));
        assert!(matches!(
            bpm.flush_page(PageId::INVALID),
            Err(Error::InvalidPageId(_))
        ));
    }

    #[test]
    fn test_flush_clean_page_skips_write() {
        let (mut bpm, disk) = create_test_bpm(4);
        let pid = allocate(&disk, 1);
        bpm.pin_page(pid, false).unwrap();
        bpm.unpin_page(pid, false).unwrap();

        bpm.flush_page(pid).unwrap();
        assert_eq!(disk.writes(), 0);
        assert_eq!(bpm.find_frame(pid), None);
    }

    #[test]
    fn test_flush_page_write_failure_still_empties() {
        let (mut bpm, disk) = create_test_bpm(4);
        let (pid, _) = bpm.new_page(1).unwrap();
        bpm.unpin_page(pid, true).unwrap();

        disk.set_fail_writes(true);
        assert!(matches!(bpm.flush_page(pid), Err(Error::Io(_))));
        disk.set_fail_writes(false);

        assert_eq!(bpm.find_frame(pid), None);
        assert_eq!(bpm.stats().dirty_writes, 0);
    }

    #[test]
    fn test_flush_all_drains_pinned() {
        let (mut bpm, disk) = create_test_bpm(4);
        let (a, _) = bpm.new_page(1).unwrap();
        let (b, _) = bpm.new_page(1).unwrap();
        bpm.unpin_page(a, true).unwrap();
        bpm.unpin_page(b, true).unwrap();
        bpm.pin_page(b, false).unwrap();

        assert!(matches!(
            bpm.flush_all_pages(),
            Err(Error::PagesStillPinned(1))
        ));
        assert_eq!(disk.writes(), 2);
        assert_eq!(bpm.resident_count(), 0);
        assert_eq!(bpm.num_unpinned_frames(), 4);

        bpm.flush_all_pages().unwrap();
        assert_eq!(disk.writes(), 2);
    }

    #[test]
    fn test_drop_flushes() {
        let disk = MemoryDiskManager::new();
        let pid;
        {
            let mut bpm = BufferPoolManager::new(2, disk.clone());
            let (p, page) = bpm.new_page(1).unwrap();
            page.as_mut_slice()[0] = 9;
            pid = p;
            bpm.unpin_page(pid, true).unwrap();
        }
        assert_eq!(disk.page_bytes(pid).unwrap()[0], 9);
    }

    #[test]
    fn test_page_mut_requires_pin() {
        let (mut bpm, _disk) = create_test_bpm(2);
        let (pid, _) = bpm.new_page(1).unwrap();

        bpm.page_mut(pid).unwrap().as_mut_slice()[0] = 1;
        assert_eq!(bpm.page(pid).unwrap().as_slice()[0], 1);
        bpm.unpin_page(pid, true).unwrap();
        assert!(matches!(bpm.page_mut(pid), Err(Error::PageNotPinned(_))));
        assert!(matches!(
            bpm.page(PageId::new(40)),
            Err(Error::PageNotResident(_))
        ));
    }

    #[test]
    fn test_lru_pool_evicts_least_recent() {
        let disk = MemoryDiskManager::new();
        let config = BufferPoolConfig::new(2).with_replacer(ReplacerKind::Lru);
        let mut bpm = BufferPoolManager::with_config(config, disk.clone());
        let first = allocate(&disk, 3);
        let (a, b, c) = (first, first.offset(1), first.offset(2));

        for pid in [a, b, a] {
            bpm.pin_page(pid, false).unwrap();
            bpm.unpin_page(pid, false).unwrap();
        }

        bpm.pin_page(c, false).unwrap();
        assert!(bpm.find_frame(a).is_some());
        assert!(bpm.find_frame(b).is_none());
        assert_eq!(bpm.replacer_name(), "lru");
    }

    #[test]
    fn test_stats_report() {
        let (mut bpm, disk) = create_test_bpm(3);
        let pid = allocate(&disk, 1);
        bpm.pin_page(pid, false).unwrap();

        let report = bpm.stats_report();
        assert!(report.contains("pin requests:         1"));
        assert!(report.contains("3 frames, clock"));

        bpm.reset_stats();
        assert_eq!(bpm.stats(), StatsSnapshot::default());
    }

    #[test]
    #[should_panic(expected = "pool_size must be > 0")]
    fn test_zero_pool_panics() {
        let _ = BufferPoolManager::new(0, MemoryDiskManager::new());
    }
}
