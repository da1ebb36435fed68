//! heapstore - a buffer pool with pluggable eviction over slotted heap pages.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           heapstore                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │         Heap pages (storage/page/heap_page.rs)           │   │
//! │  │     slot directory + variable-length records per page    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                  Buffer Pool (buffer/)                   │   │
//! │  │   ┌─────────────────────────────────────────────────┐   │   │
//! │  │   │        Eviction Policies: Clock | LRU           │   │   │
//! │  │   └─────────────────────────────────────────────────┘   │   │
//! │  │      BufferPoolManager + Frame + Statistics              │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Storage Layer (storage/)                  │   │
//! │  │        DiskStore: DiskManager | MemoryDiskManager        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`buffer`] - Buffer pool management and eviction policies
//! - [`storage`] - Page stores and page formats
//!
//! # Quick Start
//! ```no_run
//! use heapstore::{BufferPoolManager, DiskManager, HeapPage};
//!
//! let disk = DiskManager::open_or_create("heap.db").unwrap();
//! let mut bpm = BufferPoolManager::new(16, disk);
//!
//! let (pid, page) = bpm.new_page(1).unwrap();
//! let mut heap = HeapPage::new(page);
//! heap.init(pid);
//! let rid = heap.insert_record(b"hello").unwrap();
//! bpm.unpin_page(pid, true).unwrap();
//!
//! let page = bpm.pin_page(pid, false).unwrap();
//! assert_eq!(HeapPage::new(page).get_record(rid).unwrap(), b"hello");
//! bpm.unpin_page(pid, false).unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{BufferPoolConfig, PAGE_SIZE};
pub use common::{Error, FrameId, PageId, Result};

pub use buffer::replacer::ReplacerKind;
pub use buffer::{BufferPoolManager, BufferPoolStats, Frame, PageGuard, StatsSnapshot};
pub use storage::page::{HeapPage, Page, RecordId};
pub use storage::{DiskManager, DiskStore, MemoryDiskManager};
