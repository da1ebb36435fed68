//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between page users (such
//! as heap pages) and the page store. It manages a fixed pool of frames,
//! each holding one page.
//!
//! # Components
//! - [`BufferPoolManager`] - The main page cache
//! - [`Frame`] - A slot in the buffer pool holding a page + metadata
//! - [`PageGuard`] - RAII pin on a page
//! - [`BufferPoolStats`] - Request and write-back counters
//! - [`replacer`] - Eviction policy implementations

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::Frame;
pub use page_guard::PageGuard;
pub use stats::{BufferPoolStats, StatsSnapshot};
