//! Storage layer - page stores and page formats.
//!
//! This module handles everything below the buffer pool:
//! - [`DiskStore`] - The page store contract
//! - [`DiskManager`] - File-backed store with per-page checksums
//! - [`MemoryDiskManager`] - In-memory store with I/O counters
//! - [`page`] - Page types and the slotted heap page layout

mod disk_manager;
mod disk_store;
mod memory_disk_manager;
pub mod page;

pub use disk_manager::DiskManager;
pub use disk_store::DiskStore;
pub use memory_disk_manager::MemoryDiskManager;
