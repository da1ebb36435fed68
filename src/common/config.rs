//! Configuration for heapstore.
//!
//! Process-wide constants plus [`BufferPoolConfig`], the knobs a buffer pool
//! is built from.

use crate::buffer::replacer::ReplacerKind;

/// Size of a page in bytes (4KB).
///
/// Every page on disk and every frame buffer in the pool has exactly this
/// size. Heap page offsets are stored as `u16`, so this must stay below
/// `u16::MAX`.
pub const PAGE_SIZE: usize = 4096;

/// Number of frames used when no pool size is given.
pub const DEFAULT_POOL_SIZE: usize = 50;

/// Maximum number of pages with u32 PageId (the top id is the sentinel).
pub const MAX_PAGES: u64 = u32::MAX as u64;

/// Construction parameters for a [`BufferPoolManager`].
///
/// # Example
/// ```
/// use heapstore::buffer::replacer::ReplacerKind;
/// use heapstore::common::config::BufferPoolConfig;
///
/// let config = BufferPoolConfig::new(16).with_replacer(ReplacerKind::Lru);
/// assert_eq!(config.pool_size, 16);
/// ```
///
/// [`BufferPoolManager`]: crate::buffer::BufferPoolManager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Number of frames (fixed for the pool's lifetime).
    pub pool_size: usize,
    /// Eviction policy the pool is built with.
    pub replacer: ReplacerKind,
}

impl BufferPoolConfig {
    /// Config with `pool_size` frames and the default (Clock) policy.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            replacer: ReplacerKind::default(),
        }
    }

    /// Replace the eviction policy.
    pub fn with_replacer(mut self, replacer: ReplacerKind) -> Self {
        self.replacer = replacer;
        self
    }

    /// Replace the pool size.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_fits_heap_page_offsets() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert!(PAGE_SIZE < u16::MAX as usize);
    }

    #[test]
    fn test_default_config() {
        let config = BufferPoolConfig::default();
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.replacer, ReplacerKind::Clock);
    }

    #[test]
    fn test_builder() {
        let config = BufferPoolConfig::default()
            .with_pool_size(3)
            .with_replacer(ReplacerKind::Lru);
        assert_eq!(config.pool_size, 3);
        assert_eq!(config.replacer, ReplacerKind::Lru);
    }
}
