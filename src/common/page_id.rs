//! Page identifier type.

use std::fmt;

/// Identifies a page in the disk store.
///
/// `u32` ids, with the top value reserved as [`PageId::INVALID`]. Pages
/// handed out by one allocation are consecutive, so `first.offset(i)` names
/// the i-th page of a run.
///
/// # Example
/// ```
/// use heapstore::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.offset(2), PageId::new(44));
/// assert!(!PageId::default().is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Sentinel meaning "no page".
    ///
    /// Empty frames and unlinked heap-page chain pointers hold this value.
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// The page `n` positions after this one in a consecutive run.
    #[inline]
    pub fn offset(&self, n: u32) -> PageId {
        PageId(self.0 + n)
    }

    /// Byte offset of the page in a file of `slot_size`-byte slots.
    #[inline]
    pub(crate) fn file_offset(&self, slot_size: usize) -> u64 {
        self.0 as u64 * slot_size as u64
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl From<u32> for PageId {
    fn from(id: u32) -> Self {
        PageId(id)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
