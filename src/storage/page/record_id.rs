//! Record identifier type.

use std::fmt;

use crate::common::PageId;

/// Logical address of a record: the heap page holding it and its slot.
///
/// A `RecordId` stays valid until the record is deleted or the page's slot
/// directory is compacted (compaction renumbers slots).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

impl RecordId {
    #[inline]
    pub fn new(page_id: PageId, slot: u16) -> Self {
        Self { page_id, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({}, slot {})", self.page_id, self.slot)
    }
}
