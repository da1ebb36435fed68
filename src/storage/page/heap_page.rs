//! Slotted heap page layout.
//!
//! A [`HeapPage`] interprets a byte buffer (normally a buffer-pool
//! [`Page`](super::Page)) as a header, a slot directory growing forward and
//! a record region growing backward from the end of the buffer.
//!
//! # Layout
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     page_id     (little-endian)
//! 4       4     next_page
//! 8       4     prev_page
//! 12      2     num_slots
//! 14      2     fill_ptr    (data-region offset of the lowest record byte)
//! 16      2     free_space
//! 18      2     reserved
//! 20      ..    data region
//!
//! data region:
//! ┌────────┬────────┬─────┬──────────────┬──────────┬──────────┐
//! │ slot 0 │ slot 1 │ ... │  free space  │ record 1 │ record 0 │
//! └────────┴────────┴─────┴──────────────┴──────────┴──────────┘
//! 0                num_slots*4         fill_ptr            data_len
//! ```
//!
//! Each slot is `{offset: u16, length: u16}` relative to the data region.
//! A deleted slot keeps its index with `offset == u16::MAX` until
//! [`HeapPage::compact_slot_dir`] reclaims it.
//!
//! `free_space` always equals `fill_ptr - num_slots * SLOT_SIZE`.

use crate::common::{Error, PageId, Result};

use super::RecordId;

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 20;

/// Size of one slot directory entry in bytes.
pub const SLOT_SIZE: usize = 4;

const OFFSET_PAGE_ID: usize = 0;
const OFFSET_NEXT_PAGE: usize = 4;
const OFFSET_PREV_PAGE: usize = 8;
const OFFSET_NUM_SLOTS: usize = 12;
const OFFSET_FILL_PTR: usize = 14;
const OFFSET_FREE_SPACE: usize = 16;

const TOMBSTONE: u16 = u16::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    offset: u16,
    length: u16,
}

impl Slot {
    const EMPTY: Slot = Slot {
        offset: TOMBSTONE,
        length: 0,
    };

    #[inline]
    fn is_tombstone(&self) -> bool {
        self.offset == TOMBSTONE
    }

    #[inline]
    fn range(&self) -> std::ops::Range<usize> {
        let start = HEADER_SIZE + self.offset as usize;
        start..start + self.length as usize
    }
}

/// A slotted page view over a byte buffer.
///
/// Read operations need `B: AsRef<[u8]>`; mutations also need
/// `B: AsMut<[u8]>`. This lets the same code run over a `&mut Page` pinned
/// in the buffer pool or over a small `Vec<u8>` in tests.
///
/// # Example
/// ```
/// use heapstore::storage::page::{HeapPage, Page};
/// use heapstore::PageId;
///
/// let mut page = Page::new();
/// let mut heap = HeapPage::new(&mut page);
/// heap.init(PageId::new(3));
///
/// let rid = heap.insert_record(b"hello").unwrap();
/// assert_eq!(heap.return_record(rid).unwrap(), b"hello");
/// ```
pub struct HeapPage<B> {
    buf: B,
}

impl<B: AsRef<[u8]>> HeapPage<B> {
    /// Wrap `buf` without touching its contents.
    ///
    /// Call [`HeapPage::init`] on a fresh buffer before using it.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than the header, or if its data region
    /// cannot be addressed with `u16` offsets.
    pub fn new(buf: B) -> Self {
        let len = buf.as_ref().len();
        assert!(len >= HEADER_SIZE, "buffer too small for HeapPage");
        assert!(
            len - HEADER_SIZE < TOMBSTONE as usize,
            "buffer too large for HeapPage"
        );
        Self { buf }
    }

    /// Give back the wrapped buffer.
    pub fn into_inner(self) -> B {
        self.buf
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        self.buf.as_ref()
    }

    fn read_u16(&self, at: usize) -> u16 {
        let b = self.bytes();
        u16::from_le_bytes([b[at], b[at + 1]])
    }

    fn read_u32(&self, at: usize) -> u32 {
        let b = self.bytes();
        u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
    }

    /// Bytes available to the slot directory and records together.
    #[inline]
    pub fn data_len(&self) -> usize {
        self.bytes().len() - HEADER_SIZE
    }

    /// Id this page was initialized with.
    pub fn page_id(&self) -> PageId {
        PageId::new(self.read_u32(OFFSET_PAGE_ID))
    }

    /// Next page in the heap-file chain.
    pub fn next_page(&self) -> PageId {
        PageId::new(self.read_u32(OFFSET_NEXT_PAGE))
    }

    /// Previous page in the heap-file chain.
    pub fn prev_page(&self) -> PageId {
        PageId::new(self.read_u32(OFFSET_PREV_PAGE))
    }

    /// Length of the slot directory, tombstones included.
    pub fn num_slots(&self) -> u16 {
        self.read_u16(OFFSET_NUM_SLOTS)
    }

    fn fill_ptr(&self) -> usize {
        self.read_u16(OFFSET_FILL_PTR) as usize
    }

    /// Bytes between the end of the slot directory and the fill pointer.
    pub fn free_space(&self) -> usize {
        self.read_u16(OFFSET_FREE_SPACE) as usize
    }

    /// Largest record that can be inserted right now.
    ///
    /// Room for the new record's slot entry is reserved up front.
    pub fn available_space(&self) -> usize {
        self.free_space().saturating_sub(SLOT_SIZE)
    }

    /// True when the slot directory is empty.
    ///
    /// Deleted slots still count until [`HeapPage::compact_slot_dir`] runs,
    /// so a page whose records were all deleted is not empty yet. Use
    /// [`HeapPage::num_records`] for the live count.
    pub fn is_empty(&self) -> bool {
        self.num_slots() == 0
    }

    /// Number of live (not deleted) records.
    pub fn num_records(&self) -> usize {
        (0..self.num_slots())
            .filter(|&i| !self.slot(i).is_tombstone())
            .count()
    }

    fn slot(&self, index: u16) -> Slot {
        let at = HEADER_SIZE + index as usize * SLOT_SIZE;
        Slot {
            offset: self.read_u16(at),
            length: self.read_u16(at + 2),
        }
    }

    fn validate(&self, rid: RecordId) -> Result<Slot> {
        if rid.page_id != self.page_id() || rid.slot >= self.num_slots() {
            return Err(Error::InvalidRecordId(rid));
        }
        let slot = self.slot(rid.slot);
        if slot.is_tombstone() {
            return Err(Error::InvalidRecordId(rid));
        }
        Ok(slot)
    }

    fn scan_from(&self, start: usize) -> Option<RecordId> {
        (start..self.num_slots() as usize)
            .map(|i| i as u16)
            .find(|&i| !self.slot(i).is_tombstone())
            .map(|i| RecordId::new(self.page_id(), i))
    }

    /// First live record on the page, or `None` if there is none.
    pub fn first_record(&self) -> Option<RecordId> {
        self.scan_from(0)
    }

    /// Live record following `current`, or `None` at the end of the page.
    ///
    /// `current` may have been deleted since it was returned; the scan
    /// simply continues after its slot.
    ///
    /// # Errors
    /// `InvalidRecordId` if `current` names another page or a slot beyond
    /// the directory.
    pub fn next_record(&self, current: RecordId) -> Result<Option<RecordId>> {
        if current.page_id != self.page_id() || current.slot >= self.num_slots() {
            return Err(Error::InvalidRecordId(current));
        }
        Ok(self.scan_from(current.slot as usize + 1))
    }

    /// Iterate over the ids of all live records in slot order.
    pub fn records(&self) -> Records<'_, B> {
        Records {
            page: self,
            next: self.first_record(),
        }
    }

    /// Borrow a record's bytes in place.
    ///
    /// The view must not outlive any mutation of the page.
    pub fn return_record(&self, rid: RecordId) -> Result<&[u8]> {
        let slot = self.validate(rid)?;
        Ok(&self.bytes()[slot.range()])
    }

    /// Copy a record's bytes out of the page.
    pub fn get_record(&self, rid: RecordId) -> Result<Vec<u8>> {
        self.return_record(rid).map(<[u8]>::to_vec)
    }

    /// Copy a record into `out`, returning its length.
    ///
    /// # Errors
    /// `BufferTooSmall` if `out` is shorter than the record.
    pub fn read_record_into(&self, rid: RecordId, out: &mut [u8]) -> Result<usize> {
        let record = self.return_record(rid)?;
        if out.len() < record.len() {
            return Err(Error::BufferTooSmall {
                needed: record.len(),
                available: out.len(),
            });
        }
        out[..record.len()].copy_from_slice(record);
        Ok(record.len())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> HeapPage<B> {
    #[inline]
    fn bytes_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut()
    }

    fn write_u16(&mut self, at: usize, value: u16) {
        self.bytes_mut()[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn write_u32(&mut self, at: usize, value: u32) {
        self.bytes_mut()[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn set_slot(&mut self, index: u16, slot: Slot) {
        let at = HEADER_SIZE + index as usize * SLOT_SIZE;
        self.write_u16(at, slot.offset);
        self.write_u16(at + 2, slot.length);
    }

    fn set_num_slots(&mut self, n: u16) {
        self.write_u16(OFFSET_NUM_SLOTS, n);
    }

    fn set_fill_ptr(&mut self, fill: usize) {
        self.write_u16(OFFSET_FILL_PTR, fill as u16);
    }

    fn set_free_space(&mut self, free: usize) {
        self.write_u16(OFFSET_FREE_SPACE, free as u16);
    }

    /// Format the buffer as an empty page with id `page_id`.
    ///
    /// Chain links are cleared to `PageId::INVALID` and the data region is
    /// zeroed.
    pub fn init(&mut self, page_id: PageId) {
        let data_len = self.data_len();
        self.bytes_mut().fill(0);
        self.write_u32(OFFSET_PAGE_ID, page_id.0);
        self.write_u32(OFFSET_NEXT_PAGE, PageId::INVALID.0);
        self.write_u32(OFFSET_PREV_PAGE, PageId::INVALID.0);
        self.set_num_slots(0);
        self.set_fill_ptr(data_len);
        self.set_free_space(data_len);
    }

    /// Link the next page in the heap-file chain.
    pub fn set_next_page(&mut self, page_id: PageId) {
        self.write_u32(OFFSET_NEXT_PAGE, page_id.0);
    }

    /// Link the previous page in the heap-file chain.
    pub fn set_prev_page(&mut self, page_id: PageId) {
        self.write_u32(OFFSET_PREV_PAGE, page_id.0);
    }

    /// Append a record, returning its id.
    ///
    /// Returns `None` when the record is larger than
    /// [`HeapPage::available_space`]; the caller should try another page.
    pub fn insert_record(&mut self, record: &[u8]) -> Option<RecordId> {
        let len = record.len();
        let free = self.free_space();
        if len + SLOT_SIZE > free {
            return None;
        }

        let fill = self.fill_ptr() - len;
        let start = HEADER_SIZE + fill;
        self.bytes_mut()[start..start + len].copy_from_slice(record);

        let index = self.num_slots();
        self.set_slot(
            index,
            Slot {
                offset: fill as u16,
                length: len as u16,
            },
        );
        self.set_num_slots(index + 1);
        self.set_fill_ptr(fill);
        self.set_free_space(free - len - SLOT_SIZE);

        Some(RecordId::new(self.page_id(), index))
    }

    /// Delete a record and close the gap it leaves in the record region.
    ///
    /// Records stored below the deleted one move up by its length; their
    /// slot indices do not change. The deleted slot stays in the directory
    /// as a tombstone.
    pub fn delete_record(&mut self, rid: RecordId) -> Result<()> {
        let victim = self.validate(rid)?;
        let offset = victim.offset as usize;
        let len = victim.length as usize;
        let fill = self.fill_ptr();

        let bytes = self.bytes_mut();
        bytes.copy_within(HEADER_SIZE + fill..HEADER_SIZE + offset, HEADER_SIZE + fill + len);
        bytes[HEADER_SIZE + fill..HEADER_SIZE + fill + len].fill(0);

        for i in 0..self.num_slots() {
            if i == rid.slot {
                continue;
            }
            let mut slot = self.slot(i);
            if slot.is_tombstone() {
                continue;
            }
            let below = (slot.offset as usize) < offset;
            // Zero-length records inserted after the victim share its offset.
            let stacked = slot.length == 0 && slot.offset as usize == offset;
            if below || stacked {
                slot.offset += len as u16;
                self.set_slot(i, slot);
            }
        }

        self.set_slot(rid.slot, Slot::EMPTY);
        self.set_fill_ptr(fill + len);
        let free = self.free_space();
        self.set_free_space(free + len);
        Ok(())
    }

    /// Drop tombstoned slots and repack the surviving records.
    ///
    /// Survivors keep their relative order and are renumbered from 0, so
    /// any outstanding [`RecordId`] for this page may now point at a
    /// different record. The returned `(old_slot, new_slot)` pairs let
    /// callers rewrite ids they still hold.
    pub fn compact_slot_dir(&mut self) -> Vec<(u16, u16)> {
        let live: Vec<(u16, Vec<u8>)> = (0..self.num_slots())
            .filter_map(|i| {
                let slot = self.slot(i);
                (!slot.is_tombstone()).then(|| (i, self.bytes()[slot.range()].to_vec()))
            })
            .collect();

        let mut fill = self.data_len();
        let mut remap = Vec::with_capacity(live.len());
        for (new_index, (old_index, record)) in live.iter().enumerate() {
            fill -= record.len();
            let start = HEADER_SIZE + fill;
            self.bytes_mut()[start..start + record.len()].copy_from_slice(record);
            self.set_slot(
                new_index as u16,
                Slot {
                    offset: fill as u16,
                    length: record.len() as u16,
                },
            );
            remap.push((*old_index, new_index as u16));
        }

        let dir_end = live.len() * SLOT_SIZE;
        self.bytes_mut()[HEADER_SIZE + dir_end..HEADER_SIZE + fill].fill(0);
        self.set_num_slots(live.len() as u16);
        self.set_fill_ptr(fill);
        self.set_free_space(fill - dir_end);
        remap
    }
}

/// Iterator over the live records of a [`HeapPage`].
pub struct Records<'a, B> {
    page: &'a HeapPage<B>,
    next: Option<RecordId>,
}

impl<B: AsRef<[u8]>> Iterator for Records<'_, B> {
    type Item = RecordId;

    fn next(&mut self) -> Option<RecordId> {
        let current = self.next?;
        self.next = self.page.scan_from(current.slot as usize + 1);
        Some(current)
    }
}
