//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The raw 4KB data container
//! - [`HeapPage`] - Slotted layout for variable-length records
//! - [`RecordId`] - Address of a record inside a heap page

mod heap_page;
#[allow(clippy::module_inception)]
mod page;
mod record_id;

pub use heap_page::{HeapPage, Records, HEADER_SIZE, SLOT_SIZE};
pub use page::Page;
pub use record_id::RecordId;
