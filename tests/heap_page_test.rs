//! Heap page tests.
//!
//! Layout arithmetic, delete/scan interplay and compaction, plus a
//! randomized check of a heap page against a plain vector model.

use heapstore::common::{Error, PageId};
use heapstore::storage::page::{HeapPage, Page, RecordId, HEADER_SIZE, SLOT_SIZE};
use heapstore::PAGE_SIZE;
use proptest::prelude::*;

fn heap_page(data_len: usize) -> HeapPage<Vec<u8>> {
    let mut page = HeapPage::new(vec![0u8; HEADER_SIZE + data_len]);
    page.init(PageId::new(9));
    page
}

#[test]
fn test_small_page_accounting() {
    let mut page = heap_page(40);
    let record = b"0123456789";

    let rid = page.insert_record(record).unwrap();

    // One slot used, one reserved for the next insert.
    assert_eq!(page.available_space(), 40 - 10 - SLOT_SIZE - SLOT_SIZE);
    assert_eq!(page.available_space(), 22);
    assert_eq!(page.get_record(rid).unwrap(), record);
}

#[test]
fn test_full_size_page_capacity() {
    let mut page = Page::new();
    let mut heap = HeapPage::new(&mut page);
    heap.init(PageId::new(0));
    assert_eq!(heap.data_len(), PAGE_SIZE - HEADER_SIZE);

    let mut count = 0;
    while heap.insert_record(&[0xAB; 60]).is_some() {
        count += 1;
    }
    assert_eq!(count, (PAGE_SIZE - HEADER_SIZE) / (60 + SLOT_SIZE));
    assert!(heap.available_space() < 60);
    assert_eq!(heap.num_records(), count);
}

#[test]
fn test_delete_then_scan_skips_tombstone() {
    let mut page = heap_page(200);
    let rids: Vec<RecordId> = (0..5u8)
        .map(|i| page.insert_record(&vec![i; i as usize + 1]).unwrap())
        .collect();

    page.delete_record(rids[2]).unwrap();

    let mut seen = Vec::new();
    let mut cursor = page.first_record();
    while let Some(rid) = cursor {
        seen.push(rid);
        cursor = page.next_record(rid).unwrap();
    }
    assert_eq!(seen, vec![rids[0], rids[1], rids[3], rids[4]]);

    for &rid in &seen {
        let i = rid.slot as u8;
        assert_eq!(page.get_record(rid).unwrap(), vec![i; i as usize + 1]);
    }
    assert!(matches!(
        page.get_record(rids[2]),
        Err(Error::InvalidRecordId(_))
    ));
}

#[test]
fn test_delete_during_scan() {
    let mut page = heap_page(200);
    for i in 0..6u8 {
        page.insert_record(&[i; 3]).unwrap();
    }

    let mut cursor = page.first_record();
    while let Some(rid) = cursor {
        if rid.slot % 2 == 0 {
            page.delete_record(rid).unwrap();
        }
        cursor = page.next_record(rid).unwrap();
    }

    let left: Vec<u16> = page.records().map(|rid| rid.slot).collect();
    assert_eq!(left, vec![1, 3, 5]);
    assert_eq!(page.return_record(RecordId::new(PageId::new(9), 5)).unwrap(), &[5u8; 3]);
}

#[test]
fn test_first_record_on_empty_page() {
    let page = heap_page(64);
    assert!(page.first_record().is_none());
    assert!(page.records().next().is_none());
}

#[test]
fn test_deleted_records_keep_page_non_empty() {
    let mut page = heap_page(100);
    let a = page.insert_record(b"first").unwrap();
    let b = page.insert_record(b"second").unwrap();

    page.delete_record(a).unwrap();
    page.delete_record(b).unwrap();

    assert!(!page.is_empty());
    assert_eq!(page.num_records(), 0);
    assert_eq!(page.num_slots(), 2);
    assert!(page.first_record().is_none());

    assert!(page.compact_slot_dir().is_empty());
    assert!(page.is_empty());
    assert_eq!(page.free_space(), 100);
}

#[test]
fn test_compaction_recovers_slots() {
    let mut page = heap_page(300);
    let lens = [5usize, 17, 0, 9, 33, 2];
    let rids: Vec<RecordId> = lens
        .iter()
        .enumerate()
        .map(|(i, &len)| page.insert_record(&vec![i as u8 + 1; len]).unwrap())
        .collect();

    page.delete_record(rids[1]).unwrap();
    page.delete_record(rids[4]).unwrap();
    let remap = page.compact_slot_dir();

    assert_eq!(remap, vec![(0, 0), (2, 1), (3, 2), (5, 3)]);
    let live: usize = [0, 2, 3, 5].iter().map(|&i| lens[i] + SLOT_SIZE).sum();
    assert_eq!(page.free_space(), 300 - live);
    assert_eq!(page.num_slots(), 4);

    for (old, new) in remap {
        let rid = RecordId::new(PageId::new(9), new);
        assert_eq!(
            page.get_record(rid).unwrap(),
            vec![old as u8 + 1; lens[old as usize]]
        );
    }
}

#[test]
fn test_double_compaction_is_identical() {
    let mut page = heap_page(256);
    let rids: Vec<RecordId> = (0..8u8)
        .map(|i| page.insert_record(&vec![i; (i as usize * 3) % 11]).unwrap())
        .collect();
    for &i in &[0usize, 3, 4, 7] {
        page.delete_record(rids[i]).unwrap();
    }

    page.compact_slot_dir();
    let once = page.into_inner();

    let mut page = HeapPage::new(once.clone());
    let remap = page.compact_slot_dir();
    assert!(remap.iter().all(|&(old, new)| old == new));
    assert_eq!(page.into_inner(), once);
}

#[test]
fn test_chain_links_survive_compaction() {
    let mut page = heap_page(64);
    page.set_next_page(PageId::new(10));
    page.set_prev_page(PageId::new(8));
    let rid = page.insert_record(b"x").unwrap();
    page.delete_record(rid).unwrap();

    page.compact_slot_dir();

    assert_eq!(page.page_id(), PageId::new(9));
    assert_eq!(page.next_page(), PageId::new(10));
    assert_eq!(page.prev_page(), PageId::new(8));
}

#[test]
fn test_insert_with_less_than_a_slot_free() {
    let mut page = heap_page(10);
    page.insert_record(&[1; 4]).unwrap();
    assert_eq!(page.free_space(), 2);
    assert_eq!(page.available_space(), 0);
    assert!(page.insert_record(&[]).is_none());
}

#[test]
fn test_record_id_from_other_page() {
    let mut page = heap_page(64);
    page.insert_record(b"mine").unwrap();

    let foreign = RecordId::new(PageId::new(3), 0);
    assert!(page.return_record(foreign).is_err());
    assert!(page.delete_record(foreign).is_err());
    assert!(page.next_record(foreign).is_err());
}

// ============================================================================
// Model check
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Insert(Vec<u8>),
    Delete(usize),
    Compact,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => prop::collection::vec(any::<u8>(), 0..48).prop_map(Op::Insert),
        3 => any::<usize>().prop_map(Op::Delete),
        1 => Just(Op::Compact),
    ]
}

proptest! {
    #[test]
    fn prop_heap_page_matches_model(ops in prop::collection::vec(op_strategy(), 1..150)) {
        const DATA_LEN: usize = 512;
        let mut page = heap_page(DATA_LEN);
        // One entry per slot; `None` is a tombstone.
        let mut model: Vec<Option<Vec<u8>>> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(bytes) => {
                    let fits = bytes.len() + SLOT_SIZE <= page.free_space();
                    match page.insert_record(&bytes) {
                        Some(rid) => {
                            prop_assert!(fits);
                            prop_assert_eq!(rid.slot as usize, model.len());
                            model.push(Some(bytes));
                        }
                        None => prop_assert!(!fits),
                    }
                }
                Op::Delete(pick) => {
                    if model.is_empty() {
                        continue;
                    }
                    let slot = pick % model.len();
                    let rid = RecordId::new(PageId::new(9), slot as u16);
                    let result = page.delete_record(rid);
                    prop_assert_eq!(result.is_ok(), model[slot].is_some());
                    model[slot] = None;
                }
                Op::Compact => {
                    let remap = page.compact_slot_dir();
                    let expected: Vec<(u16, u16)> = model
                        .iter()
                        .enumerate()
                        .filter(|(_, r)| r.is_some())
                        .enumerate()
                        .map(|(new, (old, _))| (old as u16, new as u16))
                        .collect();
                    prop_assert_eq!(remap, expected);
                    model.retain(Option::is_some);
                }
            }

            prop_assert_eq!(page.num_slots() as usize, model.len());
            let live_bytes: usize = model.iter().flatten().map(Vec::len).sum();
            prop_assert_eq!(
                page.free_space(),
                DATA_LEN - model.len() * SLOT_SIZE - live_bytes
            );

            let live: Vec<u16> = page.records().map(|rid| rid.slot).collect();
            let expected: Vec<u16> = model
                .iter()
                .enumerate()
                .filter(|(_, r)| r.is_some())
                .map(|(i, _)| i as u16)
                .collect();
            prop_assert_eq!(live, expected);

            for (slot, record) in model.iter().enumerate() {
                let rid = RecordId::new(PageId::new(9), slot as u16);
                match record {
                    Some(bytes) => prop_assert_eq!(page.return_record(rid).unwrap(), &bytes[..]),
                    None => prop_assert!(page.return_record(rid).is_err()),
                }
            }
        }
    }
}
