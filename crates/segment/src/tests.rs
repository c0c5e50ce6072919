use super::*;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

// -------------------- ActiveSegment --------------------

#[test]
fn open_creates_both_files() {
    let dir = tempdir().unwrap();
    let seg = ActiveSegment::open(dir.path(), 123, false).unwrap();

    assert_eq!(seg.file_id(), 123);
    assert_eq!(seg.write_offset(), 0);
    assert!(data_path(dir.path(), 123).exists());
    assert!(idx_path(dir.path(), 123).exists());
}

#[test]
fn append_returns_entry_pointing_at_the_value() {
    let dir = tempdir().unwrap();
    let mut seg = ActiveSegment::open(dir.path(), 1, false).unwrap();

    let entry = seg.append(b"key", b"value").unwrap();
    assert_eq!(entry.file_id, 1);
    assert_eq!(entry.value_size, 5);
    assert_eq!(entry.value_offset, (record::DATA_HEADER_LEN + 3) as u64);

    let reader = SegmentReader::open(dir.path(), 1).unwrap();
    assert_eq!(reader.read_at(entry.value_offset, 5).unwrap(), b"value");
}

#[test]
fn appends_advance_by_full_record_lengths() {
    let dir = tempdir().unwrap();
    let mut seg = ActiveSegment::open(dir.path(), 1, false).unwrap();

    seg.append(b"aa", b"bbb").unwrap();
    assert_eq!(seg.write_offset(), (record::DATA_HEADER_LEN + 2 + 3) as u64);

    let second = seg.append(b"c", b"dd").unwrap();
    assert_eq!(
        second.value_offset,
        (record::DATA_HEADER_LEN + 2 + 3 + record::DATA_HEADER_LEN + 1) as u64
    );
}

#[test]
fn tombstone_advances_past_header_and_key() {
    let dir = tempdir().unwrap();
    let mut seg = ActiveSegment::open(dir.path(), 1, false).unwrap();

    seg.append_tombstone(b"key").unwrap();
    assert_eq!(seg.write_offset(), (record::DATA_HEADER_LEN + 3) as u64);

    let data = fs::read(data_path(dir.path(), 1)).unwrap();
    let header = record::decode_header(&data).unwrap();
    assert_eq!(header.key_size, 0);
    assert_eq!(header.value_size, 0);
    assert_eq!(&data[record::DATA_HEADER_LEN..], b"key");
}

#[test]
fn sidecar_mirrors_every_append() {
    let dir = tempdir().unwrap();
    let mut seg = ActiveSegment::open(dir.path(), 1, false).unwrap();

    let entry = seg.append(b"k", b"v").unwrap();
    seg.append_tombstone(b"k").unwrap();

    let idx = fs::read(idx_path(dir.path(), 1)).unwrap();

    let put = record::decode_idx_header(&idx).unwrap();
    assert!(!put.is_tombstone());
    assert_eq!(put.value_offset, entry.value_offset);
    assert_eq!(put.value_size, 1);
    assert_eq!(&idx[record::IDX_HEADER_LEN..record::IDX_HEADER_LEN + 1], b"k");

    let tomb_at = record::IDX_HEADER_LEN + 1;
    let tomb = record::decode_idx_header(&idx[tomb_at..]).unwrap();
    assert!(tomb.is_tombstone());
    assert_eq!(
        tomb.value_offset,
        entry.value_offset + 1 + record::DATA_HEADER_LEN as u64
    );
}

#[test]
fn reopen_resumes_at_end_of_file() {
    let dir = tempdir().unwrap();
    {
        let mut seg = ActiveSegment::open(dir.path(), 1, false).unwrap();
        seg.append(b"key", b"value").unwrap();
    }

    let mut seg = ActiveSegment::open(dir.path(), 1, false).unwrap();
    assert_eq!(seg.write_offset(), (record::DATA_HEADER_LEN + 3 + 5) as u64);

    let entry = seg.append(b"key", b"later").unwrap();
    let reader = SegmentReader::open(dir.path(), 1).unwrap();
    assert_eq!(reader.read_at(entry.value_offset, 5).unwrap(), b"later");
}

#[test]
fn sync_on_write_appends_are_readable() {
    let dir = tempdir().unwrap();
    let mut seg = ActiveSegment::open(dir.path(), 1, true).unwrap();
    let entry = seg.append(b"k", b"v").unwrap();

    let reader = SegmentReader::open(dir.path(), 1).unwrap();
    assert_eq!(reader.read_at(entry.value_offset, 1).unwrap(), b"v");
}

// -------------------- SegmentReader --------------------

#[test]
fn read_past_end_is_an_error() {
    let dir = tempdir().unwrap();
    let mut seg = ActiveSegment::open(dir.path(), 1, false).unwrap();
    seg.append(b"k", b"v").unwrap();

    let reader = SegmentReader::open(dir.path(), 1).unwrap();
    assert!(reader.read_at(1_000, 4).is_err());
}

// -------------------- SegmentRegistry --------------------

#[test]
fn registry_opens_lazily_and_caches() {
    let dir = tempdir().unwrap();
    let mut seg = ActiveSegment::open(dir.path(), 7, false).unwrap();
    let entry = seg.append(b"k", b"v").unwrap();

    let registry = SegmentRegistry::new(dir.path().to_path_buf());
    assert!(registry.is_empty());

    let first = registry.get_or_open(7).unwrap();
    let second = registry.get_or_open(7).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len(), 1);

    assert_eq!(first.read_at(entry.value_offset, 1).unwrap(), b"v");
}

#[test]
fn registry_surfaces_missing_segments() {
    let dir = tempdir().unwrap();
    let registry = SegmentRegistry::new(dir.path().to_path_buf());
    let err = registry.get_or_open(42).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}

#[test]
fn clear_drops_cached_handles() {
    let dir = tempdir().unwrap();
    ActiveSegment::open(dir.path(), 7, false).unwrap();

    let registry = SegmentRegistry::new(dir.path().to_path_buf());
    registry.get_or_open(7).unwrap();
    assert_eq!(registry.len(), 1);

    registry.clear();
    assert!(registry.is_empty());
}
