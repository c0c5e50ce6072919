//! In-memory index mapping every live key to the location of its latest
//! value on disk.
//!
//! The map offers single-key consistency under concurrent readers and a
//! serialized writer; multi-key atomicity is not offered. Replay merging
//! uses [`KeyEntry::is_newer_than`], the total order that decides which of
//! two entries for the same key survives recovery.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Location of a key's latest value: which segment, where in it, and when
/// the write was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEntry {
    /// Segment pair holding the value.
    pub file_id: u32,
    /// Length of the value in bytes.
    pub value_size: u32,
    /// Offset of the value bytes within the data file.
    pub value_offset: u64,
    /// Unix seconds when the write was accepted.
    pub timestamp: u32,
}

impl KeyEntry {
    /// Total order used to resolve conflicting entries for one key:
    /// lexicographic on `(timestamp, file_id, value_offset)`, strict.
    pub fn is_newer_than(&self, other: &KeyEntry) -> bool {
        (self.timestamp, self.file_id, self.value_offset)
            > (other.timestamp, other.file_id, other.value_offset)
    }
}

/// Concurrent key -> [`KeyEntry`] map.
#[derive(Debug, Default)]
pub struct KeyDir {
    entries: RwLock<HashMap<Vec<u8>, KeyEntry>>,
}

impl KeyDir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<KeyEntry> {
        self.entries.read().get(key).copied()
    }

    /// Inserts or replaces unconditionally. Live writes are already ordered
    /// by the engine's write lock.
    pub fn put(&self, key: Vec<u8>, entry: KeyEntry) {
        self.entries.write().insert(key, entry);
    }

    /// Removes a key, returning whether it was present.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Inserts `entry` only if the stored entry is strictly older (or the
    /// key is absent). Returns whether the map changed. Used when replaying
    /// segments that may each carry a version of the same key.
    pub fn compare_and_put(&self, key: Vec<u8>, entry: KeyEntry) -> bool {
        let mut entries = self.entries.write();
        match entries.get(&key) {
            Some(current) if !entry.is_newer_than(current) => false,
            _ => {
                entries.insert(key, entry);
                true
            }
        }
    }

    /// Rewrites `old` file ids to `new`, returning how many entries moved.
    /// Reserved for the compactor, which rewrites segments under new ids.
    pub fn remap_file_id(&self, old: u32, new: u32) -> usize {
        let mut entries = self.entries.write();
        let mut moved = 0;
        for entry in entries.values_mut() {
            if entry.file_id == old {
                entry.file_id = new;
                moved += 1;
            }
        }
        moved
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain(&self, mut keep: impl FnMut(&[u8], &KeyEntry) -> bool) {
        self.entries.write().retain(|key, entry| keep(key, entry));
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
