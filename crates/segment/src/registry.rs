//! Lazily-opened cache of segment read handles.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::SegmentReader;

/// Maps file ids to cached read handles.
///
/// Handles are opened on first request and kept for the registry's
/// lifetime; the cache is unbounded. The first reader of a cold segment
/// pays the open inside the write lock, blocking other lookups for that
/// moment only.
#[derive(Debug)]
pub struct SegmentRegistry {
    dir: PathBuf,
    readers: RwLock<HashMap<u32, Arc<SegmentReader>>>,
}

impl SegmentRegistry {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            readers: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached handle for `file_id`, opening it if needed.
    pub fn get_or_open(&self, file_id: u32) -> io::Result<Arc<SegmentReader>> {
        if let Some(reader) = self.readers.read().get(&file_id) {
            return Ok(reader.clone());
        }

        let mut readers = self.readers.write();
        if let Some(reader) = readers.get(&file_id) {
            return Ok(reader.clone());
        }
        let reader = Arc::new(SegmentReader::open(&self.dir, file_id)?);
        readers.insert(file_id, reader.clone());
        Ok(reader)
    }

    /// Drops every cached handle.
    pub fn clear(&self) {
        self.readers.write().clear();
    }

    pub fn len(&self) -> usize {
        self.readers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.read().is_empty()
    }
}
