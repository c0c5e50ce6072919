//! Read-only access to a segment's data file.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use parking_lot::Mutex;

use crate::data_path;

/// A persistent read-only handle on one segment's data file.
///
/// The handle is wrapped in a `Mutex` so positional reads can go through a
/// shared reference; reads on different segments never contend.
#[derive(Debug)]
pub struct SegmentReader {
    file_id: u32,
    file: Mutex<File>,
}

impl SegmentReader {
    /// Opens the data file for `file_id` read-only.
    pub fn open(dir: &Path, file_id: u32) -> io::Result<Self> {
        let file = File::open(data_path(dir, file_id))?;
        Ok(Self {
            file_id,
            file: Mutex::new(file),
        })
    }

    pub fn file_id(&self) -> u32 {
        self.file_id
    }

    /// Reads exactly `len` bytes starting at `offset`.
    pub fn read_at(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}
