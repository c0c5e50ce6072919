//! The single writable segment.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use keydir::KeyEntry;

use crate::{data_path, idx_path, unix_seconds, SegmentError};

/// The segment pair currently receiving appends.
///
/// Appends are positional writes at the tracked offsets, so a failed write
/// leaves the tracked state unchanged and the next append lands at the same
/// position. Each mutation writes the data record first, then the sidecar
/// entry; the offsets advance only after both succeed, which keeps a
/// half-written mutation invisible to the sidecar.
#[derive(Debug)]
pub struct ActiveSegment {
    data: File,
    idx: File,
    file_id: u32,
    write_offset: u64,
    idx_offset: u64,
    sync_on_write: bool,
}

impl ActiveSegment {
    /// Opens (or creates) the segment pair for `file_id`, resuming appends
    /// at the current end of each file.
    pub fn open(dir: &Path, file_id: u32, sync_on_write: bool) -> Result<Self, SegmentError> {
        let data = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(data_path(dir, file_id))?;
        let idx = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(idx_path(dir, file_id))?;

        let write_offset = data.metadata()?.len();
        let idx_offset = idx.metadata()?.len();

        Ok(Self {
            data,
            idx,
            file_id,
            write_offset,
            idx_offset,
            sync_on_write,
        })
    }

    pub fn file_id(&self) -> u32 {
        self.file_id
    }

    /// Next free byte in the data file.
    pub fn write_offset(&self) -> u64 {
        self.write_offset
    }

    /// Appends a put to both files and returns where the value landed.
    pub fn append(&mut self, key: &[u8], value: &[u8]) -> Result<KeyEntry, SegmentError> {
        let timestamp = unix_seconds()?;
        let value_offset = self.write_offset + (record::DATA_HEADER_LEN + key.len()) as u64;

        let data_rec = record::encode_put(timestamp, key, value);
        let idx_rec = record::encode_idx_put(timestamp, key, value.len() as u32, value_offset);
        self.write_pair(&data_rec, &idx_rec)?;

        Ok(KeyEntry {
            file_id: self.file_id,
            value_size: value.len() as u32,
            value_offset,
            timestamp,
        })
    }

    /// Appends a deletion to both files.
    pub fn append_tombstone(&mut self, key: &[u8]) -> Result<(), SegmentError> {
        let timestamp = unix_seconds()?;
        let value_offset = self.write_offset + record::DATA_HEADER_LEN as u64;

        let data_rec = record::encode_tombstone(timestamp, key);
        let idx_rec = record::encode_idx_tombstone(timestamp, key, value_offset);
        self.write_pair(&data_rec, &idx_rec)
    }

    fn write_pair(&mut self, data_rec: &[u8], idx_rec: &[u8]) -> Result<(), SegmentError> {
        self.data.seek(SeekFrom::Start(self.write_offset))?;
        self.data.write_all(data_rec)?;

        self.idx.seek(SeekFrom::Start(self.idx_offset))?;
        self.idx.write_all(idx_rec)?;

        self.write_offset += data_rec.len() as u64;
        self.idx_offset += idx_rec.len() as u64;

        if self.sync_on_write {
            self.sync()?;
        }
        Ok(())
    }

    /// Forces both files to disk.
    pub fn sync(&mut self) -> Result<(), SegmentError> {
        self.data.sync_all()?;
        self.idx.sync_all()?;
        Ok(())
    }
}
