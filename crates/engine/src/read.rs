//! Read path: `get()`.
//!
//! Reads never take the write lock. The key index resolves the location,
//! the registry supplies a read-only handle (for the active segment as
//! much as for immutable ones), and a single positional read returns the
//! value. With `checksum-crc32` set, the whole record is fetched and
//! verified instead of trusting the acknowledged bytes.

use crate::error::{EngineError, Result};
use crate::Engine;

impl Engine {
    /// Looks up the latest value for `key`.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] when the key is absent,
    /// [`EngineError::Checksum`] when CRC verification is enabled and
    /// fails, or any I/O error from the segment read.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let entry = self.keydir.get(key).ok_or(EngineError::NotFound)?;
        let reader = self.registry.get_or_open(entry.file_id)?;

        if !self.config.checksum_crc32 {
            return Ok(reader.read_at(entry.value_offset, entry.value_size as usize)?);
        }

        let prefix = record::DATA_HEADER_LEN + key.len();
        let record_offset = entry.value_offset.checked_sub(prefix as u64).ok_or_else(|| {
            EngineError::CorruptSegment(format!(
                "index entry points inside a record header in {}.{}",
                entry.file_id,
                segment::DATA_EXT
            ))
        })?;
        let buf = reader.read_at(record_offset, prefix + entry.value_size as usize)?;
        let value = record::decode_value(&buf)?;
        if &buf[record::DATA_HEADER_LEN..prefix] != key {
            return Err(EngineError::CorruptSegment(format!(
                "record at offset {record_offset} in {}.{} holds a different key",
                entry.file_id,
                segment::DATA_EXT
            )));
        }
        Ok(value)
    }
}
