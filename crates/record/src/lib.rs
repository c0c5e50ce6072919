//! # Record — on-disk record codec
//!
//! Byte layouts for the two append-only files that make up a segment pair:
//! the data file (`.bsm`) and its index sidecar (`.idx`). All integers are
//! little-endian, packed, no padding.
//!
//! ## Data record
//!
//! ```text
//! [crc32: u32][timestamp: u32][key_size: u32][value_size: u32][key][value]
//! ```
//!
//! The CRC-32/IEEE checksum covers every byte after the checksum itself
//! (timestamp through the end of the value).
//!
//! ## Index record
//!
//! ```text
//! [timestamp: u32][key_size: u32][value_size: u32][value_offset: u64][key]
//! ```
//!
//! `value_offset` is the position of the value bytes within the data file,
//! i.e. just past the 16-byte data header plus the key. Index records carry
//! no CRC: the sidecar is rebuildable from the data file and is only checked
//! structurally.
//!
//! ## Deletions
//!
//! A deletion writes both size fields as zero. The data record appends the
//! deleted key's bytes after the header (the CRC covers them). The sidecar
//! entry appends an explicit `u32` key length followed by the key, because a
//! zero `key_size` cannot describe the bytes that replay needs in order to
//! drop the key from the in-memory index.

use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher as Crc32;
use thiserror::Error;

/// Size of the fixed data-record header: crc + timestamp + key_size + value_size.
pub const DATA_HEADER_LEN: usize = 16;

/// Size of the fixed index-record header: timestamp + key_size + value_size + value_offset.
pub const IDX_HEADER_LEN: usize = 20;

/// Errors produced while decoding records.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The record's CRC-32/IEEE checksum does not match its contents.
    #[error("record checksum mismatch")]
    Checksum,

    /// The buffer is shorter than the record it claims to hold.
    #[error("record truncated: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
}

/// Decoded fixed-size header of a data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    pub crc: u32,
    pub timestamp: u32,
    pub key_size: u32,
    pub value_size: u32,
}

/// Decoded fixed-size header of an index record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdxHeader {
    pub timestamp: u32,
    pub key_size: u32,
    pub value_size: u32,
    pub value_offset: u64,
}

impl IdxHeader {
    /// Both sizes zero marks a deletion entry.
    pub fn is_tombstone(&self) -> bool {
        self.key_size == 0 && self.value_size == 0
    }
}

fn checksum(bytes: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Encodes a put as a complete data record, checksum included.
pub fn encode_put(timestamp: u32, key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; DATA_HEADER_LEN + key.len() + value.len()];
    LittleEndian::write_u32(&mut buf[4..8], timestamp);
    LittleEndian::write_u32(&mut buf[8..12], key.len() as u32);
    LittleEndian::write_u32(&mut buf[12..16], value.len() as u32);
    buf[DATA_HEADER_LEN..DATA_HEADER_LEN + key.len()].copy_from_slice(key);
    buf[DATA_HEADER_LEN + key.len()..].copy_from_slice(value);
    let crc = checksum(&buf[4..]);
    LittleEndian::write_u32(&mut buf[..4], crc);
    buf
}

/// Encodes a deletion as a data record: zero sizes, key bytes after the header.
pub fn encode_tombstone(timestamp: u32, key: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; DATA_HEADER_LEN + key.len()];
    LittleEndian::write_u32(&mut buf[4..8], timestamp);
    buf[DATA_HEADER_LEN..].copy_from_slice(key);
    let crc = checksum(&buf[4..]);
    LittleEndian::write_u32(&mut buf[..4], crc);
    buf
}

/// Verifies a complete data record and extracts its value.
///
/// # Errors
///
/// Returns [`RecordError::Checksum`] on CRC mismatch, or
/// [`RecordError::Truncated`] when the buffer does not span the record
/// described by its own header.
pub fn decode_value(buf: &[u8]) -> Result<Vec<u8>, RecordError> {
    if buf.len() < DATA_HEADER_LEN {
        return Err(RecordError::Truncated {
            need: DATA_HEADER_LEN,
            have: buf.len(),
        });
    }
    let crc = LittleEndian::read_u32(&buf[..4]);
    if checksum(&buf[4..]) != crc {
        return Err(RecordError::Checksum);
    }
    let key_size = LittleEndian::read_u32(&buf[8..12]) as usize;
    let value_size = LittleEndian::read_u32(&buf[12..16]) as usize;
    let need = DATA_HEADER_LEN + key_size + value_size;
    if buf.len() != need {
        return Err(RecordError::Truncated {
            need,
            have: buf.len(),
        });
    }
    Ok(buf[DATA_HEADER_LEN + key_size..].to_vec())
}

/// Decodes the fixed data-record header without touching key or value bytes.
pub fn decode_header(buf: &[u8]) -> Result<DataHeader, RecordError> {
    if buf.len() < DATA_HEADER_LEN {
        return Err(RecordError::Truncated {
            need: DATA_HEADER_LEN,
            have: buf.len(),
        });
    }
    Ok(DataHeader {
        crc: LittleEndian::read_u32(&buf[..4]),
        timestamp: LittleEndian::read_u32(&buf[4..8]),
        key_size: LittleEndian::read_u32(&buf[8..12]),
        value_size: LittleEndian::read_u32(&buf[12..16]),
    })
}

/// Encodes an index-sidecar entry for a put.
pub fn encode_idx_put(timestamp: u32, key: &[u8], value_size: u32, value_offset: u64) -> Vec<u8> {
    let mut buf = vec![0u8; IDX_HEADER_LEN + key.len()];
    LittleEndian::write_u32(&mut buf[..4], timestamp);
    LittleEndian::write_u32(&mut buf[4..8], key.len() as u32);
    LittleEndian::write_u32(&mut buf[8..12], value_size);
    LittleEndian::write_u64(&mut buf[12..IDX_HEADER_LEN], value_offset);
    buf[IDX_HEADER_LEN..].copy_from_slice(key);
    buf
}

/// Encodes an index-sidecar entry for a deletion.
///
/// Both size fields are zero; the key is appended with its own length
/// prefix so replay can remove it from the in-memory index.
pub fn encode_idx_tombstone(timestamp: u32, key: &[u8], value_offset: u64) -> Vec<u8> {
    let mut buf = vec![0u8; IDX_HEADER_LEN + 4 + key.len()];
    LittleEndian::write_u32(&mut buf[..4], timestamp);
    LittleEndian::write_u64(&mut buf[12..IDX_HEADER_LEN], value_offset);
    LittleEndian::write_u32(&mut buf[IDX_HEADER_LEN..IDX_HEADER_LEN + 4], key.len() as u32);
    buf[IDX_HEADER_LEN + 4..].copy_from_slice(key);
    buf
}

/// Decodes the fixed index-record header.
pub fn decode_idx_header(buf: &[u8]) -> Result<IdxHeader, RecordError> {
    if buf.len() < IDX_HEADER_LEN {
        return Err(RecordError::Truncated {
            need: IDX_HEADER_LEN,
            have: buf.len(),
        });
    }
    Ok(IdxHeader {
        timestamp: LittleEndian::read_u32(&buf[..4]),
        key_size: LittleEndian::read_u32(&buf[4..8]),
        value_size: LittleEndian::read_u32(&buf[8..12]),
        value_offset: LittleEndian::read_u64(&buf[12..IDX_HEADER_LEN]),
    })
}
