//! # Segment — append-only data files and their read handles
//!
//! A segment is a pair of files sharing a numeric id: `<file_id>.bsm`
//! (data records) and `<file_id>.idx` (index sidecar). The id is the
//! Unix-epoch second at which the pair was created, so ids grow
//! monotonically across a directory's lifetime.
//!
//! Exactly one segment, the [`ActiveSegment`], receives appends. Every
//! other segment is immutable and is read through a [`SegmentReader`]
//! obtained from the [`SegmentRegistry`], which opens data files lazily on
//! first request and caches the handles.

mod reader;
mod registry;
mod writer;

pub use reader::SegmentReader;
pub use registry::SegmentRegistry;
pub use writer::ActiveSegment;

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Extension of the data file.
pub const DATA_EXT: &str = "bsm";

/// Extension of the index sidecar.
pub const IDX_EXT: &str = "idx";

/// Errors produced by segment I/O.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("system clock is before the unix epoch")]
    Clock(#[from] std::time::SystemTimeError),
}

/// Path of a segment's data file within `dir`.
pub fn data_path(dir: &Path, file_id: u32) -> PathBuf {
    dir.join(format!("{file_id}.{DATA_EXT}"))
}

/// Path of a segment's index sidecar within `dir`.
pub fn idx_path(dir: &Path, file_id: u32) -> PathBuf {
    dir.join(format!("{file_id}.{IDX_EXT}"))
}

/// Current wall-clock time as Unix seconds, the unit used for both record
/// timestamps and segment file ids.
pub fn unix_seconds() -> Result<u32, SegmentError> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(elapsed.as_secs() as u32)
}

#[cfg(test)]
mod tests;
