//! Unified error type for engine operations.

use record::RecordError;
use segment::SegmentError;
use thiserror::Error;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The key is absent from the in-memory index.
    #[error("key not found")]
    NotFound,

    /// A data record failed CRC validation.
    #[error("record checksum mismatch")]
    Checksum,

    /// Structural damage found while reading a segment.
    #[error("corrupt segment: {0}")]
    CorruptSegment(String),

    /// The value exceeds the configured per-value cap.
    #[error("value too large: {size} bytes (max {max})")]
    ValueTooLarge { size: u64, max: u64 },

    /// Keys must be at least one byte; a zero-length key would collide
    /// with the deletion record encoding.
    #[error("key must not be empty")]
    EmptyKey,

    /// The directory lock could not be acquired or created.
    #[error("storage directory is locked: {0}")]
    Lock(String),

    /// A mutation was attempted on an engine opened read-only.
    #[error("engine is opened read-only")]
    NotWritable,

    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The system clock reports a time before the Unix epoch.
    #[error("system clock is before the unix epoch")]
    Clock,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RecordError> for EngineError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Checksum => EngineError::Checksum,
            truncated @ RecordError::Truncated { .. } => {
                EngineError::CorruptSegment(truncated.to_string())
            }
        }
    }
}

impl From<SegmentError> for EngineError {
    fn from(err: SegmentError) -> Self {
        match err {
            SegmentError::Io(e) => EngineError::Io(e),
            SegmentError::Clock(_) => EngineError::Clock,
        }
    }
}
