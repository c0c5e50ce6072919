//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{EngineError, Result};

pub const DEFAULT_MAX_FILE_SIZE: u64 = 1 << 31;
pub const DEFAULT_VALUE_MAX_SIZE: u64 = 1 << 20;
pub const DEFAULT_OPEN_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MERGE_SECS: u64 = 60;

/// Configuration for one engine instance.
///
/// Field names serialize in kebab-case (`max-file-size`, ...), so a config
/// file deserialized by the embedding process maps straight onto this
/// struct. Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Storage directory; every segment pair and the lock file live here.
    pub dir: PathBuf,

    /// Rollover threshold: once the active data file grows past this many
    /// bytes, the next mutation opens a new segment.
    pub max_file_size: u64,

    /// Per-value size cap enforced on put.
    pub value_max_size: u64,

    /// Maximum time to wait for the directory lock at open.
    pub open_timeout_secs: u64,

    /// Interval hint for a background compactor. Accepted but not acted
    /// on; no compactor ships with the engine.
    pub merge_secs: u64,

    /// Verify the record CRC on every read instead of only at recovery.
    pub checksum_crc32: bool,

    /// When false the engine opens without a writer and refuses mutations.
    pub read_write: bool,

    /// Reserved; expiry is not enforced.
    pub expiry_secs: u64,

    /// Fsync both segment files after every append.
    pub sync_on_write: bool,

    /// Fsync the active pair at close and when a segment is retired.
    pub sync_on_close: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: PathBuf::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            value_max_size: DEFAULT_VALUE_MAX_SIZE,
            open_timeout_secs: DEFAULT_OPEN_TIMEOUT_SECS,
            merge_secs: DEFAULT_MERGE_SECS,
            checksum_crc32: false,
            read_write: true,
            expiry_secs: 0,
            sync_on_write: false,
            sync_on_close: true,
        }
    }
}

impl Config {
    /// Default configuration rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Checks the configuration before the engine acts on it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] naming the offending option.
    pub fn validate(&self) -> Result<()> {
        if self.dir.as_os_str().is_empty() {
            return Err(EngineError::Config("dir must not be empty".into()));
        }
        if self.max_file_size == 0 {
            return Err(EngineError::Config("max-file-size must be positive".into()));
        }
        if self.value_max_size == 0 {
            return Err(EngineError::Config(
                "value-max-size must be positive".into(),
            ));
        }
        Ok(())
    }
}
