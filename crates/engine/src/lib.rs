//! # Engine — MouseDB storage engine
//!
//! The central orchestrator that ties the [`record`], [`keydir`], and
//! [`segment`] crates into an embedded append-only key-value store in the
//! Bitcask family.
//!
//! ## Architecture
//!
//! ```text
//! Caller
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → data append → idx append → KeyDir  │
//! │              |                                │
//! │              |  (max-file-size exceeded?)     │
//! │              |            yes                 │
//! │              v                                │
//! │        roll over → new <now>.bsm/.idx pair    │
//! │                                               │
//! │ read.rs  → KeyDir → SegmentRegistry → pread   │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module       | Purpose                                              |
//! |--------------|------------------------------------------------------|
//! | [`lib.rs`]   | `Engine` struct, open/close lifecycle, `Debug`       |
//! | [`config`]   | options, defaults, validation                        |
//! | [`lock`]     | `mousedb.lock` directory lock with pid stamp         |
//! | [`recovery`] | sidecar replay, tombstone resolution, pruning        |
//! | [`write`]    | `put()`, `delete()`, rollover                        |
//! | [`read`]     | `get()`                                              |
//!
//! ## Crash Safety
//!
//! Every mutation appends the data record **before** the sidecar entry,
//! and updates the in-memory index only after both. A crash mid-append
//! leaves bytes no sidecar references; recovery rebuilds the index from
//! sidecars alone and discards entries pointing past a data file's end.
//!
//! ## Concurrency
//!
//! One write lock serializes `put`/`delete` for the whole
//! append-and-index sequence. `get` never takes it: the key index and the
//! segment registry carry their own reader-writer locks, and every read,
//! active segment included, goes through a read-only registry handle.
//! Writes are linearizable per key; nothing is promised across keys.

mod config;
mod error;
mod lock;
mod read;
mod recovery;
mod write;

pub use config::Config;
pub use error::{EngineError, Result};
pub use keydir::KeyEntry;
pub use lock::LOCK_FILE;

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use keydir::KeyDir;
use lock::DirLock;
use parking_lot::RwLock;
use segment::{ActiveSegment, SegmentRegistry};
use tracing::info;

/// An open storage directory.
///
/// One instance owns its directory exclusively (via `mousedb.lock`) from
/// [`open`](Engine::open) until [`close`](Engine::close) or drop. The
/// instance is `Sync`: many threads may call [`get`](Engine::get) while
/// one at a time runs [`put`](Engine::put) or [`delete`](Engine::delete).
pub struct Engine {
    config: Config,
    dir: PathBuf,
    keydir: KeyDir,
    registry: SegmentRegistry,
    active: RwLock<Option<ActiveSegment>>,
    lock: DirLock,
    started_at: SystemTime,
}

impl Engine {
    /// Opens the directory named by `config`, creating it if missing.
    ///
    /// Acquires the directory lock, replays every index sidecar to rebuild
    /// the key index, and opens the newest segment for appends (none is
    /// opened when `read-write` is off; a fresh pair is created when the
    /// directory holds no segments).
    ///
    /// # Errors
    ///
    /// [`EngineError::Config`] from validation, [`EngineError::Lock`] when
    /// another instance holds the directory, [`EngineError::CorruptSegment`]
    /// from replay, or any underlying I/O error. On failure the lock is
    /// released and no handles stay open.
    pub fn open(config: Config) -> Result<Engine> {
        config.validate()?;
        let dir = config.dir.clone();
        fs::create_dir_all(&dir)?;

        let lock = DirLock::acquire(&dir, Duration::from_secs(config.open_timeout_secs))?;

        let keydir = KeyDir::new();
        let newest = recovery::bootstrap(&dir, &keydir)?;

        let active = if config.read_write {
            let file_id = match newest {
                Some(id) => id,
                None => segment::unix_seconds()?,
            };
            Some(ActiveSegment::open(&dir, file_id, config.sync_on_write)?)
        } else {
            None
        };

        let active_id = active.as_ref().map(ActiveSegment::file_id).unwrap_or(0);
        lock.stamp(active_id)?;

        info!(
            dir = %dir.display(),
            active = active_id,
            keys = keydir.len(),
            read_write = config.read_write,
            "storage opened"
        );

        Ok(Engine {
            registry: SegmentRegistry::new(dir.clone()),
            keydir,
            active: RwLock::new(active),
            lock,
            started_at: SystemTime::now(),
            dir,
            config,
        })
    }

    /// Flushes the active segment, drops every open handle, and deletes
    /// the lock file.
    ///
    /// Dropping an engine without calling `close` still removes the lock
    /// file, but skips the final fsync and reports no errors.
    pub fn close(self) -> Result<()> {
        if self.config.sync_on_close {
            if let Some(seg) = self.active.write().as_mut() {
                seg.sync()?;
            }
        }
        self.registry.clear();

        let uptime = self.started_at.elapsed().unwrap_or_default();
        info!(uptime_secs = uptime.as_secs(), "storage closed");

        self.lock.release()
    }

    /// Number of live keys in the index.
    pub fn key_count(&self) -> usize {
        self.keydir.len()
    }

    /// Id of the segment currently receiving appends, if any.
    pub fn active_file_id(&self) -> Option<u32> {
        self.active.read().as_ref().map(ActiveSegment::file_id)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("dir", &self.dir)
            .field("keys", &self.keydir.len())
            .field("active", &self.active_file_id())
            .field("segments_cached", &self.registry.len())
            .field("read_write", &self.config.read_write)
            .finish()
    }
}

#[cfg(test)]
mod tests;
