//! Write path: `put()`, `delete()`, and segment rollover.
//!
//! All mutations run under the engine's write lock. Each one appends to
//! the active data file, then to its index sidecar, and only then touches
//! the in-memory index; an append that fails part-way is invisible to
//! both the index and any future recovery.

use segment::ActiveSegment;
use tracing::info;

use crate::error::{EngineError, Result};
use crate::Engine;

impl Engine {
    /// Inserts or replaces a key.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotWritable`] on a read-only engine,
    /// [`EngineError::EmptyKey`] for a zero-length key,
    /// [`EngineError::ValueTooLarge`] above `value-max-size`, or any I/O
    /// error from the append. A failed append leaves the index untouched.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.check_writable()?;
        if key.is_empty() {
            return Err(EngineError::EmptyKey);
        }
        if value.len() as u64 > self.config.value_max_size {
            return Err(EngineError::ValueTooLarge {
                size: value.len() as u64,
                max: self.config.value_max_size,
            });
        }

        let mut active = self.active.write();
        self.roll_if_needed(&mut active)?;
        let seg = active.as_mut().ok_or(EngineError::NotWritable)?;
        let entry = seg.append(&key, &value)?;
        self.keydir.put(key, entry);
        Ok(())
    }

    /// Deletes a key by appending a tombstone record.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] when the key is absent; otherwise as
    /// [`put`](Engine::put).
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.check_writable()?;
        if key.is_empty() {
            return Err(EngineError::EmptyKey);
        }

        let mut active = self.active.write();
        if self.keydir.get(key).is_none() {
            return Err(EngineError::NotFound);
        }
        self.roll_if_needed(&mut active)?;
        let seg = active.as_mut().ok_or(EngineError::NotWritable)?;
        seg.append_tombstone(key)?;
        self.keydir.delete(key);
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        if self.config.read_write {
            Ok(())
        } else {
            Err(EngineError::NotWritable)
        }
    }

    /// Retires the active segment once it has grown past `max-file-size`.
    ///
    /// The new pair takes the current Unix second as its id; if the active
    /// segment was created this very second the rollover waits for a later
    /// mutation, so no two segments ever share an id.
    fn roll_if_needed(&self, active: &mut Option<ActiveSegment>) -> Result<()> {
        let (write_offset, file_id) = match active.as_ref() {
            Some(seg) => (seg.write_offset(), seg.file_id()),
            None => return Ok(()),
        };
        if write_offset <= self.config.max_file_size {
            return Ok(());
        }
        let now = segment::unix_seconds()?;
        if file_id == now {
            return Ok(());
        }

        info!(retired = file_id, new = now, write_offset, "rolling over to a new segment");

        if let Some(mut old) = active.take() {
            if self.config.sync_on_close {
                old.sync()?;
            }
        }
        *active = Some(ActiveSegment::open(
            &self.dir,
            now,
            self.config.sync_on_write,
        )?);
        self.lock.stamp(now)?;
        Ok(())
    }
}
