//! Presence-based directory lock.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{EngineError, Result};

/// Name of the lock file inside the storage directory.
pub const LOCK_FILE: &str = "mousedb.lock";

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Exclusive ownership of a storage directory.
///
/// The lock is the `mousedb.lock` file, created with `O_EXCL|O_CREAT`
/// semantics: whoever creates it owns the directory, and its presence
/// means an engine instance is (or died while) holding the directory
/// open. The file carries a human-readable `<pid>\t<file_id>.bsm` stamp
/// that recovery never parses.
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
    file: Option<File>,
}

impl DirLock {
    /// Tries to create the lock file, retrying until `timeout` elapses.
    ///
    /// # Errors
    ///
    /// [`EngineError::Lock`] when the file still exists at the deadline or
    /// cannot be created at all.
    pub fn acquire(dir: &Path, timeout: Duration) -> Result<DirLock> {
        let path = dir.join(LOCK_FILE);
        let deadline = Instant::now() + timeout;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    return Ok(DirLock {
                        path,
                        file: Some(file),
                    })
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(EngineError::Lock(format!(
                            "{} is held by another instance",
                            path.display()
                        )));
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => {
                    return Err(EngineError::Lock(format!(
                        "cannot create {}: {e}",
                        path.display()
                    )))
                }
            }
        }
    }

    /// Rewrites the `<pid>\t<file_id>.bsm` stamp at the start of the file.
    pub fn stamp(&self, file_id: u32) -> Result<()> {
        if let Some(file) = &self.file {
            let mut file = file;
            file.seek(SeekFrom::Start(0))?;
            let stamp = format!("{}\t{}.{}", std::process::id(), file_id, segment::DATA_EXT);
            file.write_all(stamp.as_bytes())?;
            file.flush()?;
        }
        Ok(())
    }

    /// Closes and deletes the lock file, surfacing the removal error.
    pub fn release(mut self) -> Result<()> {
        self.file.take();
        fs::remove_file(&self.path)?;
        Ok(())
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if self.file.take().is_some() {
            let _ = fs::remove_file(&self.path);
        }
    }
}
