//! Cold-start recovery: rebuilding the key index from index sidecars.
//!
//! Recovery never opens data files for record contents: the sidecars are
//! the source of truth for which keys are live. Data files are only
//! stat'ed at the end so entries pointing past a file's end (a crashed
//! append, a truncated file) can be discarded instead of served.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

use keydir::{KeyDir, KeyEntry};
use record::IDX_HEADER_LEN;
use tracing::warn;

use crate::error::{EngineError, Result};

/// Upper bound on a replayed key length; anything larger is corruption,
/// not data.
const MAX_KEY_BYTES: usize = 64 * 1024 * 1024;

/// Replays every index sidecar under `dir` into `keydir` and returns the
/// largest file id seen, which becomes the active segment.
pub(crate) fn bootstrap(dir: &Path, keydir: &KeyDir) -> Result<Option<u32>> {
    let mut file_ids: Vec<u32> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|e| e == segment::IDX_EXT).unwrap_or(false))
        .filter_map(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u32>().ok())
        })
        .collect();
    file_ids.sort_unstable();

    // Sidecars are replayed in file-id order, but a deletion may still be
    // seen before an older put from another segment, so deletions are
    // collected and applied only once every sidecar has been read.
    let mut tombstones: HashMap<Vec<u8>, KeyEntry> = HashMap::new();
    for &file_id in &file_ids {
        replay_sidecar(dir, file_id, keydir, &mut tombstones)?;
    }

    for (key, tomb) in tombstones {
        if let Some(live) = keydir.get(&key) {
            if tomb.is_newer_than(&live) {
                keydir.delete(&key);
            }
        }
    }

    prune_dangling(dir, &file_ids, keydir)?;

    Ok(file_ids.last().copied())
}

/// Replays one sidecar. A truncated trailing record (a crash mid-append)
/// is treated as a clean end of file; every complete record before it
/// still counts.
fn replay_sidecar(
    dir: &Path,
    file_id: u32,
    keydir: &KeyDir,
    tombstones: &mut HashMap<Vec<u8>, KeyEntry>,
) -> Result<()> {
    let file = File::open(segment::idx_path(dir, file_id))?;
    let mut rdr = BufReader::new(file);
    let mut header = [0u8; IDX_HEADER_LEN];

    loop {
        if !read_or_eof(&mut rdr, &mut header)? {
            return Ok(());
        }
        let hdr = record::decode_idx_header(&header)?;

        if hdr.is_tombstone() {
            let mut len_buf = [0u8; 4];
            if !read_or_eof(&mut rdr, &mut len_buf)? {
                return Ok(());
            }
            let key_len = u32::from_le_bytes(len_buf) as usize;
            if key_len > MAX_KEY_BYTES {
                return Err(EngineError::CorruptSegment(format!(
                    "deletion entry in {file_id}.{} claims a {key_len} byte key",
                    segment::IDX_EXT
                )));
            }
            let mut key = vec![0u8; key_len];
            if !read_or_eof(&mut rdr, &mut key)? {
                return Ok(());
            }

            let tomb = KeyEntry {
                file_id,
                value_size: 0,
                value_offset: hdr.value_offset,
                timestamp: hdr.timestamp,
            };
            match tombstones.get(&key) {
                Some(newest) if !tomb.is_newer_than(newest) => {}
                _ => {
                    tombstones.insert(key, tomb);
                }
            }
        } else {
            let key_len = hdr.key_size as usize;
            if key_len > MAX_KEY_BYTES {
                return Err(EngineError::CorruptSegment(format!(
                    "entry in {file_id}.{} claims a {key_len} byte key",
                    segment::IDX_EXT
                )));
            }
            let mut key = vec![0u8; key_len];
            if !read_or_eof(&mut rdr, &mut key)? {
                return Ok(());
            }

            let entry = KeyEntry {
                file_id,
                value_size: hdr.value_size,
                value_offset: hdr.value_offset,
                timestamp: hdr.timestamp,
            };
            keydir.compare_and_put(key, entry);
        }
    }
}

/// Reads `buf` exactly, mapping end-of-file to `Ok(false)`.
fn read_or_eof(rdr: &mut impl Read, buf: &mut [u8]) -> Result<bool> {
    match rdr.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Discards index entries whose data file is missing or too short to hold
/// the value they point at, keeping the rest of the store available.
fn prune_dangling(dir: &Path, file_ids: &[u32], keydir: &KeyDir) -> Result<()> {
    let mut data_len: HashMap<u32, u64> = HashMap::new();
    for &file_id in file_ids {
        match fs::metadata(segment::data_path(dir, file_id)) {
            Ok(meta) => {
                data_len.insert(file_id, meta.len());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    let mut dropped = 0usize;
    keydir.retain(|_, entry| {
        let intact = data_len
            .get(&entry.file_id)
            .map(|len| entry.value_offset + u64::from(entry.value_size) <= *len)
            .unwrap_or(false);
        if !intact {
            dropped += 1;
        }
        intact
    });
    if dropped > 0 {
        warn!(dropped, "discarded index entries pointing past their data file");
    }
    Ok(())
}
