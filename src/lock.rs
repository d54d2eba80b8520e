//! Single-instance lock for a station's data directory.
//!
//! The lock file is opened without truncation and only rewritten once the
//! exclusive lock is held, so a second instance that fails to lock never wipes
//! the PID written by the first.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

/// Try to become the only running instance.
///
/// # Returns
/// - `Ok(Some(file))` holding the lock; dropping the file releases it
/// - `Ok(None)` if another process already holds the lock
/// - `Err` if the lock file cannot be opened or written
pub fn acquire_instance_lock(path: &Path) -> Result<Option<File>> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open lock file {}", path.display()))?;

    if file.try_lock_exclusive().is_err() {
        return Ok(None);
    }

    // Safe to rewrite now that we own the lock
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()?;

    Ok(Some(file))
}

/// PID recorded in an existing lock file, if it can be read.
pub fn read_lock_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()?
        .lines()
        .next()?
        .trim()
        .parse()
        .ok()
}
