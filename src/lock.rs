//! Writer lock and atomic file replacement for the data directory.
//!
//! `ql` processes serialize mutations of `store.json` through an exclusive
//! `fs2` lock on `store.lock`. Files are replaced by persisting a synced
//! temp file from the same directory over the target.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

/// How long a writer waits for the store lock before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive hold on the store lock, released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
}

impl StoreLock {
    /// Wait until the lock at `path` is ours or `timeout` passes.
    ///
    /// Missing parent directories and the lock file itself are created.
    pub fn acquire(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let deadline = Instant::now() + timeout;
        let mut waits = 0u32;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(err) if held_elsewhere(&err) => {
                    if Instant::now() >= deadline {
                        return Err(Error::LockFailed(path.to_path_buf()));
                    }
                    waits += 1;
                    thread::sleep(POLL_INTERVAL);
                }
                Err(err) => return Err(err.into()),
            }
        }
        if waits > 0 {
            debug!(path = %path.display(), waits, "store lock acquired after waiting");
        }
        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn held_elsewhere(err: &io::Error) -> bool {
    // Windows reports a held lock as a lock violation (33) instead.
    err.kind() == io::ErrorKind::WouldBlock || (cfg!(windows) && err.raw_os_error() == Some(33))
}

/// Replace `path` with `data` in one rename.
///
/// No locking happens here; writers coordinate through [`StoreLock`].
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| Error::Io(err.error))?;
    Ok(())
}
