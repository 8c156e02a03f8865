//! File-based locking so only one rotator works on a backups root

use anyhow::{Context, Result};
use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const LOCK_FILE_NAME: &str = ".mongo-drive-rotator.lock";

/// Exclusive lock on a backups root, held until dropped
pub struct InstanceLock {
    // Closing the file releases the OS lock
    _lock: RwLock<File>,
    lock_path: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock for `backups_root`, creating the directory if needed.
    /// Fails immediately if another process holds it.
    pub fn acquire(backups_root: &Path) -> Result<Self> {
        std::fs::create_dir_all(backups_root)
            .with_context(|| format!("Failed to create backups root {:?}", backups_root))?;

        let lock_path = backups_root.join(LOCK_FILE_NAME);
        debug!("Attempting to acquire lock: {:?}", lock_path);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {:?}", lock_path))?;

        let mut lock = RwLock::new(file);
        let guard = lock.try_write().with_context(|| {
            format!(
                "Another rotator is already running on {:?} (lock held)",
                backups_root
            )
        })?;
        // Keep the lock held until the file is closed on drop
        std::mem::forget(guard);

        info!("Acquired instance lock: {:?}", lock_path);

        Ok(Self {
            _lock: lock,
            lock_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        debug!("Released instance lock: {:?}", self.lock_path);
    }
}
