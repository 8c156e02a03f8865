//! Local backup directory layout: `<root>/<db>/backups/<bucket>/`

use crate::config::Bucket;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the folder holding the bucket folders, locally and remotely
pub const BACKUPS_DIR: &str = "backups";

#[derive(Debug, Clone)]
pub struct LocalLayout {
    root: PathBuf,
}

impl LocalLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database_dir(&self, database: &str) -> PathBuf {
        self.root.join(database)
    }

    pub fn bucket_dir(&self, database: &str, bucket: Bucket) -> PathBuf {
        self.database_dir(database)
            .join(BACKUPS_DIR)
            .join(bucket.as_str())
    }

    /// Create the three bucket directories for a database. Existing
    /// directories and their contents are left alone.
    pub fn ensure(&self, database: &str) -> Result<()> {
        for bucket in Bucket::ALL {
            let dir = self.bucket_dir(database, bucket);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create backup directory {:?}", dir))?;
        }
        debug!("Local layout ready for database '{}'", database);
        Ok(())
    }

    /// Files currently in a bucket directory, sorted by name.
    /// A missing directory yields an empty list.
    pub fn list_artifacts(&self, database: &str, bucket: Bucket) -> Result<Vec<PathBuf>> {
        let dir = self.bucket_dir(database, bucket);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&dir)
            .with_context(|| format!("Failed to read backup directory {:?}", dir))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        Ok(files)
    }
}
