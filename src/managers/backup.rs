//! Backup manager - runs one bucket backup for one database

use crate::config::Bucket;
use crate::managers::context::BackupContext;
use crate::managers::retention::{PruneReport, RetentionManager};
use crate::managers::scheduler::JobRunner;
use crate::utils::naming::artifact_name;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDateTime};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

/// What a single backup run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub database: String,
    pub bucket: Bucket,
    /// Local artifacts written, in collection order
    pub artifacts: Vec<PathBuf>,
    pub uploaded: usize,
    pub upload_failures: usize,
    pub skipped_empty: Vec<String>,
    pub missing_collections: Vec<String>,
    pub fetch_failures: Vec<String>,
    /// Prune that ran before the backup (week and month buckets)
    pub prune: Option<PruneReport>,
    /// Month run skipped because today is not the 1st
    pub gated: bool,
}

impl BackupReport {
    fn new(database: &str, bucket: Bucket) -> Self {
        Self {
            database: database.to_string(),
            bucket,
            artifacts: Vec::new(),
            uploaded: 0,
            upload_failures: 0,
            skipped_empty: Vec::new(),
            missing_collections: Vec::new(),
            fetch_failures: Vec::new(),
            prune: None,
            gated: false,
        }
    }

    pub fn summary(&self) -> String {
        if self.gated {
            return format!("{}/{}: skipped (not the 1st of the month)", self.database, self.bucket);
        }
        format!(
            "{}/{}: {} written, {} uploaded, {} upload failures, {} empty, {} missing",
            self.database,
            self.bucket,
            self.artifacts.len(),
            self.uploaded,
            self.upload_failures,
            self.skipped_empty.len(),
            self.missing_collections.len()
        )
    }
}

pub struct BackupManager {
    ctx: BackupContext,
}

impl BackupManager {
    pub fn new(ctx: BackupContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &BackupContext {
        &self.ctx
    }

    /// Run a scheduled backup. Month runs only act on the 1st.
    pub fn run_backup(&self, database: &str, bucket: Bucket, now: NaiveDateTime) -> Result<BackupReport> {
        self.execute(database, bucket, now, false)
    }

    /// Run a backup ignoring the month gate
    pub fn run_backup_forced(&self, database: &str, bucket: Bucket, now: NaiveDateTime) -> Result<BackupReport> {
        self.execute(database, bucket, now, true)
    }

    /// Run only the prune step that precedes a bucket's backup
    pub fn run_prune(&self, database: &str, bucket: Bucket, now: NaiveDateTime) -> Result<PruneReport> {
        self.ctx.database(database)?;
        let retention = self.retention();
        match bucket {
            Bucket::Day => Ok(retention.clear_day_bucket(database)),
            Bucket::Week => retention.prune_week_bucket(database, now),
            Bucket::Month => anyhow::bail!("The month bucket has no retention rule"),
        }
    }

    fn retention(&self) -> RetentionManager<'_> {
        RetentionManager::new(&self.ctx.layout, &self.ctx.tree, self.ctx.drive.as_ref())
    }

    fn execute(&self, database: &str, bucket: Bucket, now: NaiveDateTime, force: bool) -> Result<BackupReport> {
        let config = self.ctx.database(database)?;
        let mut report = BackupReport::new(database, bucket);

        match bucket {
            Bucket::Day => {}
            Bucket::Week => {
                report.prune = Some(self.retention().clear_day_bucket(database));
            }
            Bucket::Month => {
                if now.day() != 1 && !force {
                    info!("Month backup for '{}' skipped: today is not the 1st", database);
                    report.gated = true;
                    return Ok(report);
                }
                report.prune = Some(self.retention().prune_week_bucket(database, now)?);
            }
        }

        info!("Starting {} backup for database '{}'", bucket, database);
        let start_time = Instant::now();

        let live: HashSet<String> = self
            .ctx
            .mongo
            .list_collection_names(database)
            .with_context(|| format!("Failed to list collections of '{}'", database))?
            .into_iter()
            .collect();

        let bucket_dir = self.ctx.layout.bucket_dir(database, bucket);
        fs::create_dir_all(&bucket_dir)
            .with_context(|| format!("Failed to create backup directory {:?}", bucket_dir))?;

        for collection in &config.collections {
            if !live.contains(collection) {
                error!("Collection '{}' not found in database '{}'", collection, database);
                report.missing_collections.push(collection.clone());
                continue;
            }

            let documents = match self.ctx.mongo.fetch_documents(database, collection) {
                Ok(documents) => documents,
                Err(e) => {
                    error!("Failed to fetch {}.{}: {:#}", database, collection, e);
                    report.fetch_failures.push(collection.clone());
                    continue;
                }
            };

            if documents.is_empty() {
                info!("Collection {}.{} is empty, nothing to back up", database, collection);
                report.skipped_empty.push(collection.clone());
                continue;
            }

            let path = bucket_dir.join(artifact_name(collection, now));
            write_artifact(&path, &documents)?;
            info!("Wrote {} documents to {:?}", documents.len(), path);

            if self.upload(database, bucket, &path) {
                report.uploaded += 1;
            } else {
                report.upload_failures += 1;
            }
            report.artifacts.push(path);
        }

        info!(
            "{} backup for '{}' completed in {:.2}s",
            bucket,
            database,
            start_time.elapsed().as_secs_f64()
        );
        Ok(report)
    }

    /// Mirror a written artifact. Failures are logged; the local copy stays.
    fn upload(&self, database: &str, bucket: Bucket, path: &Path) -> bool {
        let folder_id = match self.ctx.tree.bucket_folder(database, bucket) {
            Ok(id) => id,
            Err(e) => {
                error!(target: "drive", "Skipping upload of {:?}: {}", path, e);
                return false;
            }
        };

        match self.ctx.drive.upload_file(folder_id, path) {
            Ok(_) => true,
            Err(e) => {
                error!(target: "drive", "Failed to upload {:?} to {}: {:#}", path, folder_id, e);
                false
            }
        }
    }
}

/// Write documents as a pretty-printed JSON array (2-space indent)
fn write_artifact(path: &Path, documents: &[serde_json::Value]) -> Result<()> {
    let json = serde_json::to_string_pretty(documents).context("Failed to serialize documents")?;
    fs::write(path, json).with_context(|| format!("Failed to write artifact {:?}", path))
}

impl JobRunner for BackupManager {
    fn run_job(&mut self, database: &str, bucket: Bucket, now: NaiveDateTime) -> Result<()> {
        let report = self.run_backup(database, bucket, now)?;
        if report.upload_failures > 0 || !report.missing_collections.is_empty() {
            warn!("{}", report.summary());
        } else {
            info!("{}", report.summary());
        }
        Ok(())
    }
}
