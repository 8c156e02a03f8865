//! Retention pruning for the day and week buckets
//!
//! - Day bucket: cleared completely, locally and remotely, right before a
//!   week backup runs.
//! - Week bucket: before a month backup, artifacts dated before the first
//!   day of the previous calendar month are removed. Local age comes from
//!   the file modification time, remote age from the date in the name.
//!
//! Both sweeps are best effort: a failed deletion is logged and counted and
//! the sweep carries on.

use crate::config::Bucket;
use crate::managers::tree::RemoteTree;
use crate::utils::drive_ops::DriveOperations;
use crate::utils::layout::LocalLayout;
use crate::utils::naming::parse_artifact_name;
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Local, Months, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Outcome of one prune pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub local_removed: usize,
    pub remote_removed: usize,
    /// Remote names that carry no parseable date and were left alone
    pub remote_kept_unparsed: usize,
    pub failures: usize,
    /// Remote side skipped because the target folder is not resolved
    pub remote_skipped: bool,
}

impl PruneReport {
    pub fn is_clean(&self) -> bool {
        self.failures == 0 && !self.remote_skipped
    }
}

/// First day of the previous calendar month
pub fn week_cutoff(today: NaiveDate) -> Result<NaiveDate> {
    today
        .with_day(1)
        .and_then(|first| first.checked_sub_months(Months::new(1)))
        .with_context(|| format!("Cannot compute week cutoff for {}", today))
}

pub struct RetentionManager<'a> {
    layout: &'a LocalLayout,
    tree: &'a RemoteTree,
    drive: &'a dyn DriveOperations,
}

impl<'a> RetentionManager<'a> {
    pub fn new(layout: &'a LocalLayout, tree: &'a RemoteTree, drive: &'a dyn DriveOperations) -> Self {
        Self { layout, tree, drive }
    }

    /// Remove every day artifact of a database, regardless of age
    pub fn clear_day_bucket(&self, database: &str) -> PruneReport {
        info!("Clearing day bucket for database '{}'", database);
        let mut report = PruneReport::default();

        let dir = self.layout.bucket_dir(database, Bucket::Day);
        match clear_directory(&dir) {
            Ok(removed) => report.local_removed = removed,
            Err(e) => {
                error!("Failed to clear local day bucket {:?}: {:#}", dir, e);
                report.failures += 1;
            }
        }

        self.sweep_remote(database, Bucket::Day, &mut report, |_| true);

        info!(
            "Day bucket cleared for '{}': {} local, {} remote removed",
            database, report.local_removed, report.remote_removed
        );
        report
    }

    /// Remove week artifacts dated before the first day of the previous month
    pub fn prune_week_bucket(&self, database: &str, now: NaiveDateTime) -> Result<PruneReport> {
        let cutoff = week_cutoff(now.date())?;
        info!("Pruning week bucket for database '{}' (cutoff {})", database, cutoff);

        let mut report = PruneReport::default();
        let cutoff_time = cutoff.and_time(chrono::NaiveTime::MIN);

        let dir = self.layout.bucket_dir(database, Bucket::Week);
        match self.layout.list_artifacts(database, Bucket::Week) {
            Ok(files) => {
                for path in files {
                    match modified_local(&path) {
                        Ok(modified) if modified < cutoff_time => match fs::remove_file(&path) {
                            Ok(()) => {
                                debug!("Removed expired week artifact {:?}", path);
                                report.local_removed += 1;
                            }
                            Err(e) => {
                                error!("Failed to remove {:?}: {}", path, e);
                                report.failures += 1;
                            }
                        },
                        Ok(_) => {}
                        Err(e) => {
                            error!("Failed to read age of {:?}: {:#}", path, e);
                            report.failures += 1;
                        }
                    }
                }
            }
            Err(e) => {
                error!("Failed to list local week bucket {:?}: {:#}", dir, e);
                report.failures += 1;
            }
        }

        let mut unparsed = 0;
        self.sweep_remote(database, Bucket::Week, &mut report, |name| {
            match parse_artifact_name(name) {
                Some(artifact) => artifact.date() < cutoff,
                None => {
                    warn!(target: "drive", "Keeping remote week object with unrecognised name '{}'", name);
                    unparsed += 1;
                    false
                }
            }
        });
        report.remote_kept_unparsed = unparsed;

        info!(
            "Week bucket pruned for '{}': {} local, {} remote removed",
            database, report.local_removed, report.remote_removed
        );
        Ok(report)
    }

    /// Delete remote children of a bucket folder selected by `expired`
    fn sweep_remote<F>(&self, database: &str, bucket: Bucket, report: &mut PruneReport, mut expired: F)
    where
        F: FnMut(&str) -> bool,
    {
        let folder_id = match self.tree.bucket_folder(database, bucket) {
            Ok(id) => id,
            Err(e) => {
                error!(target: "drive", "Skipping remote {} prune: {}", bucket, e);
                report.remote_skipped = true;
                return;
            }
        };

        let children = match self.drive.list_children(folder_id) {
            Ok(children) => children,
            Err(e) => {
                error!(target: "drive", "Failed to list remote {} folder of '{}': {:#}", bucket, database, e);
                report.failures += 1;
                return;
            }
        };

        for child in children.iter().filter(|c| expired(&c.name)) {
            match self.drive.delete_file(&child.id) {
                Ok(()) => report.remote_removed += 1,
                Err(e) => {
                    error!(target: "drive", "Failed to delete remote '{}' ({}): {:#}", child.name, child.id, e);
                    report.failures += 1;
                }
            }
        }
    }
}

/// Remove a directory with its contents and recreate it empty.
/// Returns the number of files that were inside.
fn clear_directory(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    if dir.exists() {
        removed = fs::read_dir(dir)
            .with_context(|| format!("Failed to read {:?}", dir))?
            .filter_map(|entry| entry.ok())
            .count();
        fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {:?}", dir))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("Failed to recreate {:?}", dir))?;
    Ok(removed)
}

fn modified_local(path: &Path) -> Result<NaiveDateTime> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("Failed to read modification time of {:?}", path))?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}
