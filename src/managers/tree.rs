//! Remote folder tree resolution
//!
//! Every configured database owns `<root>/<db>/backups/{day,week,month}` on
//! the remote side. Startup makes sure those folders exist (creating only
//! what is missing, never deleting) and then runs a fresh top-down discovery
//! pass to build the id mapping used by every later upload and prune.
//!
//! Listing or creation failures are logged and leave holes in the mapping.
//! Lookups into a hole return [`TreeError::Unresolved`] instead of panicking.

use crate::config::{Bucket, DatabaseConfig};
use crate::utils::drive_ops::{DriveFile, DriveOperations};
use crate::utils::layout::BACKUPS_DIR;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("Remote folder '{folder}' for database '{database}' is not resolved")]
    Unresolved { database: String, folder: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupsNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<FolderNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<FolderNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<FolderNode>,
}

impl BackupsNode {
    fn new(id: String) -> Self {
        Self {
            id,
            day: None,
            week: None,
            month: None,
        }
    }

    pub fn bucket(&self, bucket: Bucket) -> Option<&FolderNode> {
        match bucket {
            Bucket::Day => self.day.as_ref(),
            Bucket::Week => self.week.as_ref(),
            Bucket::Month => self.month.as_ref(),
        }
    }

    fn bucket_slot(&mut self, bucket: Bucket) -> &mut Option<FolderNode> {
        match bucket {
            Bucket::Day => &mut self.day,
            Bucket::Week => &mut self.week,
            Bucket::Month => &mut self.month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backups: Option<BackupsNode>,
}

/// Database name -> remote folder ids. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteTree {
    databases: BTreeMap<String, DatabaseNode>,
}

impl RemoteTree {
    pub fn database(&self, database: &str) -> Option<&DatabaseNode> {
        self.databases.get(database)
    }

    pub fn database_names(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    /// Remote folder id of a database's bucket folder
    pub fn bucket_folder(&self, database: &str, bucket: Bucket) -> Result<&str, TreeError> {
        let unresolved = |folder: String| TreeError::Unresolved {
            database: database.to_string(),
            folder,
        };

        let node = self
            .databases
            .get(database)
            .ok_or_else(|| unresolved(database.to_string()))?;
        let backups = node
            .backups
            .as_ref()
            .ok_or_else(|| unresolved(format!("{}/{}", database, BACKUPS_DIR)))?;
        backups
            .bucket(bucket)
            .map(|folder| folder.id.as_str())
            .ok_or_else(|| unresolved(format!("{}/{}/{}", database, BACKUPS_DIR, bucket)))
    }

    /// Folder paths of configured databases that have no id
    pub fn unresolved(&self, databases: &[DatabaseConfig]) -> Vec<String> {
        let mut missing = Vec::new();
        for database in databases {
            for bucket in Bucket::ALL {
                if let Err(TreeError::Unresolved { folder, .. }) =
                    self.bucket_folder(&database.db_name, bucket)
                {
                    if !missing.contains(&folder) {
                        missing.push(folder);
                    }
                }
            }
        }
        missing
    }

    /// Write the tree as pretty JSON for operator inspection
    pub fn write_snapshot(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize remote tree")?;
        fs::write(path, json).with_context(|| format!("Failed to write tree snapshot {:?}", path))?;
        info!("Wrote remote tree snapshot to {:?}", path);
        Ok(())
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize remote tree")
    }
}

/// Builds and discovers the remote folder tree under a root folder
pub struct TreeManager<'a> {
    drive: &'a dyn DriveOperations,
    root_folder_id: &'a str,
}

impl<'a> TreeManager<'a> {
    pub fn new(drive: &'a dyn DriveOperations, root_folder_id: &'a str) -> Self {
        Self {
            drive,
            root_folder_id,
        }
    }

    /// Ensure the structure for every database, then discover the mapping.
    /// Failures for one database do not stop the others.
    pub fn resolve_or_build(&self, databases: &[DatabaseConfig]) -> RemoteTree {
        for database in databases {
            if let Err(e) = self.ensure_structure(&database.db_name) {
                error!(
                    target: "drive",
                    "Failed to ensure remote folders for database '{}': {:#}",
                    database.db_name, e
                );
            }
        }

        self.discover(databases)
    }

    /// Create the database folder and any missing `backups` or bucket child
    pub fn ensure_structure(&self, database: &str) -> Result<()> {
        let (database_id, created) = self.ensure_child(self.root_folder_id, database, false)?;
        if created {
            info!(target: "drive", "Created remote tree for database '{}'", database);
        }

        let (backups_id, backups_created) = self.ensure_child(&database_id, BACKUPS_DIR, created)?;

        for bucket in Bucket::ALL {
            self.ensure_child(&backups_id, bucket.as_str(), backups_created)?;
        }

        Ok(())
    }

    /// Find a child folder by name, creating it when absent.
    /// A freshly created parent is known to be empty and is not listed.
    fn ensure_child(&self, parent_id: &str, name: &str, parent_is_new: bool) -> Result<(String, bool)> {
        if !parent_is_new {
            let children = self
                .drive
                .list_children(parent_id)
                .with_context(|| format!("Failed to list remote folder {}", parent_id))?;
            if let Some(existing) = find_folder(&children, name) {
                return Ok((existing.id.clone(), false));
            }
            if parent_id != self.root_folder_id {
                warn!(target: "drive", "Remote folder '{}' missing under {}, creating it", name, parent_id);
            }
        }

        let id = self
            .drive
            .create_folder(name, parent_id)
            .with_context(|| format!("Failed to create remote folder '{}' under {}", name, parent_id))?;
        Ok((id, true))
    }

    /// Top-down discovery into a freshly built mapping, limited to the
    /// configured database names and the fixed folder names
    pub fn discover(&self, databases: &[DatabaseConfig]) -> RemoteTree {
        let wanted: HashSet<&str> = databases.iter().map(|d| d.db_name.as_str()).collect();
        let mut tree = RemoteTree::default();

        let root_children = match self.drive.list_children(self.root_folder_id) {
            Ok(children) => children,
            Err(e) => {
                error!(target: "drive", "Failed to list root folder {}: {:#}", self.root_folder_id, e);
                return tree;
            }
        };

        for folder in root_children.iter().filter(|f| f.is_folder()) {
            if !wanted.contains(folder.name.as_str()) {
                continue;
            }
            if tree.databases.contains_key(&folder.name) {
                warn!(target: "drive", "Duplicate remote folder for database '{}' ignored ({})", folder.name, folder.id);
                continue;
            }

            let node = DatabaseNode {
                id: folder.id.clone(),
                backups: self.discover_backups(&folder.name, &folder.id),
            };
            tree.databases.insert(folder.name.clone(), node);
        }

        debug!(target: "drive", "Discovered remote tree: {:?}", tree);
        tree
    }

    fn discover_backups(&self, database: &str, database_id: &str) -> Option<BackupsNode> {
        let children = match self.drive.list_children(database_id) {
            Ok(children) => children,
            Err(e) => {
                error!(target: "drive", "Failed to list remote folder of database '{}': {:#}", database, e);
                return None;
            }
        };

        let backups_folder = find_folder(&children, BACKUPS_DIR)?;
        let mut backups = BackupsNode::new(backups_folder.id.clone());

        match self.drive.list_children(&backups_folder.id) {
            Ok(buckets) => {
                for bucket in Bucket::ALL {
                    if let Some(folder) = find_folder(&buckets, bucket.as_str()) {
                        *backups.bucket_slot(bucket) = Some(FolderNode {
                            id: folder.id.clone(),
                        });
                    }
                }
            }
            Err(e) => {
                error!(target: "drive", "Failed to list backups folder of database '{}': {:#}", database, e);
            }
        }

        Some(backups)
    }
}

fn find_folder<'f>(children: &'f [DriveFile], name: &str) -> Option<&'f DriveFile> {
    children.iter().find(|f| f.is_folder() && f.name == name)
}
