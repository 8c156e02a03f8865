//! Startup bootstrap and the run context shared by every job

use crate::config::{Config, DatabaseConfig};
use crate::managers::tree::{RemoteTree, TreeManager};
use crate::utils::drive::DriveClient;
use crate::utils::drive_ops::DriveOperations;
use crate::utils::layout::LocalLayout;
use crate::utils::mongo::MongoSource;
use crate::utils::mongo_ops::MongoOperations;
use anyhow::{Context, Result};
use std::collections::HashSet;
use tracing::{info, warn};

/// Everything a backup job needs. Built once at startup and owned by the
/// polling loop; the tree is not modified afterwards.
pub struct BackupContext {
    pub databases: Vec<DatabaseConfig>,
    pub layout: LocalLayout,
    pub tree: RemoteTree,
    pub mongo: Box<dyn MongoOperations>,
    pub drive: Box<dyn DriveOperations>,
}

impl BackupContext {
    pub fn new(
        databases: Vec<DatabaseConfig>,
        layout: LocalLayout,
        tree: RemoteTree,
        mongo: Box<dyn MongoOperations>,
        drive: Box<dyn DriveOperations>,
    ) -> Self {
        Self {
            databases,
            layout,
            tree,
            mongo,
            drive,
        }
    }

    /// Configured database by name
    pub fn database(&self, name: &str) -> Result<&DatabaseConfig> {
        self.databases
            .iter()
            .find(|d| d.db_name == name)
            .with_context(|| format!("Database not configured: {}", name))
    }
}

/// Open the real database and remote clients from settings
pub fn connect(config: &Config) -> Result<(Box<dyn MongoOperations>, Box<dyn DriveOperations>)> {
    let mongo = MongoSource::connect(&config.global.database_url)?;
    let drive = DriveClient::from_credentials_file(&config.global.credentials_path())?;
    Ok((Box::new(mongo), Box::new(drive)))
}

/// Check that every configured database and collection exists on the server
pub fn verify_databases(mongo: &dyn MongoOperations, databases: &[DatabaseConfig]) -> Result<()> {
    let available: HashSet<String> = mongo
        .list_database_names()
        .context("Failed to list databases on server")?
        .into_iter()
        .collect();

    for database in databases {
        if !available.contains(&database.db_name) {
            anyhow::bail!("Database '{}' not found on server", database.db_name);
        }

        let collections: HashSet<String> = mongo
            .list_collection_names(&database.db_name)?
            .into_iter()
            .collect();

        for collection in &database.collections {
            if !collections.contains(collection) {
                anyhow::bail!(
                    "Collection '{}' not found in database '{}'",
                    collection,
                    database.db_name
                );
            }
        }
    }

    Ok(())
}

/// Verify sources, prepare local and remote trees, write the tree snapshot
pub fn bootstrap(
    config: &Config,
    databases: Vec<DatabaseConfig>,
    mongo: Box<dyn MongoOperations>,
    drive: Box<dyn DriveOperations>,
) -> Result<BackupContext> {
    verify_databases(mongo.as_ref(), &databases)?;

    let layout = LocalLayout::new(config.global.backups_root_path());
    for database in &databases {
        layout.ensure(&database.db_name)?;
    }

    let tree = resolve_tree(config, drive.as_ref(), &databases)?;

    info!("Bootstrap complete for {} database(s)", databases.len());
    Ok(BackupContext::new(databases, layout, tree, mongo, drive))
}

/// Ensure and discover the remote tree, then write the snapshot
pub fn resolve_tree(
    config: &Config,
    drive: &dyn DriveOperations,
    databases: &[DatabaseConfig],
) -> Result<RemoteTree> {
    let tree = TreeManager::new(drive, &config.global.root_folder_id).resolve_or_build(databases);

    for folder in tree.unresolved(databases) {
        warn!("Remote folder '{}' could not be resolved; uploads to it will be skipped", folder);
    }

    tree.write_snapshot(&config.global.tree_snapshot_path())?;
    Ok(tree)
}
