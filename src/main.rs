use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use mongo_drive_rotator::config::{self, Bucket, Config, ConfigOverrides, DatabaseConfig};
use mongo_drive_rotator::managers::{self, backup::BackupManager, scheduler::Scheduler};
use mongo_drive_rotator::utils::drive::DriveClient;
use mongo_drive_rotator::utils::layout::LocalLayout;
use mongo_drive_rotator::utils::locker::InstanceLock;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const DEFAULT_CONFIG_FILE: &str = "rotator.toml";

#[derive(Parser)]
#[command(name = "mongo-drive-rotator")]
#[command(about = "Rotating MongoDB backups mirrored to Google Drive", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to settings file (defaults to ./rotator.toml when present)
    #[arg(short, long, env = "ROTATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Working directory holding credentials, databases file and logs
    #[arg(long, env = "FOLDER_PATH")]
    working_directory: Option<PathBuf>,

    /// Local backups root
    #[arg(long, env = "BACKUPS_PATH")]
    backups_root: Option<PathBuf>,

    /// MongoDB connection string
    #[arg(long, env = "DB_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Remote folder id the database folders live under
    #[arg(long, env = "START_FOLDER")]
    root_folder_id: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap and run the rotation schedule forever
    Run,

    /// Run one backup now
    Backup {
        /// Database to back up
        #[arg(short, long)]
        database: String,

        /// Bucket to back up into (day, week, month)
        #[arg(short, long)]
        bucket: Bucket,

        /// Run a month backup even when today is not the 1st
        #[arg(long)]
        force: bool,
    },

    /// Run only the pruning step of a bucket
    Prune {
        /// Database to prune
        #[arg(short, long)]
        database: String,

        /// Bucket to prune (day or week)
        #[arg(short, long)]
        bucket: Bucket,
    },

    /// Resolve the remote folder tree, write and print the snapshot
    Tree,

    /// List configured databases and local artifacts
    List,

    /// Validate settings and databases file
    Validate,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            working_directory: self.working_directory.clone(),
            backups_root: self.backups_root.clone(),
            database_url: self.database_url.clone(),
            root_folder_id: self.root_folder_id.clone(),
        }
    }

    fn settings_path(&self) -> Option<PathBuf> {
        match self.config {
            Some(ref path) => Some(path.clone()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            }
        }
    }
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();

    if let Some(Commands::Validate) = cli.command {
        managers::logging::init_console_logging();
        return handle_validate(&cli);
    }

    let config = config::load_config_with_overrides(cli.settings_path().as_deref(), &cli.overrides())?;
    let databases = config::load_databases(config.global.databases_path())
        .with_context(|| format!("Failed to load databases from {:?}", config.global.databases_path()))?;

    // Setup logging with file rotation (must keep guard alive)
    let logging_config = managers::logging::LoggingConfig::from_config(
        &config.global.log_directory_path(),
        &config.global.log_level,
        config.global.log_max_files,
    );
    let _log_guard = managers::logging::init_logging(&logging_config)?;

    match cli.command.take().unwrap_or(Commands::Run) {
        Commands::Run => handle_run(config, databases),
        Commands::Backup { database, bucket, force } => handle_backup(config, databases, &database, bucket, force),
        Commands::Prune { database, bucket } => handle_prune(config, databases, &database, bucket),
        Commands::Tree => handle_tree(&config, &databases),
        Commands::List => handle_list(&config, &databases),
        Commands::Validate => handle_validate(&cli),
    }
}

fn require_database(databases: &[DatabaseConfig], name: &str) -> Result<()> {
    if databases.iter().any(|d| d.db_name == name) {
        Ok(())
    } else {
        anyhow::bail!("Database not configured: {}", name)
    }
}

fn start_manager(config: &Config, databases: Vec<DatabaseConfig>) -> Result<BackupManager> {
    let (mongo, drive) = managers::context::connect(config)?;
    let ctx = managers::context::bootstrap(config, databases, mongo, drive)?;
    Ok(BackupManager::new(ctx))
}

fn handle_run(config: Config, databases: Vec<DatabaseConfig>) -> Result<()> {
    let _lock = InstanceLock::acquire(&config.global.backups_root_path())?;

    let mut scheduler = Scheduler::new(&config.schedule, &databases, Local::now())?;
    let mut manager = start_manager(&config, databases)?;

    info!("Rotator started");
    scheduler.run_forever(
        &mut manager,
        Duration::from_secs(config.schedule.tick_interval_seconds),
    );
    Ok(())
}

fn handle_backup(
    config: Config,
    databases: Vec<DatabaseConfig>,
    database: &str,
    bucket: Bucket,
    force: bool,
) -> Result<()> {
    require_database(&databases, database)?;
    let _lock = InstanceLock::acquire(&config.global.backups_root_path())?;
    let manager = start_manager(&config, databases)?;

    let now = Local::now().naive_local();
    let report = if force {
        manager.run_backup_forced(database, bucket, now)?
    } else {
        manager.run_backup(database, bucket, now)?
    };

    println!("{}", report.summary());
    for artifact in &report.artifacts {
        println!("  {}", artifact.display());
    }
    for collection in &report.missing_collections {
        println!("  missing collection: {}", collection);
    }
    Ok(())
}

fn handle_prune(config: Config, databases: Vec<DatabaseConfig>, database: &str, bucket: Bucket) -> Result<()> {
    if bucket == Bucket::Month {
        anyhow::bail!("The month bucket has no retention rule; use day or week");
    }
    require_database(&databases, database)?;
    let _lock = InstanceLock::acquire(&config.global.backups_root_path())?;
    let manager = start_manager(&config, databases)?;

    let report = manager.run_prune(database, bucket, Local::now().naive_local())?;
    println!(
        "{}/{}: {} local, {} remote removed, {} failures{}",
        database,
        bucket,
        report.local_removed,
        report.remote_removed,
        report.failures,
        if report.remote_skipped { " (remote skipped)" } else { "" }
    );
    Ok(())
}

fn handle_tree(config: &Config, databases: &[DatabaseConfig]) -> Result<()> {
    let drive = DriveClient::from_credentials_file(&config.global.credentials_path())?;
    let tree = managers::context::resolve_tree(config, &drive, databases)?;
    println!("{}", tree.to_pretty_json()?);
    Ok(())
}

fn handle_list(config: &Config, databases: &[DatabaseConfig]) -> Result<()> {
    let layout = LocalLayout::new(config.global.backups_root_path());

    for database in databases {
        println!("{}", database.db_name);
        println!("  Collections: {}", database.collections.join(", "));
        for bucket in Bucket::ALL {
            let artifacts = layout.list_artifacts(&database.db_name, bucket)?;
            println!("  {} ({}):", bucket, artifacts.len());
            for artifact in artifacts {
                println!("    {}", file_name(&artifact));
            }
        }
        println!();
    }
    Ok(())
}

fn handle_validate(cli: &Cli) -> Result<()> {
    let config = config::load_config_with_overrides(cli.settings_path().as_deref(), &cli.overrides())?;
    let databases = config::load_databases(config.global.databases_path())
        .with_context(|| format!("Failed to load databases from {:?}", config.global.databases_path()))?;

    println!("Configuration is valid!");
    println!("Databases: {}", databases.len());
    println!(
        "Collections: {}",
        databases.iter().map(|d| d.collections.len()).sum::<usize>()
    );
    println!("Backups root: {}", config.global.backups_root_path().display());
    for bucket in Bucket::ALL {
        println!("Schedule {}: {}", bucket, config.schedule.expression(bucket));
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
