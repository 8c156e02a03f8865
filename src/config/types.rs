use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Root settings structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Global settings: paths, connection string and remote root
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Base working directory (logs, credentials, databases file, tree snapshot)
    #[serde(default)]
    pub working_directory: PathBuf,

    /// Local backups root, holds `<db>/backups/{day,week,month}`
    #[serde(default)]
    pub backups_root: PathBuf,

    /// Document database connection string
    #[serde(default)]
    pub database_url: String,

    /// Remote folder id under which database folders live
    #[serde(default)]
    pub root_folder_id: String,

    /// Service account credential file
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    /// JSON array of `{ db_name, collections }`
    #[serde(default = "default_databases_file")]
    pub databases_file: PathBuf,

    /// Where the resolved remote tree is written at startup
    #[serde(default = "default_tree_snapshot_file")]
    pub tree_snapshot_file: PathBuf,

    /// Logging configuration
    #[serde(default)]
    pub log_directory: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::new(),
            backups_root: PathBuf::new(),
            database_url: String::new(),
            root_folder_id: String::new(),
            credentials_file: default_credentials_file(),
            databases_file: default_databases_file(),
            tree_snapshot_file: default_tree_snapshot_file(),
            log_directory: None,
            log_level: default_log_level(),
            log_max_files: default_log_max_files(),
        }
    }
}

impl GlobalConfig {
    /// Resolve a configured file against the working directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        let path = super::expand_tilde(path);
        if path.is_absolute() {
            path
        } else {
            super::expand_tilde(&self.working_directory).join(path)
        }
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.resolve(&self.credentials_file)
    }

    pub fn databases_path(&self) -> PathBuf {
        self.resolve(&self.databases_file)
    }

    pub fn tree_snapshot_path(&self) -> PathBuf {
        self.resolve(&self.tree_snapshot_file)
    }

    pub fn backups_root_path(&self) -> PathBuf {
        super::expand_tilde(&self.backups_root)
    }

    /// Log directory, falling back to the working directory
    pub fn log_directory_path(&self) -> PathBuf {
        match &self.log_directory {
            Some(dir) => self.resolve(dir),
            None => super::expand_tilde(&self.working_directory),
        }
    }
}

/// Trigger expressions (6-field cron, seconds first) per bucket
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_day_schedule")]
    pub day: String,
    #[serde(default = "default_week_schedule")]
    pub week: String,
    #[serde(default = "default_month_schedule")]
    pub month: String,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            day: default_day_schedule(),
            week: default_week_schedule(),
            month: default_month_schedule(),
            tick_interval_seconds: default_tick_interval(),
        }
    }
}

impl ScheduleConfig {
    /// Expression for a bucket
    pub fn expression(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Day => &self.day,
            Bucket::Week => &self.week,
            Bucket::Month => &self.month,
        }
    }
}

/// One configured database and the collections exported from it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub db_name: String,
    #[serde(default)]
    pub collections: Vec<String>,
}

impl DatabaseConfig {
    pub fn new(db_name: &str, collections: &[&str]) -> Self {
        Self {
            db_name: db_name.to_string(),
            collections: collections.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Retention tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Day,
    Week,
    Month,
}

impl Bucket {
    /// All buckets in rotation order
    pub const ALL: [Bucket; 3] = [Bucket::Day, Bucket::Week, Bucket::Month];

    /// Folder name used locally and remotely
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Day => "day",
            Bucket::Week => "week",
            Bucket::Month => "month",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(Bucket::Day),
            "week" => Ok(Bucket::Week),
            "month" => Ok(Bucket::Month),
            other => Err(format!("unknown bucket '{}' (expected day, week or month)", other)),
        }
    }
}

// Default value functions

fn default_credentials_file() -> PathBuf { PathBuf::from("credentials.json") }
fn default_databases_file() -> PathBuf { PathBuf::from("config.json") }
fn default_tree_snapshot_file() -> PathBuf { PathBuf::from("tree.json") }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
fn default_day_schedule() -> String { "0 0 * * * *".to_string() }
fn default_week_schedule() -> String { "0 0 0 * * *".to_string() }
fn default_month_schedule() -> String { "0 0 0 * * *".to_string() }
fn default_tick_interval() -> u64 { 1 }
