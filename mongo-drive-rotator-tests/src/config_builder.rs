//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating settings and databases files with
//! sensible defaults, all rooted in a temporary working directory.

use mongo_drive_rotator::config::{Bucket, Config, DatabaseConfig, GlobalConfig, ScheduleConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Remote root id used by every builder-made config
pub const TEST_ROOT_FOLDER: &str = "test-root";

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    global: GlobalConfig,
    schedule: ScheduleConfig,
    databases: Vec<DatabaseConfig>,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with no databases
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let log_directory = temp_dir.path().join("logs");
        fs::create_dir_all(&log_directory).expect("Failed to create log directory");

        let global = GlobalConfig {
            working_directory: temp_dir.path().to_path_buf(),
            backups_root: temp_dir.path().join("backups"),
            database_url: "mongodb://127.0.0.1:1".to_string(),
            root_folder_id: TEST_ROOT_FOLDER.to_string(),
            log_directory: Some(log_directory),
            log_max_files: 5,
            ..GlobalConfig::default()
        };

        Self {
            temp_dir,
            global,
            schedule: ScheduleConfig::default(),
            databases: Vec::new(),
        }
    }

    /// Create a config with one database `shop` exporting `orders`
    pub fn minimal() -> Self {
        Self::new().add_database("shop", &["orders"])
    }

    /// Add a database with its collections
    pub fn add_database(mut self, name: &str, collections: &[&str]) -> Self {
        self.databases.push(DatabaseConfig::new(name, collections));
        self
    }

    /// Override one bucket's trigger expression
    pub fn with_schedule(mut self, bucket: Bucket, expression: &str) -> Self {
        match bucket {
            Bucket::Day => self.schedule.day = expression.to_string(),
            Bucket::Week => self.schedule.week = expression.to_string(),
            Bucket::Month => self.schedule.month = expression.to_string(),
        }
        self
    }

    /// Set the connection string
    pub fn with_database_url(mut self, url: &str) -> Self {
        self.global.database_url = url.to_string();
        self
    }

    /// Set the remote root id
    pub fn with_root_folder_id(mut self, id: &str) -> Self {
        self.global.root_folder_id = id.to_string();
        self
    }

    /// Set the log level
    pub fn with_log_level(mut self, level: &str) -> Self {
        self.global.log_level = level.to_string();
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the backups root
    pub fn backups_root(&self) -> &Path {
        &self.global.backups_root
    }

    /// Build the Config
    pub fn build(self) -> Config {
        Config {
            global: self.global,
            schedule: self.schedule,
        }
    }

    /// Write `rotator.toml` and `config.json` into the temp dir.
    /// Returns the settings file path.
    pub fn write_files(&self) -> PathBuf {
        let config = Config {
            global: self.global.clone(),
            schedule: self.schedule.clone(),
        };

        let settings_path = self.temp_dir.path().join("rotator.toml");
        let toml_str = toml::to_string_pretty(&config).expect("Failed to serialize settings");
        fs::write(&settings_path, toml_str).expect("Failed to write settings file");

        let databases_json =
            serde_json::to_string_pretty(&self.databases).expect("Failed to serialize databases");
        fs::write(config.global.databases_path(), databases_json).expect("Failed to write databases file");

        settings_path
    }

    /// Keep the temp directory (don't delete on drop)
    pub fn persist(self) -> (Config, Vec<DatabaseConfig>, TempDir) {
        let config = Config {
            global: self.global,
            schedule: self.schedule,
        };
        (config, self.databases, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
