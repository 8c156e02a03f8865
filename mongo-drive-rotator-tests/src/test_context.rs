//! Test context and harness for manager tests
//!
//! Provides a unified context for setting up temp directories, settings and
//! a bootstrapped backup manager over mocked clients.

use crate::config_builder::ConfigBuilder;
use anyhow::Result;
use filetime::FileTime;
use mongo_drive_rotator::config::{Bucket, Config, DatabaseConfig};
use mongo_drive_rotator::managers::backup::BackupManager;
use mongo_drive_rotator::managers::context::bootstrap;
use mongo_drive_rotator::utils::drive_ops::mock::MockDriveOps;
use mongo_drive_rotator::utils::layout::LocalLayout;
use mongo_drive_rotator::utils::mongo_ops::mock::MockMongoOps;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
    /// The test configuration
    config: Option<Config>,
    databases: Vec<DatabaseConfig>,
}

impl TestContext {
    /// Create a new test context with a temporary directory
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
            config: None,
            databases: Vec::new(),
        }
    }

    /// Create a test context with a minimal configuration
    pub fn with_minimal_config() -> Self {
        Self::from_builder(ConfigBuilder::minimal())
    }

    /// Create a test context from a ConfigBuilder
    pub fn from_builder(builder: ConfigBuilder) -> Self {
        let (config, databases, temp_dir) = builder.persist();

        Self {
            temp_dir,
            config: Some(config),
            databases,
        }
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the configuration
    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Configured databases
    pub fn databases(&self) -> &[DatabaseConfig] {
        &self.databases
    }

    /// Local layout rooted at the configured backups root
    pub fn layout(&self) -> LocalLayout {
        let config = self.config.as_ref().expect("Context has no configuration");
        LocalLayout::new(config.global.backups_root_path())
    }

    /// Bootstrap a backup manager over the given mocks
    pub fn try_backup_manager(&self, mongo: MockMongoOps, drive: MockDriveOps) -> Result<BackupManager> {
        let config = self.config.as_ref().expect("Context has no configuration");
        let ctx = bootstrap(config, self.databases.clone(), Box::new(mongo), Box::new(drive))?;
        Ok(BackupManager::new(ctx))
    }

    /// Bootstrap a backup manager, panicking on failure
    pub fn backup_manager(&self, mongo: MockMongoOps, drive: MockDriveOps) -> BackupManager {
        self.try_backup_manager(mongo, drive)
            .expect("Failed to bootstrap backup manager")
    }

    /// Place an artifact in a local bucket, optionally aged `age_days` days
    pub fn seed_artifact(&self, database: &str, bucket: Bucket, name: &str, age_days: Option<u32>) -> PathBuf {
        let dir = self.layout().bucket_dir(database, bucket);
        std::fs::create_dir_all(&dir).expect("Failed to create bucket directory");
        let path = dir.join(name);
        std::fs::write(&path, "[]").expect("Failed to write artifact");
        if let Some(days) = age_days {
            let modified = SystemTime::now() - Duration::from_secs(days as u64 * 86_400);
            filetime::set_file_mtime(&path, FileTime::from_system_time(modified))
                .expect("Failed to set modification time");
        }
        path
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Read a file from the temp directory
    pub fn read_file(&self, name: &str) -> Result<String> {
        let path = self.temp_dir.path().join(name);
        Ok(std::fs::read_to_string(path)?)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Ok with a custom message
    fn assert_ok_msg(self, msg: &str) -> T;

    /// Assert that the result is Err
    fn assert_err(self);

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Debug> ResultAssertions<T> for Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    }

    fn assert_ok_msg(self, msg: &str) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("{}: {:?}", msg, e),
        }
    }

    fn assert_err(self) {
        if let Ok(v) = self {
            panic!("Expected Err, got Ok: {:?}", v);
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = format!("{:?}", e);
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}

/// Extension trait for Option assertions
pub trait OptionAssertions<T> {
    /// Assert that the option is Some and return the value
    fn assert_some(self) -> T;

    /// Assert that the option is None
    fn assert_none(self);
}

impl<T: std::fmt::Debug> OptionAssertions<T> for Option<T> {
    fn assert_some(self) -> T {
        match self {
            Some(v) => v,
            None => panic!("Expected Some, got None"),
        }
    }

    fn assert_none(self) {
        if let Some(v) = self {
            panic!("Expected None, got Some: {:?}", v);
        }
    }
}
