use super::types::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to parse databases file: {0}")]
    DatabasesParseError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid {bucket} schedule '{expression}': {reason}")]
    InvalidSchedule {
        bucket: Bucket,
        expression: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Values supplied on the command line or through the environment.
/// Each one that is set replaces the matching `[global]` entry.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub working_directory: Option<PathBuf>,
    pub backups_root: Option<PathBuf>,
    pub database_url: Option<String>,
    pub root_folder_id: Option<String>,
}

impl ConfigOverrides {
    fn apply(&self, global: &mut GlobalConfig) {
        if let Some(ref dir) = self.working_directory {
            global.working_directory = dir.clone();
        }
        if let Some(ref root) = self.backups_root {
            global.backups_root = root.clone();
        }
        if let Some(ref url) = self.database_url {
            global.database_url = url.clone();
        }
        if let Some(ref id) = self.root_folder_id {
            global.root_folder_id = id.clone();
        }
    }
}

/// Load and validate settings from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    load_config_with_overrides(Some(path.as_ref()), &ConfigOverrides::default())
}

/// Load settings, apply overrides, then validate.
///
/// With no file the settings start from defaults, so every required value
/// must then come from `overrides`.
pub fn load_config_with_overrides(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Config> {
    let mut config: Config = match path {
        Some(path) => {
            let contents = fs::read_to_string(path)?;
            toml::from_str(&contents)?
        }
        None => Config::default(),
    };

    overrides.apply(&mut config.global);
    validate_config(&config)?;
    Ok(config)
}

/// Validate the settings
pub fn validate_config(config: &Config) -> Result<()> {
    let global = &config.global;

    if global.working_directory.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "working_directory is not set".to_string(),
        ));
    }

    let working_directory = super::expand_tilde(&global.working_directory);
    if !working_directory.is_dir() {
        return Err(ConfigError::ValidationError(format!(
            "Working directory does not exist: {:?}",
            working_directory
        )));
    }

    if global.backups_root.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "backups_root is not set".to_string(),
        ));
    }

    if global.database_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "database_url is not set".to_string(),
        ));
    }

    if global.root_folder_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "root_folder_id is not set".to_string(),
        ));
    }

    validate_schedule(&config.schedule)
}

fn validate_schedule(schedule: &ScheduleConfig) -> Result<()> {
    for bucket in Bucket::ALL {
        let expression = schedule.expression(bucket);
        if let Err(e) = cron::Schedule::from_str(expression) {
            return Err(ConfigError::InvalidSchedule {
                bucket,
                expression: expression.to_string(),
                reason: e.to_string(),
            });
        }
    }

    if schedule.tick_interval_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "tick_interval_seconds must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Load and validate the databases file (JSON array)
pub fn load_databases<P: AsRef<Path>>(path: P) -> Result<Vec<DatabaseConfig>> {
    let contents = fs::read_to_string(path)?;
    parse_databases(&contents)
}

/// Parse and validate databases JSON, keeping file order
pub fn parse_databases(contents: &str) -> Result<Vec<DatabaseConfig>> {
    let databases: Vec<DatabaseConfig> = serde_json::from_str(contents)?;
    validate_databases(&databases)?;
    Ok(databases)
}

fn validate_databases(databases: &[DatabaseConfig]) -> Result<()> {
    if databases.is_empty() {
        return Err(ConfigError::ValidationError(
            "No databases defined".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for database in databases {
        if database.db_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Database entry with empty db_name".to_string(),
            ));
        }

        if !seen.insert(database.db_name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Database '{}' is listed more than once",
                database.db_name
            )));
        }

        if database.collections.is_empty() {
            warn!("Database '{}' has no collections configured", database.db_name);
        }

        let mut collections = HashSet::new();
        for collection in &database.collections {
            if collection.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Database '{}': empty collection name",
                    database.db_name
                )));
            }
            if !collections.insert(collection.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Database '{}': collection '{}' is listed more than once",
                    database.db_name, collection
                )));
            }
        }
    }

    Ok(())
}
