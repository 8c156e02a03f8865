//! Configuration module for mongo-drive-rotator
//!
//! Two inputs are loaded at startup:
//!
//! 1. A TOML settings file (`[global]` paths and remote root, `[schedule]`
//!    trigger expressions). Any `[global]` path or the connection string can
//!    be overridden from the command line or environment.
//! 2. A JSON databases file listing `{ db_name, collections }` entries.
//!
//! ## Example Usage
//!
//! ```no_run
//! use mongo_drive_rotator::config;
//!
//! let config = config::load_config("rotator.toml")?;
//! let databases = config::load_databases(config.global.databases_path())?;
//!
//! for database in &databases {
//!     println!("Database: {}, Collections: {:?}", database.db_name, database.collections);
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{
    load_config, load_config_with_overrides, load_databases, parse_databases, validate_config,
    ConfigError, ConfigOverrides, Result,
};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
