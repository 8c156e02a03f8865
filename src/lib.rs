//! Mongo Drive Rotator Library
//!
//! Exports MongoDB collections into day/week/month retention buckets on
//! local disk and mirrors them into a Google Drive folder tree.

pub mod config;
pub mod managers;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, load_databases, Bucket, Config, DatabaseConfig};
pub use managers::backup::{BackupManager, BackupReport};
pub use managers::context::{bootstrap, BackupContext};
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::retention::{PruneReport, RetentionManager};
pub use managers::scheduler::{JobRunner, Scheduler};
pub use managers::tree::{RemoteTree, TreeError, TreeManager};
