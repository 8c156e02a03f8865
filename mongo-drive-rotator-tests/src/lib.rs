//! Test utilities for mongo-drive-rotator
//!
//! This crate provides shared test utilities, re-exported mock
//! implementations, and helper functions for testing the rotator.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, TestContext, MockDriveOps, MockMongoOps};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::from_builder(ConfigBuilder::minimal());
//!     let manager = ctx.backup_manager(MockMongoOps::new(), MockDriveOps::new());
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::{OptionAssertions, ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use mongo_drive_rotator::config::{Bucket, Config, DatabaseConfig, GlobalConfig, ScheduleConfig};
pub use mongo_drive_rotator::managers::backup::{BackupManager, BackupReport};
pub use mongo_drive_rotator::managers::retention::PruneReport;
pub use mongo_drive_rotator::managers::tree::{RemoteTree, TreeError};

// Re-export mock implementations from the main crate
pub use mongo_drive_rotator::utils::drive_ops::mock::{DriveCall, MockDriveOps};
pub use mongo_drive_rotator::utils::drive_ops::DriveOperations;
pub use mongo_drive_rotator::utils::mongo_ops::mock::{MockMongoOps, MongoCall};
pub use mongo_drive_rotator::utils::mongo_ops::MongoOperations;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
