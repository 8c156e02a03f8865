//! Command tests for mongo-drive-rotator
//!
//! These tests drive the operations behind each CLI command using mocked
//! database and remote storage clients.

mod backup;
mod list;
mod prune;
