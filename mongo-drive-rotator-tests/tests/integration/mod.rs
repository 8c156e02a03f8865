//! Integration tests for mongo-drive-rotator
//!
//! These tests require Docker and run the backup workflow against a real
//! MongoDB server. Remote storage stays mocked.
//! Run with: `cargo test -p mongo-drive-rotator-tests --test integration -- --ignored`

mod common;
