//! Tests for the 'backup' command
//!
//! One backup run exports the configured collections of a database into a
//! bucket and mirrors each artifact to remote storage.

use mongo_drive_rotator::config::Bucket;
use std::fs;
use test_utils::{
    at, sample_orders, seeded_mongo, ConfigBuilder, DriveCall, MockDriveOps, MockMongoOps, ResultAssertions,
    TestContext,
};

fn shop_context() -> TestContext {
    TestContext::from_builder(ConfigBuilder::new().add_database("shop", &["orders", "customers", "audit"]))
}

#[test]
fn test_day_backup_writes_and_uploads() {
    let ctx = shop_context();
    let drive = MockDriveOps::new();
    let manager = ctx.backup_manager(seeded_mongo(), drive.clone());

    let report = manager.run_backup("shop", Bucket::Day, at(2024, 3, 5, 14)).assert_ok();

    assert_eq!(report.artifacts.len(), 2);
    assert_eq!(report.uploaded, 2);
    assert_eq!(report.skipped_empty, vec!["audit"]);
    assert!(report.prune.is_none());

    let day_dir = ctx.layout().bucket_dir("shop", Bucket::Day);
    let orders = day_dir.join("backup_orders_05-03-2024-14.json");
    assert!(orders.exists());
    assert!(!day_dir.join("backup_audit_05-03-2024-14.json").exists());

    let folder = manager.context().tree.bucket_folder("shop", Bucket::Day).assert_ok();
    assert_eq!(
        drive.child_names(folder),
        vec!["backup_customers_05-03-2024-14.json", "backup_orders_05-03-2024-14.json"]
    );
    assert_eq!(
        drive.content_of(folder, "backup_orders_05-03-2024-14.json"),
        Some(fs::read_to_string(&orders).unwrap())
    );
}

#[test]
fn test_artifact_is_pretty_json_array() {
    let ctx = TestContext::with_minimal_config();
    let manager = ctx.backup_manager(
        MockMongoOps::new().with_collection("shop", "orders", sample_orders(2)),
        MockDriveOps::new(),
    );

    let report = manager.run_backup("shop", Bucket::Day, at(2024, 3, 5, 14)).assert_ok();

    let contents = fs::read_to_string(&report.artifacts[0]).unwrap();
    assert!(contents.starts_with("[\n  {"));
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(parsed, serde_json::Value::Array(sample_orders(2)));
}

#[test]
fn test_same_hour_overwrites() {
    let ctx = TestContext::with_minimal_config();
    let mongo = MockMongoOps::new().with_collection("shop", "orders", sample_orders(1));
    let manager = ctx.backup_manager(mongo.clone(), MockDriveOps::new());

    manager.run_backup("shop", Bucket::Day, at(2024, 3, 5, 14)).assert_ok();
    mongo.set_collection("shop", "orders", sample_orders(4));
    let report = manager.run_backup("shop", Bucket::Day, at(2024, 3, 5, 14)).assert_ok();

    let artifacts = ctx.layout().list_artifacts("shop", Bucket::Day).assert_ok();
    assert_eq!(artifacts.len(), 1);
    let parsed: Vec<serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&report.artifacts[0]).unwrap()).unwrap();
    assert_eq!(parsed.len(), 4);
}

#[test]
fn test_week_backup_clears_day_bucket_first() {
    let ctx = TestContext::with_minimal_config();
    let drive = MockDriveOps::new();
    let manager = ctx.backup_manager(
        MockMongoOps::new().with_collection("shop", "orders", sample_orders(1)),
        drive.clone(),
    );

    for hour in [10, 11, 12] {
        manager.run_backup("shop", Bucket::Day, at(2024, 3, 5, hour)).assert_ok();
    }
    let day_folder = manager.context().tree.bucket_folder("shop", Bucket::Day).assert_ok().to_string();
    assert_eq!(drive.children(&day_folder).len(), 3);

    let report = manager.run_backup("shop", Bucket::Week, at(2024, 3, 6, 0)).assert_ok();

    let prune = report.prune.expect("week run prunes the day bucket");
    assert_eq!(prune.local_removed, 3);
    assert_eq!(prune.remote_removed, 3);
    assert!(ctx.layout().list_artifacts("shop", Bucket::Day).assert_ok().is_empty());
    assert!(ctx.layout().bucket_dir("shop", Bucket::Day).is_dir());
    assert!(drive.children(&day_folder).is_empty());

    let week = ctx.layout().list_artifacts("shop", Bucket::Week).assert_ok();
    assert_eq!(week.len(), 1);
}

#[test]
fn test_month_backup_only_on_first() {
    let ctx = TestContext::with_minimal_config();
    let drive = MockDriveOps::new();
    let manager = ctx.backup_manager(
        MockMongoOps::new().with_collection("shop", "orders", sample_orders(1)),
        drive.clone(),
    );

    let gated = manager.run_backup("shop", Bucket::Month, at(2024, 3, 2, 0)).assert_ok();
    assert!(gated.gated);
    assert!(gated.artifacts.is_empty());
    assert!(!drive.upload_called());

    let report = manager.run_backup("shop", Bucket::Month, at(2024, 4, 1, 0)).assert_ok();
    assert!(!report.gated);
    assert_eq!(report.artifacts.len(), 1);
    assert!(report.prune.is_some());
}

#[test]
fn test_forced_month_backup_ignores_date() {
    let ctx = TestContext::with_minimal_config();
    let manager = ctx.backup_manager(
        MockMongoOps::new().with_collection("shop", "orders", sample_orders(1)),
        MockDriveOps::new(),
    );

    let report = manager.run_backup_forced("shop", Bucket::Month, at(2024, 3, 17, 8)).assert_ok();

    assert!(!report.gated);
    assert_eq!(report.artifacts.len(), 1);
}

#[test]
fn test_upload_failure_keeps_local_artifact() {
    let ctx = TestContext::with_minimal_config();
    let manager = ctx.backup_manager(
        MockMongoOps::new().with_collection("shop", "orders", sample_orders(1)),
        MockDriveOps::new().with_failing_upload(),
    );

    let report = manager.run_backup("shop", Bucket::Day, at(2024, 3, 5, 14)).assert_ok();

    assert_eq!(report.uploaded, 0);
    assert_eq!(report.upload_failures, 1);
    assert!(report.artifacts[0].exists());
}

#[test]
fn test_collection_dropped_after_startup() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().add_database("shop", &["orders", "customers"]));
    let mongo = seeded_mongo();
    let manager = ctx.backup_manager(mongo.clone(), MockDriveOps::new());

    mongo.drop_collection("shop", "orders");
    let report = manager.run_backup("shop", Bucket::Day, at(2024, 3, 5, 14)).assert_ok();

    assert_eq!(report.missing_collections, vec!["orders"]);
    assert_eq!(report.artifacts.len(), 1);
}

#[test]
fn test_unresolved_remote_skips_upload() {
    let ctx = TestContext::with_minimal_config();
    let drive = MockDriveOps::new().with_failing_create();
    let manager = ctx.backup_manager(
        MockMongoOps::new().with_collection("shop", "orders", sample_orders(1)),
        drive.clone(),
    );

    let report = manager.run_backup("shop", Bucket::Day, at(2024, 3, 5, 14)).assert_ok();

    assert_eq!(report.artifacts.len(), 1);
    assert_eq!(report.upload_failures, 1);
    assert!(!drive
        .get_calls()
        .iter()
        .any(|c| matches!(c, DriveCall::Upload { .. })));
}

#[test]
fn test_unknown_database_rejected() {
    let ctx = TestContext::with_minimal_config();
    let manager = ctx.backup_manager(seeded_mongo(), MockDriveOps::new());

    manager
        .run_backup("nope", Bucket::Day, at(2024, 3, 5, 14))
        .assert_err_contains("Database not configured");
}

#[test]
fn test_server_unreachable_fails_run() {
    let ctx = TestContext::with_minimal_config();
    let mongo = seeded_mongo();
    let manager = ctx.backup_manager(mongo.clone(), MockDriveOps::new());

    *mongo.should_fail.lock().unwrap() = true;
    manager
        .run_backup("shop", Bucket::Day, at(2024, 3, 5, 14))
        .assert_err_contains("Failed to list collections");
}

#[test]
fn test_bootstrap_rejects_missing_collection() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().add_database("shop", &["orders", "ghost"]));

    let err = ctx
        .try_backup_manager(seeded_mongo(), MockDriveOps::new())
        .err()
        .expect("bootstrap should fail");
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn test_bootstrap_rejects_missing_database() {
    let ctx = TestContext::with_minimal_config();

    let err = ctx
        .try_backup_manager(MockMongoOps::new().with_database("other"), MockDriveOps::new())
        .err()
        .expect("bootstrap should fail");
    assert!(err.to_string().contains("'shop' not found"));
}
