//! Tests for the 'list' command
//!
//! The list command shows what each local bucket currently holds.

use mongo_drive_rotator::config::Bucket;
use mongo_drive_rotator::utils::layout::LocalLayout;
use test_utils::{at, sample_orders, ConfigBuilder, MockDriveOps, MockMongoOps, ResultAssertions, TestContext};

#[test]
fn test_list_fresh_layout_is_empty() {
    let ctx = TestContext::with_minimal_config();
    ctx.layout().ensure("shop").assert_ok();

    for bucket in Bucket::ALL {
        assert!(ctx.layout().list_artifacts("shop", bucket).assert_ok().is_empty());
    }
}

#[test]
fn test_list_before_first_run() {
    let ctx = TestContext::with_minimal_config();

    // Nothing bootstrapped yet: no directories, still no error
    assert!(ctx.layout().list_artifacts("shop", Bucket::Week).assert_ok().is_empty());
}

#[test]
fn test_list_after_backups() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().add_database("shop", &["orders", "customers"]));
    let mongo = MockMongoOps::new()
        .with_collection("shop", "orders", sample_orders(2))
        .with_collection("shop", "customers", sample_orders(1));
    let manager = ctx.backup_manager(mongo, MockDriveOps::new());

    manager.run_backup("shop", Bucket::Day, at(2024, 3, 5, 9)).assert_ok();
    manager.run_backup("shop", Bucket::Day, at(2024, 3, 5, 10)).assert_ok();

    let layout: LocalLayout = ctx.layout();
    let names: Vec<String> = layout
        .list_artifacts("shop", Bucket::Day)
        .assert_ok()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();

    assert_eq!(
        names,
        vec![
            "backup_customers_05-03-2024-09.json",
            "backup_customers_05-03-2024-10.json",
            "backup_orders_05-03-2024-09.json",
            "backup_orders_05-03-2024-10.json",
        ]
    );
    assert!(layout.list_artifacts("shop", Bucket::Week).assert_ok().is_empty());
}
