//! Local backups layout

use mongo_drive_rotator::config::Bucket;
use mongo_drive_rotator::utils::layout::LocalLayout;
use std::fs;
use test_utils::{ResultAssertions, TestContext};

#[test]
fn test_ensure_creates_all_buckets() {
    let ctx = TestContext::new();
    let layout = LocalLayout::new(ctx.temp_dir().join("root"));

    layout.ensure("shop").assert_ok();

    for bucket in Bucket::ALL {
        let dir = ctx.temp_dir().join("root/shop/backups").join(bucket.as_str());
        assert!(dir.is_dir(), "{:?} should exist", dir);
    }
}

#[test]
fn test_ensure_keeps_existing_files() {
    let ctx = TestContext::new();
    let layout = LocalLayout::new(ctx.temp_dir());
    layout.ensure("shop").assert_ok();

    let file = layout.bucket_dir("shop", Bucket::Week).join("backup_orders_01-03-2024-00.json");
    fs::write(&file, "[]").unwrap();
    layout.ensure("shop").assert_ok();

    assert!(file.exists());
}

#[test]
fn test_list_artifacts_sorted_and_missing_dir_empty() {
    let ctx = TestContext::new();
    let layout = LocalLayout::new(ctx.temp_dir());

    assert!(layout.list_artifacts("shop", Bucket::Day).assert_ok().is_empty());

    layout.ensure("shop").assert_ok();
    let dir = layout.bucket_dir("shop", Bucket::Day);
    fs::write(dir.join("backup_b_01-03-2024-01.json"), "[]").unwrap();
    fs::write(dir.join("backup_a_01-03-2024-01.json"), "[]").unwrap();

    let names: Vec<String> = layout
        .list_artifacts("shop", Bucket::Day)
        .assert_ok()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["backup_a_01-03-2024-01.json", "backup_b_01-03-2024-01.json"]);
}
