//! Tests for the 'prune' command
//!
//! Runs only the retention step of a bucket: day clears everything, week
//! removes artifacts dated before the first day of the previous month.

use chrono::{Local, NaiveDate};
use mongo_drive_rotator::config::Bucket;
use mongo_drive_rotator::managers::retention::week_cutoff;
use rstest::rstest;
use test_utils::{at, seeded_mongo, MockDriveOps, ResultAssertions, TestContext};

#[rstest]
#[case(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())]
#[case(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())]
#[case(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(), NaiveDate::from_ymd_opt(2023, 12, 1).unwrap())]
#[case(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap())]
fn test_week_cutoff(#[case] today: NaiveDate, #[case] expected: NaiveDate) {
    assert_eq!(week_cutoff(today).assert_ok(), expected);
}

#[test]
fn test_prune_week_local_by_age() {
    let ctx = TestContext::with_minimal_config();
    let manager = ctx.backup_manager(seeded_mongo(), MockDriveOps::new());

    let old = ctx.seed_artifact("shop", Bucket::Week, "backup_orders_01-01-2024-00.json", Some(70));
    let recent = ctx.seed_artifact("shop", Bucket::Week, "backup_orders_02-01-2024-00.json", Some(5));

    let report = manager
        .run_prune("shop", Bucket::Week, Local::now().naive_local())
        .assert_ok();

    assert_eq!(report.local_removed, 1);
    assert!(!old.exists());
    assert!(recent.exists());
}

#[test]
fn test_prune_week_remote_by_name() {
    let ctx = TestContext::with_minimal_config();
    let drive = MockDriveOps::new();
    let manager = ctx.backup_manager(seeded_mongo(), drive.clone());
    let week = manager.context().tree.bucket_folder("shop", Bucket::Week).assert_ok().to_string();

    drive.add_file("backup_orders_31-01-2024-23.json", &week);
    drive.add_file("backup_orders_01-02-2024-00.json", &week);
    drive.add_file("backup_orders_14-03-2024-00.json", &week);
    drive.add_file("notes.txt", &week);

    let report = manager.run_prune("shop", Bucket::Week, at(2024, 3, 15, 0)).assert_ok();

    assert_eq!(report.remote_removed, 1);
    assert_eq!(report.remote_kept_unparsed, 1);
    assert_eq!(
        drive.child_names(&week),
        vec![
            "backup_orders_01-02-2024-00.json",
            "backup_orders_14-03-2024-00.json",
            "notes.txt",
        ]
    );
}

#[test]
fn test_prune_week_failed_delete_continues() {
    let ctx = TestContext::with_minimal_config();
    let drive = MockDriveOps::new();
    let manager = ctx.backup_manager(seeded_mongo(), drive.clone());
    let week = manager.context().tree.bucket_folder("shop", Bucket::Week).assert_ok().to_string();

    let stuck = drive.add_file("backup_orders_01-01-2024-00.json", &week);
    drive.add_file("backup_orders_02-01-2024-00.json", &week);
    *drive.failing_deletes.lock().unwrap() = [stuck].into_iter().collect();

    let report = manager.run_prune("shop", Bucket::Week, at(2024, 3, 15, 0)).assert_ok();

    assert_eq!(report.remote_removed, 1);
    assert_eq!(report.failures, 1);
    assert!(!report.is_clean());
    assert_eq!(drive.child_names(&week), vec!["backup_orders_01-01-2024-00.json"]);
}

#[test]
fn test_prune_day_clears_everything() {
    let ctx = TestContext::with_minimal_config();
    let drive = MockDriveOps::new();
    let manager = ctx.backup_manager(seeded_mongo(), drive.clone());
    let day = manager.context().tree.bucket_folder("shop", Bucket::Day).assert_ok().to_string();

    ctx.seed_artifact("shop", Bucket::Day, "backup_orders_05-03-2024-10.json", None);
    ctx.seed_artifact("shop", Bucket::Day, "stray.txt", None);
    drive.add_file("backup_orders_05-03-2024-10.json", &day);

    let report = manager.run_prune("shop", Bucket::Day, at(2024, 3, 5, 11)).assert_ok();

    assert_eq!(report.local_removed, 2);
    assert_eq!(report.remote_removed, 1);
    assert!(report.is_clean());
    assert!(ctx.layout().bucket_dir("shop", Bucket::Day).is_dir());
}

#[test]
fn test_prune_month_rejected() {
    let ctx = TestContext::with_minimal_config();
    let manager = ctx.backup_manager(seeded_mongo(), MockDriveOps::new());

    manager
        .run_prune("shop", Bucket::Month, at(2024, 3, 5, 11))
        .assert_err_contains("no retention rule");
}

#[test]
fn test_prune_unresolved_remote_is_skipped() {
    let ctx = TestContext::with_minimal_config();
    let drive = MockDriveOps::new().with_failing_create();
    let manager = ctx.backup_manager(seeded_mongo(), drive);
    ctx.seed_artifact("shop", Bucket::Day, "backup_orders_05-03-2024-10.json", None);

    let report = manager.run_prune("shop", Bucket::Day, at(2024, 3, 5, 11)).assert_ok();

    assert_eq!(report.local_removed, 1);
    assert!(report.remote_skipped);
}
