//! Remote tree resolution against the in-memory remote

use mongo_drive_rotator::config::{Bucket, DatabaseConfig};
use mongo_drive_rotator::managers::tree::{RemoteTree, TreeError, TreeManager};
use test_utils::{DriveCall, MockDriveOps, ResultAssertions};

const ROOT: &str = "root";

fn databases() -> Vec<DatabaseConfig> {
    vec![
        DatabaseConfig::new("shop", &["orders"]),
        DatabaseConfig::new("crm", &["leads"]),
    ]
}

#[test]
fn test_empty_root_gets_full_structure() {
    let drive = MockDriveOps::new();

    let tree = TreeManager::new(&drive, ROOT).resolve_or_build(&databases());

    assert_eq!(drive.child_names(ROOT), vec!["crm", "shop"]);
    // 2 databases x (database + backups + 3 buckets)
    assert_eq!(drive.created_folders(), 10);
    for db in ["shop", "crm"] {
        for bucket in Bucket::ALL {
            tree.bucket_folder(db, bucket).assert_ok();
        }
    }
    assert!(tree.unresolved(&databases()).is_empty());
}

#[test]
fn test_resolving_twice_creates_nothing_new() {
    let drive = MockDriveOps::new();
    let first = TreeManager::new(&drive, ROOT).resolve_or_build(&databases());
    let created = drive.created_folders();

    let second = TreeManager::new(&drive, ROOT).resolve_or_build(&databases());

    assert_eq!(drive.created_folders(), created);
    assert_eq!(first, second);
}

#[test]
fn test_missing_bucket_folder_is_recreated() {
    let drive = MockDriveOps::new();
    let db = drive.add_folder("shop", ROOT);
    let backups = drive.add_folder("backups", &db);
    drive.add_folder("day", &backups);
    let week = drive.add_folder("week", &backups);

    let tree = TreeManager::new(&drive, ROOT).resolve_or_build(&[DatabaseConfig::new("shop", &[])]);

    assert_eq!(drive.child_names(&backups), vec!["day", "month", "week"]);
    assert_eq!(tree.bucket_folder("shop", Bucket::Week).assert_ok(), week);
    assert_eq!(
        drive.get_calls().iter().filter(|c| matches!(c, DriveCall::CreateFolder { .. })).count(),
        1
    );
}

#[test]
fn test_unconfigured_folders_are_ignored() {
    let drive = MockDriveOps::new();
    drive.add_folder("legacy", ROOT);
    drive.add_file("readme.txt", ROOT);

    let tree = TreeManager::new(&drive, ROOT).resolve_or_build(&databases());

    assert_eq!(tree.database_names().collect::<Vec<_>>(), vec!["crm", "shop"]);
    assert!(tree.database("legacy").is_none());
}

#[test]
fn test_listing_failure_leaves_tree_unresolved() {
    let drive = MockDriveOps::new().with_failing_list();

    let tree = TreeManager::new(&drive, ROOT).resolve_or_build(&databases());

    assert!(tree.is_empty());
    assert_eq!(tree.unresolved(&databases()), vec!["shop", "crm"]);
    match tree.bucket_folder("shop", Bucket::Day) {
        Err(TreeError::Unresolved { database, folder }) => {
            assert_eq!(database, "shop");
            assert_eq!(folder, "shop");
        }
        other => panic!("Expected unresolved folder, got {:?}", other),
    }
}

#[test]
fn test_snapshot_round_trip() {
    let temp = tempfile::TempDir::new().unwrap();
    let drive = MockDriveOps::new();
    let tree = TreeManager::new(&drive, ROOT).resolve_or_build(&databases());

    let path = temp.path().join("tree.json");
    tree.write_snapshot(&path).assert_ok();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(json["shop"]["backups"]["week"]["id"].is_string());

    let restored: RemoteTree = serde_json::from_value(json).unwrap();
    assert_eq!(restored, tree);
}
