//! Artifact naming

use mongo_drive_rotator::utils::naming::{artifact_name, parse_artifact_name};
use rstest::rstest;
use test_utils::{fixtures::at, OptionAssertions};

#[rstest]
#[case("orders", at(2024, 3, 1, 0), "backup_orders_01-03-2024-00.json")]
#[case("audit_log", at(2023, 12, 31, 23), "backup_audit_log_31-12-2023-23.json")]
#[case("v2-events", at(2024, 2, 29, 9), "backup_v2-events_29-02-2024-09.json")]
fn test_artifact_name(#[case] collection: &str, #[case] at: chrono::NaiveDateTime, #[case] expected: &str) {
    assert_eq!(artifact_name(collection, at), expected);

    let parsed = parse_artifact_name(expected).assert_some();
    assert_eq!(parsed.collection, collection);
    assert_eq!(parsed.timestamp, at);
}

#[rstest]
#[case("notes.txt")]
#[case("backup_orders.json")]
#[case("backup__01-03-2024-00.json")]
#[case("backup_orders_31-02-2024-00.json")]
#[case("backup_orders_01-03-2024-25.json")]
#[case("dump_orders_01-03-2024-00.json")]
fn test_unparseable_names(#[case] name: &str) {
    parse_artifact_name(name).assert_none();
}

#[test]
fn test_parsed_date_drops_hour() {
    let parsed = parse_artifact_name("backup_orders_15-01-2024-22.json").assert_some();
    assert_eq!(parsed.date(), at(2024, 1, 15, 0).date());
}
