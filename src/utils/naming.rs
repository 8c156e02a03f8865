//! Artifact file names
//!
//! An artifact is named `backup_<collection>_<dd-MM-yyyy-HH>.json`. Building
//! and parsing the name live side by side here so that the field order used
//! by the week-bucket age rule can never drift from the one used to write
//! the files.

use chrono::{NaiveDate, NaiveDateTime};

const PREFIX: &str = "backup_";
const SUFFIX: &str = ".json";
const STAMP_FORMAT: &str = "%d-%m-%Y-%H";

/// Fields recovered from an artifact name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub collection: String,
    /// Local wall-clock time truncated to the hour
    pub timestamp: NaiveDateTime,
}

impl ArtifactName {
    /// Calendar date the artifact was taken on
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Build the artifact name for `collection` taken at `at`
pub fn artifact_name(collection: &str, at: NaiveDateTime) -> String {
    format!("{}{}_{}{}", PREFIX, collection, at.format(STAMP_FORMAT), SUFFIX)
}

/// Parse an artifact name back into its collection and timestamp.
///
/// The trailing four `-`/`_` separated tokens are hour, year, month and day,
/// read right to left. Collection names may themselves contain `_` or `-`.
/// Returns `None` for anything that is not an artifact name.
pub fn parse_artifact_name(name: &str) -> Option<ArtifactName> {
    let stem = name.strip_suffix(SUFFIX)?;

    let mut tokens = stem.rsplitn(5, |c| c == '-' || c == '_');
    let hour: u32 = tokens.next()?.parse().ok()?;
    let year: i32 = tokens.next()?.parse().ok()?;
    let month: u32 = tokens.next()?.parse().ok()?;
    let day: u32 = tokens.next()?.parse().ok()?;
    let rest = tokens.next()?;

    let collection = rest.strip_prefix(PREFIX)?;
    if collection.is_empty() {
        return None;
    }

    let timestamp = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, 0, 0)?;

    Some(ArtifactName {
        collection: collection.to_string(),
        timestamp,
    })
}
