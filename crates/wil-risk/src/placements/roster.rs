use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::warn;

use super::domain::{parse_flag, parse_number, PlacementId, PlacementSnapshot, PlacementStatus};

/// Source of placement snapshots for one evaluation cycle.
pub trait RosterProvider {
    fn fetch_roster(&self) -> Result<Vec<PlacementSnapshot>, RosterError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read roster export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid roster CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("roster unavailable: {0}")]
    Unavailable(String),
}

/// Snapshots already in memory, e.g. posted inline by the review UI.
#[derive(Debug, Clone, Default)]
pub struct InlineRoster(pub Vec<PlacementSnapshot>);

impl RosterProvider for InlineRoster {
    fn fetch_roster(&self) -> Result<Vec<PlacementSnapshot>, RosterError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone)]
enum CsvSource {
    Path(PathBuf),
    Inline(String),
}

/// Roster export in CSV form, one placement per row.
///
/// Cells are parsed leniently: a malformed value becomes unknown so the scorer can note
/// it. Rows without a placement id, and rows the reader cannot decode at all, are logged
/// and dropped; only an unreadable header or source fails the whole roster.
#[derive(Debug, Clone)]
pub struct CsvRosterProvider {
    source: CsvSource,
}

impl CsvRosterProvider {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: CsvSource::Path(path.as_ref().to_path_buf()),
        }
    }

    pub fn from_string(csv: impl Into<String>) -> Self {
        Self {
            source: CsvSource::Inline(csv.into()),
        }
    }
}

impl RosterProvider for CsvRosterProvider {
    fn fetch_roster(&self) -> Result<Vec<PlacementSnapshot>, RosterError> {
        match &self.source {
            CsvSource::Path(path) => parse_roster(std::fs::File::open(path)?),
            CsvSource::Inline(csv) => parse_roster(csv.as_bytes()),
        }
    }
}

pub fn parse_roster<R: Read>(reader: R) -> Result<Vec<PlacementSnapshot>, RosterError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.headers()?;
    let mut snapshots = Vec::new();

    for (index, record) in csv_reader.deserialize::<RosterRow>().enumerate() {
        let row = match record {
            Ok(row) => row,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                warn!(row = index + 1, error = %err, "skipping unreadable roster row");
                continue;
            }
        };
        match row.into_snapshot() {
            Some(snapshot) => snapshots.push(snapshot),
            None => warn!(row = index + 1, "skipping roster row without placement_id"),
        }
    }

    Ok(snapshots)
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    placement_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    hours_required: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    hours_completed: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    attendance_recent: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    performance_score: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    supervisor_flag: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    days_to_deadline: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    days_since_last_activity: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    docs_complete: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    province: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    institution: Option<String>,
}

impl RosterRow {
    fn into_snapshot(self) -> Option<PlacementSnapshot> {
        let placement_id = PlacementId(self.placement_id?);

        Some(PlacementSnapshot {
            placement_id,
            hours_required: parse_number(self.hours_required.as_deref()),
            hours_completed: parse_number(self.hours_completed.as_deref()),
            status: self.status.as_deref().and_then(PlacementStatus::parse),
            attendance_recent: parse_flag(self.attendance_recent.as_deref()),
            performance_score: parse_number(self.performance_score.as_deref()),
            supervisor_flag: parse_flag(self.supervisor_flag.as_deref()),
            days_to_deadline: self
                .days_to_deadline
                .as_deref()
                .and_then(|raw| raw.parse().ok()),
            days_since_last_activity: self
                .days_since_last_activity
                .as_deref()
                .and_then(|raw| raw.parse().ok()),
            docs_complete: parse_flag(self.docs_complete.as_deref()),
            province: self.province,
            institution: self.institution,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}
