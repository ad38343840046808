use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Identifier wrapper for placements supplied by the roster provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlacementId(pub String);

impl PlacementId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlacementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status reported by the roster provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStatus {
    Pending,
    Placed,
    Active,
    Completed,
    Withdrawn,
}

impl PlacementStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PlacementStatus::Pending => "pending",
            PlacementStatus::Placed => "placed",
            PlacementStatus::Active => "active",
            PlacementStatus::Completed => "completed",
            PlacementStatus::Withdrawn => "withdrawn",
        }
    }

    /// Lenient parse used for roster imports; unrecognised values are treated as unknown.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "placed" => Some(Self::Placed),
            "active" => Some(Self::Active),
            "completed" | "complete" => Some(Self::Completed),
            "withdrawn" => Some(Self::Withdrawn),
            _ => None,
        }
    }
}

/// Point-in-time view of one placement, owned by the roster provider.
///
/// Every field except the id may be missing. Missing or malformed values never fail a
/// deserialization; the scorer excludes the affected factor instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementSnapshot {
    pub placement_id: PlacementId,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hours_required: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hours_completed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<PlacementStatus>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub attendance_recent: Option<bool>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub performance_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub supervisor_flag: Option<bool>,
    #[serde(default, deserialize_with = "lenient_days")]
    pub days_to_deadline: Option<i64>,
    #[serde(default, deserialize_with = "lenient_idle_days")]
    pub days_since_last_activity: Option<u32>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub docs_complete: Option<bool>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub province: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub institution: Option<String>,
}

impl PlacementSnapshot {
    /// Snapshot with every attribute unknown.
    pub fn new(placement_id: impl Into<String>) -> Self {
        Self {
            placement_id: PlacementId::new(placement_id),
            hours_required: None,
            hours_completed: None,
            status: None,
            attendance_recent: None,
            performance_score: None,
            supervisor_flag: None,
            days_to_deadline: None,
            days_since_last_activity: None,
            docs_complete: None,
            province: None,
            institution: None,
        }
    }
}

// Each field deserializer accepts any JSON value and maps what it cannot read to `None`,
// so one malformed attribute never rejects the snapshot or the batch around it.

fn lenient_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Value>::deserialize(deserializer)
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_value(deserializer)?.and_then(|value| match value {
        Value::Number(number) => number.as_f64().filter(|value| value.is_finite()),
        Value::String(raw) => parse_number(Some(&raw)),
        _ => None,
    }))
}

fn whole_number(value: Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.fract() == 0.0 && value.abs() < i64::MAX as f64)
                .map(|value| value as i64)
        }),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_days<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_value(deserializer)?.and_then(whole_number))
}

fn lenient_idle_days<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_value(deserializer)?
        .and_then(whole_number)
        .and_then(|days| u32::try_from(days).ok()))
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_value(deserializer)?.and_then(|value| match value {
        Value::Bool(flag) => Some(flag),
        Value::String(raw) => parse_flag(Some(&raw)),
        _ => None,
    }))
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<PlacementStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_value(deserializer)?.and_then(|value| match value {
        Value::String(raw) => PlacementStatus::parse(&raw),
        _ => None,
    }))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_value(deserializer)?.and_then(|value| match value {
        Value::String(text) => Some(text),
        _ => None,
    }))
}

/// Finite number from free text, as exported by spreadsheets and forms.
pub(crate) fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Yes/no flag from free text; anything unrecognised is unknown.
pub(crate) fn parse_flag(raw: Option<&str>) -> Option<bool> {
    match raw?.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Risk factors in evaluation order. The order is part of the output contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorCode {
    LowAttendance,
    PoorPerformance,
    NoResponse,
    SupervisorConcern,
    DeadlineRisk,
    IncompleteDocs,
}

impl RiskFactorCode {
    pub fn ordered() -> [RiskFactorCode; 6] {
        [
            RiskFactorCode::LowAttendance,
            RiskFactorCode::PoorPerformance,
            RiskFactorCode::NoResponse,
            RiskFactorCode::SupervisorConcern,
            RiskFactorCode::DeadlineRisk,
            RiskFactorCode::IncompleteDocs,
        ]
    }

    pub const fn code(self) -> &'static str {
        match self {
            RiskFactorCode::LowAttendance => "low_attendance",
            RiskFactorCode::PoorPerformance => "poor_performance",
            RiskFactorCode::NoResponse => "no_response",
            RiskFactorCode::SupervisorConcern => "supervisor_concern",
            RiskFactorCode::DeadlineRisk => "deadline_risk",
            RiskFactorCode::IncompleteDocs => "incomplete_docs",
        }
    }

    /// Points contributed when the factor triggers.
    pub const fn weight(self) -> u8 {
        match self {
            RiskFactorCode::LowAttendance => 20,
            RiskFactorCode::PoorPerformance => 25,
            RiskFactorCode::NoResponse => 15,
            RiskFactorCode::SupervisorConcern => 25,
            RiskFactorCode::DeadlineRisk => 20,
            RiskFactorCode::IncompleteDocs => 10,
        }
    }
}

impl fmt::Display for RiskFactorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RiskFactorCode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        RiskFactorCode::ordered()
            .into_iter()
            .find(|code| code.code() == value)
            .ok_or_else(|| format!("unknown risk factor code '{value}'"))
    }
}

pub const HIGH_RISK_THRESHOLD: u8 = 70;
pub const MEDIUM_RISK_THRESHOLD: u8 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn from_score(score: u8) -> Self {
        if score >= HIGH_RISK_THRESHOLD {
            RiskLevel::High
        } else if score >= MEDIUM_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

const DATA_INCOMPLETE_PREFIX: &str = "data incomplete: excluded from ";
const DATA_INCOMPLETE_SUFFIX: &str = " calculation";

/// One rationale line: either a triggered factor or a note that a factor was skipped
/// because its inputs were unknown.
///
/// Serializes as the plain string staff and downstream workflows read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RationaleEntry {
    Factor(RiskFactorCode),
    DataIncomplete(RiskFactorCode),
}

impl RationaleEntry {
    pub fn factor(self) -> Option<RiskFactorCode> {
        match self {
            RationaleEntry::Factor(code) => Some(code),
            RationaleEntry::DataIncomplete(_) => None,
        }
    }
}

impl fmt::Display for RationaleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RationaleEntry::Factor(code) => f.write_str(code.code()),
            RationaleEntry::DataIncomplete(code) => write!(
                f,
                "{DATA_INCOMPLETE_PREFIX}{}{DATA_INCOMPLETE_SUFFIX}",
                code.code()
            ),
        }
    }
}

impl FromStr for RationaleEntry {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Some(inner) = value
            .strip_prefix(DATA_INCOMPLETE_PREFIX)
            .and_then(|rest| rest.strip_suffix(DATA_INCOMPLETE_SUFFIX))
        {
            return inner.parse().map(RationaleEntry::DataIncomplete);
        }
        value.parse().map(RationaleEntry::Factor)
    }
}

impl Serialize for RationaleEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RationaleEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Scorer output for one placement. Recomputed every cycle and never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDecision {
    pub placement_id: PlacementId,
    pub score: u8,
    pub level: RiskLevel,
    pub rationale: Vec<RationaleEntry>,
    pub inputs: PlacementSnapshot,
    pub flagged: bool,
}

impl RiskDecision {
    /// Triggered factor codes in evaluation order, without data-incomplete notes.
    pub fn triggered_factors(&self) -> impl Iterator<Item = RiskFactorCode> + '_ {
        self.rationale.iter().filter_map(|entry| entry.factor())
    }
}
