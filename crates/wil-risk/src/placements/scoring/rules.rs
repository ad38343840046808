use crate::placements::domain::{PlacementSnapshot, PlacementStatus, RiskFactorCode};
use super::config::ScoringConfig;

/// Result of checking a single factor against a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FactorCheck {
    Triggered,
    Clear,
    /// Inputs were unknown or malformed; the factor neither scores nor clears.
    Excluded,
}

impl FactorCheck {
    fn from_known(condition: Option<bool>) -> Self {
        match condition {
            Some(true) => FactorCheck::Triggered,
            Some(false) => FactorCheck::Clear,
            None => FactorCheck::Excluded,
        }
    }
}

const POOR_PERFORMANCE_CUTOFF: f64 = 60.0;

pub(crate) fn check_factor(
    factor: RiskFactorCode,
    snapshot: &PlacementSnapshot,
    config: &ScoringConfig,
) -> FactorCheck {
    match factor {
        RiskFactorCode::LowAttendance => {
            FactorCheck::from_known(snapshot.attendance_recent.map(|recent| !recent))
        }
        RiskFactorCode::PoorPerformance => FactorCheck::from_known(
            known_performance(snapshot).map(|score| score < POOR_PERFORMANCE_CUTOFF),
        ),
        RiskFactorCode::NoResponse => check_no_response(snapshot, config),
        RiskFactorCode::SupervisorConcern => FactorCheck::from_known(snapshot.supervisor_flag),
        RiskFactorCode::DeadlineRisk => check_deadline(snapshot, config),
        RiskFactorCode::IncompleteDocs => {
            FactorCheck::from_known(snapshot.docs_complete.map(|complete| !complete))
        }
    }
}

fn known_performance(snapshot: &PlacementSnapshot) -> Option<f64> {
    snapshot
        .performance_score
        .filter(|score| score.is_finite() && (0.0..=100.0).contains(score))
}

fn known_hours(value: Option<f64>) -> Option<f64> {
    value.filter(|hours| hours.is_finite() && *hours >= 0.0)
}

fn check_no_response(snapshot: &PlacementSnapshot, config: &ScoringConfig) -> FactorCheck {
    match snapshot.status {
        None => FactorCheck::Excluded,
        Some(PlacementStatus::Pending) => FactorCheck::from_known(
            snapshot
                .days_since_last_activity
                .map(|idle| idle >= config.no_response_window_days),
        ),
        Some(_) => FactorCheck::Clear,
    }
}

fn check_deadline(snapshot: &PlacementSnapshot, config: &ScoringConfig) -> FactorCheck {
    let Some(required) = known_hours(snapshot.hours_required) else {
        return FactorCheck::Excluded;
    };
    if required == 0.0 {
        return FactorCheck::Clear;
    }

    let (Some(completed), Some(days)) = (
        known_hours(snapshot.hours_completed),
        snapshot.days_to_deadline,
    ) else {
        return FactorCheck::Excluded;
    };

    let remaining = required - completed;
    if remaining <= 0.0 {
        return FactorCheck::Clear;
    }

    let pace = remaining / days.max(1) as f64;
    if pace > config.sustainable_daily_hours {
        FactorCheck::Triggered
    } else {
        FactorCheck::Clear
    }
}
