use super::common::*;
use crate::placements::domain::{PlacementId, RiskLevel};
use crate::placements::fairness::FairnessDimension;
use crate::placements::governance::{GovernanceStore, SuppressionReason, TransitionContext};
use crate::placements::presentation::Tone;
use crate::placements::roster::{CsvRosterProvider, InlineRoster};
use crate::placements::service::ReviewServiceError;

fn roster() -> InlineRoster {
    InlineRoster(vec![
        located(at_risk_snapshot("P-1"), Some("Gauteng"), Some("Wits")),
        located(at_risk_snapshot("P-2"), Some("Gauteng"), Some("Wits")),
        located(healthy_snapshot("P-3"), Some("Limpopo"), Some("UL")),
    ])
}

#[test]
fn review_reports_totals_and_suppression() {
    let (service, store) = build_service();
    service
        .gate()
        .set_consent(&PlacementId::new("P-2"), true, &TransitionContext::new("coordinator"))
        .expect("consent");

    let report = service.review(&roster()).expect("review");

    assert_eq!(report.total_placements, 3);
    assert_eq!(report.total_flagged, 2);
    assert_eq!(report.suppressed_count, 1);
    assert_eq!(report.visible.len(), 1);
    assert_eq!(report.suppression_breakdown.len(), 1);
    assert_eq!(report.suppression_breakdown[0].reason, SuppressionReason::NoConsent);
    assert_eq!(report.suppression_breakdown[0].count, 1);

    let view = &report.visible[0];
    assert_eq!(view.placement_id, PlacementId::new("P-2"));
    assert_eq!(view.level, RiskLevel::High);
    assert_eq!(view.level_tone, Tone::Critical);
    assert_eq!(view.factors.len(), 3);

    let records = store.snapshot().expect("snapshot");
    assert_eq!(records.len(), 2);
    assert!(!records.contains_key(&PlacementId::new("P-3")));
}

#[test]
fn fairness_counts_every_decision_regardless_of_consent() {
    let (service, _) = build_service();

    let report = service.review(&roster()).expect("review");

    assert!(report.visible.is_empty());
    let gauteng = &report.fairness.metrics(FairnessDimension::Province)[0];
    assert_eq!(gauteng.bucket, "Gauteng");
    assert_eq!((gauteng.flagged, gauteng.total), (2, 2));
    assert_eq!(gauteng.flag_rate, 100.0);
    assert_eq!(report.fairness.disparity(FairnessDimension::Province), Some(100.0));
}

#[test]
fn review_reads_csv_rosters() {
    let (service, _) = build_service();
    let csv = "placement_id,status,days_since_last_activity,hours_required,province\nP-10,pending,12,0,Gauteng\n";

    let report = service
        .review(&CsvRosterProvider::from_string(csv))
        .expect("review");

    assert_eq!(report.total_placements, 1);
    assert_eq!(report.total_flagged, 0);
    assert_eq!(report.fairness.by_province[0].total, 1);
}

#[test]
fn missing_roster_file_is_a_roster_error() {
    let (service, _) = build_service();

    match service.review(&CsvRosterProvider::from_path("/nonexistent/roster.csv")) {
        Err(ReviewServiceError::Roster(_)) => {}
        other => panic!("expected roster error, got {other:?}"),
    }
}
