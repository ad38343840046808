//! End-to-end scenarios for the placement review: roster import, scoring, fairness audit, and
//! governance gating through the public service facade and HTTP router.

mod common {
    use std::sync::Arc;

    use wil_risk::placements::{
        FairnessAuditor, GovernanceStore, PlacementReviewService, RiskScorer,
    };

    pub(super) const ROSTER_CSV: &str = "placement_id,hours_required,hours_completed,status,attendance_recent,performance_score,supervisor_flag,days_to_deadline,days_since_last_activity,docs_complete,province,institution
P-100,480,100,active,no,55,yes,10,,yes,Gauteng,University of Pretoria
P-101,480,400,active,yes,82,no,30,1,yes,Gauteng,University of Pretoria
P-102,300,0,pending,,,no,5,9,no,Western Cape,UWC
P-103,300,20,pending,yes,45,yes,5,,no,Western Cape,UWC
";

    pub(super) fn service<S: GovernanceStore>(store: Arc<S>) -> Arc<PlacementReviewService<S>> {
        Arc::new(PlacementReviewService::new(
            store,
            RiskScorer::default(),
            FairnessAuditor::default(),
        ))
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use wil_risk::placements::{
    placement_router, CsvRosterProvider, FairnessDimension, InMemoryGovernanceStore,
    JsonFileGovernanceStore, PlacementId, RiskLevel, TransitionContext,
};

use common::*;

async fn send(router: &axum::Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

#[test]
fn roster_review_scores_audits_and_gates() {
    let service = service(Arc::new(InMemoryGovernanceStore::default()));

    let report = service
        .review(&CsvRosterProvider::from_string(ROSTER_CSV))
        .expect("review");

    // P-100: 70 (high). P-102: no_response + deadline + docs = 45 (medium).
    // P-103: perf + supervisor + deadline + docs = 80 (high).
    assert_eq!(report.total_placements, 4);
    assert_eq!(report.total_flagged, 3);
    assert!(report.visible.is_empty());
    assert_eq!(report.suppressed_count, 3);

    let provinces = report.fairness.metrics(FairnessDimension::Province);
    assert_eq!(provinces[0].bucket, "Western Cape");
    assert_eq!(provinces[0].flag_rate, 100.0);
    assert_eq!(provinces[1].bucket, "Gauteng");
    assert_eq!(provinces[1].flag_rate, 50.0);

    let ctx = TransitionContext::new("coordinator@example.ac.za");
    for id in ["P-100", "P-102", "P-103"] {
        service
            .gate()
            .set_consent(&PlacementId::new(id), true, &ctx)
            .expect("consent");
    }
    service
        .gate()
        .set_opt_out(&PlacementId::new("P-103"), true, Some("declined outreach"), &ctx)
        .expect("opt out");

    let report = service
        .review(&CsvRosterProvider::from_string(ROSTER_CSV))
        .expect("review");

    let visible: Vec<_> = report
        .visible
        .iter()
        .map(|view| (view.placement_id.as_str(), view.score, view.level))
        .collect();
    assert_eq!(
        visible,
        vec![("P-100", 70, RiskLevel::High), ("P-102", 45, RiskLevel::Medium)]
    );
    assert_eq!(report.suppressed_count, 1);
    assert_eq!(
        report.visible[1].rationale,
        vec![
            "data incomplete: excluded from low_attendance calculation",
            "data incomplete: excluded from poor_performance calculation",
            "no_response",
            "deadline_risk",
            "incomplete_docs",
        ]
    );
}

#[test]
fn governance_survives_a_restart_with_the_file_store() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("governance.json");
    let ctx = TransitionContext::new("coordinator@example.ac.za");

    {
        let store = Arc::new(JsonFileGovernanceStore::open(&path).expect("open store"));
        let service = service(store);
        service
            .review(&CsvRosterProvider::from_string(ROSTER_CSV))
            .expect("review");
        service
            .gate()
            .set_consent(&PlacementId::new("P-100"), true, &ctx)
            .expect("consent");
    }

    let store = Arc::new(JsonFileGovernanceStore::open(&path).expect("reopen store"));
    let service = service(store);
    let record = service
        .gate()
        .record(&PlacementId::new("P-100"))
        .expect("record");
    assert!(record.consented);
    assert_eq!(record.version, 2);

    let report = service
        .review(&CsvRosterProvider::from_string(ROSTER_CSV))
        .expect("review");
    assert_eq!(report.visible.len(), 1);
    assert_eq!(report.visible[0].placement_id, PlacementId::new("P-100"));
}

#[tokio::test]
async fn staff_router_round_trip() {
    let router = placement_router(service(Arc::new(InMemoryGovernanceStore::default())));

    let (status, report) = send(
        &router,
        "POST",
        "/api/v1/placements/review",
        json!({ "roster_csv": ROSTER_CSV }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_flagged"], 3);
    assert_eq!(report["fairness"]["by_institution"][0]["bucket"], "UWC");

    let (status, record) = send(
        &router,
        "PUT",
        "/api/v1/placements/P-100/governance/consent",
        json!({ "consented": true, "actor": "coordinator" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["consented"], true);

    let (status, conflict) = send(
        &router,
        "PUT",
        "/api/v1/placements/P-100/governance/opt-out",
        json!({ "opted_out": true, "actor": "coordinator", "expected_version": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(conflict["error"].is_string());

    let (_, report) = send(
        &router,
        "POST",
        "/api/v1/placements/review",
        json!({ "roster_csv": ROSTER_CSV }),
    )
    .await;
    assert_eq!(report["visible"].as_array().map(Vec::len), Some(1));
    assert_eq!(report["visible"][0]["level_label"], "High risk");
}
