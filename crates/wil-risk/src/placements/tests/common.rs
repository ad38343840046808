use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::placements::domain::{PlacementId, PlacementSnapshot, PlacementStatus, RiskDecision};
use crate::placements::fairness::FairnessAuditor;
use crate::placements::governance::{
    GovernanceRecord, GovernanceStore, GovernanceStoreError, InMemoryGovernanceStore,
};
use crate::placements::scoring::RiskScorer;
use crate::placements::service::PlacementReviewService;

/// The worked example: attendance, performance, and supervisor factors for exactly 70.
pub(super) fn at_risk_snapshot(id: &str) -> PlacementSnapshot {
    PlacementSnapshot {
        hours_required: Some(480.0),
        hours_completed: Some(100.0),
        status: Some(PlacementStatus::Active),
        attendance_recent: Some(false),
        performance_score: Some(55.0),
        supervisor_flag: Some(true),
        days_to_deadline: Some(10),
        days_since_last_activity: None,
        docs_complete: Some(true),
        ..PlacementSnapshot::new(id)
    }
}

/// Every factor known and clear.
pub(super) fn healthy_snapshot(id: &str) -> PlacementSnapshot {
    PlacementSnapshot {
        hours_required: Some(480.0),
        hours_completed: Some(400.0),
        status: Some(PlacementStatus::Active),
        attendance_recent: Some(true),
        performance_score: Some(82.0),
        supervisor_flag: Some(false),
        days_to_deadline: Some(30),
        days_since_last_activity: Some(1),
        docs_complete: Some(true),
        ..PlacementSnapshot::new(id)
    }
}

pub(super) fn located(
    mut snapshot: PlacementSnapshot,
    province: Option<&str>,
    institution: Option<&str>,
) -> PlacementSnapshot {
    snapshot.province = province.map(str::to_string);
    snapshot.institution = institution.map(str::to_string);
    snapshot
}

pub(super) fn scorer() -> RiskScorer {
    RiskScorer::default()
}

pub(super) fn flagged_decision(id: &str) -> RiskDecision {
    scorer().evaluate(&at_risk_snapshot(id))
}

pub(super) fn build_service() -> (
    PlacementReviewService<InMemoryGovernanceStore>,
    Arc<InMemoryGovernanceStore>,
) {
    let store = Arc::new(InMemoryGovernanceStore::default());
    let service =
        PlacementReviewService::new(store.clone(), RiskScorer::default(), FairnessAuditor::default());
    (service, store)
}

/// Store whose writes always lose the race.
pub(super) struct RacingStore {
    pub(super) version: u64,
}

impl GovernanceStore for RacingStore {
    fn fetch(&self, id: &PlacementId) -> Result<Option<GovernanceRecord>, GovernanceStoreError> {
        let mut record = GovernanceRecord::initial(id.clone());
        record.version = self.version;
        Ok(Some(record))
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        record: GovernanceRecord,
    ) -> Result<GovernanceRecord, GovernanceStoreError> {
        Err(GovernanceStoreError::VersionConflict {
            placement_id: record.placement_id,
            expected: expected_version,
            found: expected_version + 1,
        })
    }

    fn snapshot(&self) -> Result<HashMap<PlacementId, GovernanceRecord>, GovernanceStoreError> {
        Ok(HashMap::new())
    }
}

/// In-memory store that counts write calls.
#[derive(Default)]
pub(super) struct CountingStore {
    inner: InMemoryGovernanceStore,
    pub(super) swaps: AtomicUsize,
    pub(super) batches: AtomicUsize,
}

impl CountingStore {
    pub(super) fn writes(&self) -> (usize, usize) {
        (
            self.swaps.load(Ordering::SeqCst),
            self.batches.load(Ordering::SeqCst),
        )
    }
}

impl GovernanceStore for CountingStore {
    fn fetch(&self, id: &PlacementId) -> Result<Option<GovernanceRecord>, GovernanceStoreError> {
        self.inner.fetch(id)
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        record: GovernanceRecord,
    ) -> Result<GovernanceRecord, GovernanceStoreError> {
        self.swaps.fetch_add(1, Ordering::SeqCst);
        self.inner.compare_and_swap(expected_version, record)
    }

    fn snapshot(&self) -> Result<HashMap<PlacementId, GovernanceRecord>, GovernanceStoreError> {
        self.inner.snapshot()
    }

    fn insert_missing(&self, records: Vec<GovernanceRecord>) -> Result<usize, GovernanceStoreError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_missing(records)
    }
}

pub(super) struct UnavailableStore;

impl GovernanceStore for UnavailableStore {
    fn fetch(&self, _id: &PlacementId) -> Result<Option<GovernanceRecord>, GovernanceStoreError> {
        Err(GovernanceStoreError::Unavailable("database offline".to_string()))
    }

    fn compare_and_swap(
        &self,
        _expected_version: u64,
        _record: GovernanceRecord,
    ) -> Result<GovernanceRecord, GovernanceStoreError> {
        Err(GovernanceStoreError::Unavailable("database offline".to_string()))
    }

    fn snapshot(&self) -> Result<HashMap<PlacementId, GovernanceRecord>, GovernanceStoreError> {
        Err(GovernanceStoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
