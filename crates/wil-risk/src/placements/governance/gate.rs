use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::placements::domain::{PlacementId, RiskDecision};
use super::record::{AppealStatus, GovernanceRecord};
use super::store::{GovernanceStore, GovernanceStoreError};
use super::visibility::{filter_visible, VisibilityOutcome};

const MAX_WRITE_ATTEMPTS: usize = 5;

/// Who is making a change, and optionally which record version they last saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionContext {
    pub actor: String,
    pub expected_version: Option<u64>,
}

impl TransitionContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            expected_version: None,
        }
    }

    /// Fail with a conflict instead of retrying if the record moved past `version`.
    pub fn expecting(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Result of a transition request that may be refused as invalid input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    Applied { record: GovernanceRecord },
    Ignored { record: GovernanceRecord, reason: String },
}

impl TransitionOutcome {
    pub fn record(&self) -> &GovernanceRecord {
        match self {
            TransitionOutcome::Applied { record } | TransitionOutcome::Ignored { record, .. } => {
                record
            }
        }
    }

    pub fn applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }
}

/// Error raised by governance transitions.
#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    #[error("governance record for {placement_id} is at version {found}, expected {expected}")]
    Conflict {
        placement_id: PlacementId,
        expected: u64,
        found: u64,
    },
    #[error(transparent)]
    Store(GovernanceStoreError),
}

impl From<GovernanceStoreError> for GovernanceError {
    fn from(value: GovernanceStoreError) -> Self {
        match value {
            GovernanceStoreError::VersionConflict {
                placement_id,
                expected,
                found,
            } => GovernanceError::Conflict {
                placement_id,
                expected,
                found,
            },
            other => GovernanceError::Store(other),
        }
    }
}

/// Owns governance records and decides which flagged decisions staff may see.
///
/// Every transition is an independent, idempotent field set applied as an atomic upsert
/// keyed by placement id. Writes to different ids never contend.
pub struct GovernanceGate<S> {
    store: Arc<S>,
}

impl<S> Clone for GovernanceGate<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: GovernanceStore> GovernanceGate<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Current record, or the unpersisted initial state if none exists yet.
    pub fn record(&self, id: &PlacementId) -> Result<GovernanceRecord, GovernanceError> {
        Ok(self
            .store
            .fetch(id)?
            .unwrap_or_else(|| GovernanceRecord::initial(id.clone())))
    }

    pub fn set_consent(
        &self,
        id: &PlacementId,
        consented: bool,
        ctx: &TransitionContext,
    ) -> Result<GovernanceRecord, GovernanceError> {
        self.transition(id, ctx, "consent", |record, actor, at| {
            record.apply_consent(consented, actor, at)
        })
    }

    /// Set the opt-out flag. `reason` is stored in the appeal note as context only and
    /// does not touch the appeal status.
    pub fn set_opt_out(
        &self,
        id: &PlacementId,
        opted_out: bool,
        reason: Option<&str>,
        ctx: &TransitionContext,
    ) -> Result<GovernanceRecord, GovernanceError> {
        self.transition(id, ctx, "opt_out", |record, actor, at| {
            record.apply_opt_out(opted_out, reason, actor, at)
        })
    }

    pub fn set_appeal_status(
        &self,
        id: &PlacementId,
        status: AppealStatus,
        note: Option<&str>,
        ctx: &TransitionContext,
    ) -> Result<GovernanceRecord, GovernanceError> {
        self.transition(id, ctx, "appeal_status", |record, actor, at| {
            record.apply_appeal(status, note, actor, at)
        })
    }

    /// Apply an appeal status received as free text. Values outside the four known
    /// statuses are logged and ignored; the stored record is left untouched.
    pub fn apply_appeal_input(
        &self,
        id: &PlacementId,
        raw_status: &str,
        note: Option<&str>,
        ctx: &TransitionContext,
    ) -> Result<TransitionOutcome, GovernanceError> {
        match raw_status.parse::<AppealStatus>() {
            Ok(status) => {
                let record = self.set_appeal_status(id, status, note, ctx)?;
                Ok(TransitionOutcome::Applied { record })
            }
            Err(err) => {
                warn!(
                    placement_id = %id,
                    actor = %ctx.actor,
                    raw_status,
                    "ignoring invalid appeal status"
                );
                Ok(TransitionOutcome::Ignored {
                    record: self.record(id)?,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Create the initial record for every flagged decision that has none, as one batch.
    /// Records are never removed when a placement stops being flagged.
    pub fn register_flags(&self, decisions: &[RiskDecision]) -> Result<usize, GovernanceError> {
        let stored = self.store.snapshot()?;
        let now = Utc::now();
        let mut pending = HashSet::new();
        let missing: Vec<_> = decisions
            .iter()
            .filter(|decision| decision.flagged)
            .filter(|decision| !stored.contains_key(&decision.placement_id))
            .filter(|decision| pending.insert(decision.placement_id.clone()))
            .map(|decision| {
                let mut record = GovernanceRecord::initial(decision.placement_id.clone());
                record.version = 1;
                record.updated_at = Some(now);
                record
            })
            .collect();

        if missing.is_empty() {
            return Ok(0);
        }
        // Ids another session created in the meantime keep their state.
        let created = self.store.insert_missing(missing)?;
        debug!(created, "registered governance records for new flags");
        Ok(created)
    }

    /// Staff-visible subset of `decisions` under the current governance state.
    pub fn visible(
        &self,
        decisions: &[RiskDecision],
    ) -> Result<VisibilityOutcome, GovernanceError> {
        self.register_flags(decisions)?;
        let records = self.store.snapshot()?;
        Ok(filter_visible(decisions, &records))
    }

    fn transition<F>(
        &self,
        id: &PlacementId,
        ctx: &TransitionContext,
        operation: &'static str,
        mutate: F,
    ) -> Result<GovernanceRecord, GovernanceError>
    where
        F: Fn(&mut GovernanceRecord, &str, DateTime<Utc>) -> bool,
    {
        let mut last_conflict = (0, 0);

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.store.fetch(id)?;
            let stored_version = current.as_ref().map_or(0, |record| record.version);

            if let Some(expected) = ctx.expected_version {
                if expected != stored_version {
                    return Err(GovernanceError::Conflict {
                        placement_id: id.clone(),
                        expected,
                        found: stored_version,
                    });
                }
            }

            let mut record = current.unwrap_or_else(|| GovernanceRecord::initial(id.clone()));
            let now = Utc::now();
            let changed = mutate(&mut record, &ctx.actor, now);
            // A no-op never writes; for an unknown id the caller gets the unpersisted
            // initial record, exactly as `record` would return it.
            if !changed {
                return Ok(record);
            }

            record.version = stored_version + 1;
            record.updated_at = Some(now);

            match self.store.compare_and_swap(stored_version, record) {
                Ok(saved) => {
                    info!(
                        placement_id = %id,
                        actor = %ctx.actor,
                        operation,
                        version = saved.version,
                        "governance transition applied"
                    );
                    return Ok(saved);
                }
                Err(GovernanceStoreError::VersionConflict { found, .. })
                    if ctx.expected_version.is_none() =>
                {
                    last_conflict = (stored_version, found);
                    warn!(
                        placement_id = %id,
                        operation,
                        attempt,
                        "governance write raced another session; retrying"
                    );
                }
                Err(other) => return Err(other.into()),
            }
        }

        let (expected, found) = last_conflict;
        Err(GovernanceError::Conflict {
            placement_id: id.clone(),
            expected,
            found,
        })
    }
}
