use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::domain::{PlacementId, RiskDecision, RiskLevel};
use super::fairness::{FairnessAuditor, FairnessReport};
use super::governance::{GovernanceError, GovernanceGate, GovernanceStore, SuppressionReason};
use super::presentation::{factor_presentation, level_presentation, FactorPresentation, Tone};
use super::roster::{RosterError, RosterProvider};
use super::scoring::RiskScorer;

/// Service composing the scorer, fairness auditor, and governance gate.
///
/// Nothing is cached between reviews; every call recomputes from the roster and the
/// current governance records.
pub struct PlacementReviewService<S> {
    scorer: RiskScorer,
    auditor: FairnessAuditor,
    gate: GovernanceGate<S>,
}

impl<S: GovernanceStore> PlacementReviewService<S> {
    pub fn new(store: Arc<S>, scorer: RiskScorer, auditor: FairnessAuditor) -> Self {
        Self {
            scorer,
            auditor,
            gate: GovernanceGate::new(store),
        }
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    pub fn gate(&self) -> &GovernanceGate<S> {
        &self.gate
    }

    pub fn review<P>(&self, roster: &P) -> Result<PlacementReviewReport, ReviewServiceError>
    where
        P: RosterProvider + ?Sized,
    {
        let snapshots = roster.fetch_roster()?;
        let decisions = self.scorer.evaluate_roster(&snapshots);
        Ok(self.review_decisions(&decisions)?)
    }

    /// Build the staff report from already-scored decisions.
    pub fn review_decisions(
        &self,
        decisions: &[RiskDecision],
    ) -> Result<PlacementReviewReport, GovernanceError> {
        let fairness = self.auditor.audit_all(decisions);
        let visibility = self.gate.visible(decisions)?;

        info!(
            placements = decisions.len(),
            flagged = visibility.total_flagged,
            visible = visibility.visible.len(),
            suppressed = visibility.suppressed_count,
            "placement review computed"
        );

        let suppression_breakdown = visibility
            .suppression_breakdown
            .iter()
            .map(|(reason, count)| SuppressionCountView {
                reason: *reason,
                label: reason.label(),
                count: *count,
            })
            .collect();

        Ok(PlacementReviewReport {
            generated_at: Utc::now(),
            total_placements: decisions.len(),
            total_flagged: visibility.total_flagged,
            visible: visibility.visible.iter().map(RiskDecisionView::from).collect(),
            suppressed_count: visibility.suppressed_count,
            suppression_breakdown,
            fairness,
        })
    }
}

/// Error raised by the review service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Governance(#[from] GovernanceError),
}

/// Everything the staff review screen renders for one refresh.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementReviewReport {
    pub generated_at: DateTime<Utc>,
    pub total_placements: usize,
    pub total_flagged: usize,
    pub visible: Vec<RiskDecisionView>,
    pub suppressed_count: usize,
    pub suppression_breakdown: Vec<SuppressionCountView>,
    pub fairness: FairnessReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuppressionCountView {
    pub reason: SuppressionReason,
    pub label: &'static str,
    pub count: usize,
}

/// Staff-facing view of a visible decision.
#[derive(Debug, Clone, Serialize)]
pub struct RiskDecisionView {
    pub placement_id: PlacementId,
    pub score: u8,
    pub level: RiskLevel,
    pub level_label: &'static str,
    pub level_tone: Tone,
    pub rationale: Vec<String>,
    pub factors: Vec<FactorPresentation>,
}

impl From<&RiskDecision> for RiskDecisionView {
    fn from(decision: &RiskDecision) -> Self {
        let (level_label, level_tone) = level_presentation(decision.level);
        Self {
            placement_id: decision.placement_id.clone(),
            score: decision.score,
            level: decision.level,
            level_label,
            level_tone,
            rationale: decision.rationale.iter().map(ToString::to_string).collect(),
            factors: decision.triggered_factors().map(factor_presentation).collect(),
        }
    }
}
