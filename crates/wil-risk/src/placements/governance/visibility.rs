use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::placements::domain::{PlacementId, RationaleEntry, RiskDecision};
use super::record::{GovernanceRecord, SuppressionReason};

/// Staff-visible subset of the flagged decisions plus how many were held back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibilityOutcome {
    pub visible: Vec<RiskDecision>,
    pub total_flagged: usize,
    pub suppressed_count: usize,
    /// Suppressed decisions per reason; a decision with several reasons counts under each.
    pub suppression_breakdown: BTreeMap<SuppressionReason, usize>,
}

impl VisibilityOutcome {
    /// `(placement id, rationale)` pairs handed to the intervention workflow.
    pub fn intervention_queue(&self) -> impl Iterator<Item = (&PlacementId, &[RationaleEntry])> {
        self.visible
            .iter()
            .map(|decision| (&decision.placement_id, decision.rationale.as_slice()))
    }
}

/// Apply the consent gate to `decisions`.
///
/// Only flagged decisions are considered. A decision without a record is treated as the
/// initial state and is therefore hidden until consent is captured.
pub fn filter_visible(
    decisions: &[RiskDecision],
    records: &HashMap<PlacementId, GovernanceRecord>,
) -> VisibilityOutcome {
    let mut visible = Vec::new();
    let mut total_flagged = 0;
    let mut suppression_breakdown = BTreeMap::new();

    for decision in decisions.iter().filter(|decision| decision.flagged) {
        total_flagged += 1;

        let reasons = match records.get(&decision.placement_id) {
            Some(record) => record.suppression_reasons(),
            None => GovernanceRecord::initial(decision.placement_id.clone()).suppression_reasons(),
        };

        if reasons.is_empty() {
            visible.push(decision.clone());
        } else {
            for reason in reasons {
                *suppression_breakdown.entry(reason).or_insert(0) += 1;
            }
        }
    }

    let suppressed_count = total_flagged - visible.len();

    VisibilityOutcome {
        visible,
        total_flagged,
        suppressed_count,
        suppression_breakdown,
    }
}
