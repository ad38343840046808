mod config;
mod rules;

pub use config::{ScoringConfig, DEFAULT_NO_RESPONSE_WINDOW_DAYS, DEFAULT_SUSTAINABLE_DAILY_HOURS};

use super::domain::{PlacementSnapshot, RationaleEntry, RiskDecision, RiskFactorCode, RiskLevel};
use rules::{check_factor, FactorCheck};
use tracing::debug;

const MAX_SCORE: u16 = 100;

/// Stateless scorer applying the fixed factor table to placement snapshots.
///
/// Scoring is total: unknown inputs exclude their factor and leave a note in the
/// rationale rather than failing or penalizing the record.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    config: ScoringConfig,
}

impl RiskScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn evaluate(&self, snapshot: &PlacementSnapshot) -> RiskDecision {
        let mut rationale = Vec::new();
        let mut total: u16 = 0;

        for factor in RiskFactorCode::ordered() {
            match check_factor(factor, snapshot, &self.config) {
                FactorCheck::Triggered => {
                    total += u16::from(factor.weight());
                    rationale.push(RationaleEntry::Factor(factor));
                }
                FactorCheck::Excluded => rationale.push(RationaleEntry::DataIncomplete(factor)),
                FactorCheck::Clear => {}
            }
        }

        let score = total.min(MAX_SCORE) as u8;
        let level = RiskLevel::from_score(score);

        debug!(
            placement_id = %snapshot.placement_id,
            score,
            level = level.label(),
            "scored placement"
        );

        RiskDecision {
            placement_id: snapshot.placement_id.clone(),
            score,
            level,
            rationale,
            inputs: snapshot.clone(),
            flagged: level != RiskLevel::Low,
        }
    }

    /// Score a whole roster. Each record is evaluated independently.
    pub fn evaluate_roster(&self, roster: &[PlacementSnapshot]) -> Vec<RiskDecision> {
        roster.iter().map(|snapshot| self.evaluate(snapshot)).collect()
    }
}
