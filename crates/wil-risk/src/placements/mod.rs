//! Placement risk review: scoring, fairness audit, and the governance gate that decides
//! which flags staff may see.
//!
//! Evaluation runs leaves first on every refresh: snapshots are scored, the full decision
//! set is audited for disparate flag rates, and only then is the governance gate applied
//! to produce the staff-visible subset.

pub mod domain;
pub mod fairness;
pub mod governance;
pub mod presentation;
pub mod roster;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    PlacementId, PlacementSnapshot, PlacementStatus, RationaleEntry, RiskDecision,
    RiskFactorCode, RiskLevel,
};
pub use fairness::{FairnessAuditor, FairnessDimension, FairnessMetric, FairnessReport};
pub use governance::{
    filter_visible, AppealStatus, GovernanceChange, GovernanceError, GovernanceField,
    GovernanceGate, GovernanceRecord, GovernanceStore, GovernanceStoreError,
    InMemoryGovernanceStore, JsonFileGovernanceStore, SuppressionReason, TransitionContext,
    TransitionOutcome, VisibilityOutcome,
};
pub use roster::{CsvRosterProvider, InlineRoster, RosterError, RosterProvider};
pub use router::placement_router;
pub use scoring::{RiskScorer, ScoringConfig};
pub use service::{
    PlacementReviewReport, PlacementReviewService, ReviewServiceError, RiskDecisionView,
};
