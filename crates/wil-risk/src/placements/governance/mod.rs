//! Consent, opt-out, and appeal state for flagged placements, and the gate deciding
//! which flags reach staff.

mod gate;
mod record;
mod store;
mod visibility;

pub use gate::{GovernanceError, GovernanceGate, TransitionContext, TransitionOutcome};
pub use record::{
    is_visible, AppealStatus, GovernanceChange, GovernanceField, GovernanceRecord,
    InvalidAppealStatus, SuppressionReason,
};
pub use store::{
    GovernanceStore, GovernanceStoreError, InMemoryGovernanceStore, JsonFileGovernanceStore,
};
pub use visibility::{filter_visible, VisibilityOutcome};
