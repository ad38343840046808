use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::placements::domain::PlacementId;

/// Appeal lifecycle for a flagged placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    #[default]
    None,
    Pending,
    Approved,
    Rejected,
}

impl AppealStatus {
    pub fn ordered() -> [AppealStatus; 4] {
        [
            AppealStatus::None,
            AppealStatus::Pending,
            AppealStatus::Approved,
            AppealStatus::Rejected,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            AppealStatus::None => "none",
            AppealStatus::Pending => "pending",
            AppealStatus::Approved => "approved",
            AppealStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for AppealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid appeal status (expected none, pending, approved, or rejected)")]
pub struct InvalidAppealStatus(pub String);

impl FromStr for AppealStatus {
    type Err = InvalidAppealStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        AppealStatus::ordered()
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| InvalidAppealStatus(value.to_string()))
    }
}

/// Why a flagged decision is hidden from staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionReason {
    NoConsent,
    OptedOut,
    AppealPending,
}

impl SuppressionReason {
    pub const fn label(self) -> &'static str {
        match self {
            SuppressionReason::NoConsent => "consent not captured",
            SuppressionReason::OptedOut => "student opted out",
            SuppressionReason::AppealPending => "appeal pending",
        }
    }
}

/// Governed field touched by a transition, recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceField {
    Consent,
    OptOut,
    AppealStatus,
    AppealNote,
}

/// Audit trail entry for one field change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceChange {
    pub field: GovernanceField,
    pub from: String,
    pub to: String,
    pub actor: String,
    pub at: DateTime<Utc>,
}

/// Consent, opt-out, and appeal state for one flagged placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceRecord {
    pub placement_id: PlacementId,
    pub consented: bool,
    pub opted_out: bool,
    pub appeal_status: AppealStatus,
    #[serde(default)]
    pub appeal_note: String,
    /// Zero until the record is first persisted.
    pub version: u64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: Vec<GovernanceChange>,
}

impl GovernanceRecord {
    pub fn initial(placement_id: PlacementId) -> Self {
        Self {
            placement_id,
            consented: false,
            opted_out: false,
            appeal_status: AppealStatus::None,
            appeal_note: String::new(),
            version: 0,
            updated_at: None,
            history: Vec::new(),
        }
    }

    pub fn permits_visibility(&self) -> bool {
        is_visible(self.consented, self.opted_out, self.appeal_status)
    }

    pub fn suppression_reasons(&self) -> Vec<SuppressionReason> {
        let mut reasons = Vec::new();
        if !self.consented {
            reasons.push(SuppressionReason::NoConsent);
        }
        if self.opted_out {
            reasons.push(SuppressionReason::OptedOut);
        }
        if self.appeal_status == AppealStatus::Pending {
            reasons.push(SuppressionReason::AppealPending);
        }
        reasons
    }

    pub(crate) fn apply_consent(&mut self, consented: bool, actor: &str, at: DateTime<Utc>) -> bool {
        if self.consented == consented {
            return false;
        }
        self.log(GovernanceField::Consent, self.consented, consented, actor, at);
        self.consented = consented;
        true
    }

    pub(crate) fn apply_opt_out(
        &mut self,
        opted_out: bool,
        reason: Option<&str>,
        actor: &str,
        at: DateTime<Utc>,
    ) -> bool {
        let mut changed = false;
        if self.opted_out != opted_out {
            self.log(GovernanceField::OptOut, self.opted_out, opted_out, actor, at);
            self.opted_out = opted_out;
            changed = true;
        }
        if let Some(reason) = reason {
            changed |= self.apply_note(reason, actor, at);
        }
        changed
    }

    pub(crate) fn apply_appeal(
        &mut self,
        status: AppealStatus,
        note: Option<&str>,
        actor: &str,
        at: DateTime<Utc>,
    ) -> bool {
        let mut changed = false;
        if self.appeal_status != status {
            self.log(
                GovernanceField::AppealStatus,
                self.appeal_status,
                status,
                actor,
                at,
            );
            self.appeal_status = status;
            changed = true;
        }
        if let Some(note) = note {
            changed |= self.apply_note(note, actor, at);
        }
        changed
    }

    fn apply_note(&mut self, note: &str, actor: &str, at: DateTime<Utc>) -> bool {
        let note = note.trim();
        if self.appeal_note == note {
            return false;
        }
        let previous = std::mem::take(&mut self.appeal_note);
        self.log(GovernanceField::AppealNote, previous, note, actor, at);
        self.appeal_note = note.to_string();
        true
    }

    fn log(
        &mut self,
        field: GovernanceField,
        from: impl fmt::Display,
        to: impl fmt::Display,
        actor: &str,
        at: DateTime<Utc>,
    ) {
        self.history.push(GovernanceChange {
            field,
            from: from.to_string(),
            to: to.to_string(),
            actor: actor.to_string(),
            at,
        });
    }
}

/// Staff may see a flagged decision only with consent, no opt-out, and no pending appeal.
/// Approved and rejected appeals do not affect visibility.
pub fn is_visible(consented: bool, opted_out: bool, appeal_status: AppealStatus) -> bool {
    consented && !opted_out && appeal_status != AppealStatus::Pending
}
