//! Display metadata for the review UI, keyed by the stable codes the scorer emits.
//! Scoring never reads from here.

use serde::Serialize;

use super::domain::{RiskFactorCode, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Caution,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FactorPresentation {
    pub code: RiskFactorCode,
    pub label: &'static str,
    pub tone: Tone,
}

pub fn factor_presentation(code: RiskFactorCode) -> FactorPresentation {
    let (label, tone) = match code {
        RiskFactorCode::LowAttendance => ("Low recent attendance", Tone::Caution),
        RiskFactorCode::PoorPerformance => ("Performance below 60", Tone::Critical),
        RiskFactorCode::NoResponse => ("No response while pending", Tone::Caution),
        RiskFactorCode::SupervisorConcern => ("Supervisor raised a concern", Tone::Critical),
        RiskFactorCode::DeadlineRisk => ("Hours behind deadline pace", Tone::Caution),
        RiskFactorCode::IncompleteDocs => ("Documents incomplete", Tone::Neutral),
    };

    FactorPresentation { code, label, tone }
}

pub fn level_presentation(level: RiskLevel) -> (&'static str, Tone) {
    match level {
        RiskLevel::Low => ("Low risk", Tone::Neutral),
        RiskLevel::Medium => ("Medium risk", Tone::Caution),
        RiskLevel::High => ("High risk", Tone::Critical),
    }
}
