//! Risk scoring, fairness oversight, and consent-gated visibility for
//! work-integrated-learning placements.

pub mod config;
pub mod error;
pub mod placements;
pub mod telemetry;
