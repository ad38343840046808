use serde::{Deserialize, Serialize};

pub const DEFAULT_NO_RESPONSE_WINDOW_DAYS: u32 = 7;
pub const DEFAULT_SUSTAINABLE_DAILY_HOURS: f64 = 40.0;

/// Dials for the two time-based factors. Factor weights and level thresholds are fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub no_response_window_days: u32,
    pub sustainable_daily_hours: f64,
}

impl ScoringConfig {
    pub fn new(no_response_window_days: u32, sustainable_daily_hours: f64) -> Self {
        let window = if no_response_window_days == 0 {
            DEFAULT_NO_RESPONSE_WINDOW_DAYS
        } else {
            no_response_window_days
        };
        let daily = if sustainable_daily_hours.is_finite() && sustainable_daily_hours > 0.0 {
            sustainable_daily_hours
        } else {
            DEFAULT_SUSTAINABLE_DAILY_HOURS
        };

        Self {
            no_response_window_days: window,
            sustainable_daily_hours: daily,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_NO_RESPONSE_WINDOW_DAYS,
            DEFAULT_SUSTAINABLE_DAILY_HOURS,
        )
    }
}
