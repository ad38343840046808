use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{PlacementSnapshot, RiskDecision};

pub const DEFAULT_DISPARITY_ALERT_POINTS: f64 = 20.0;

/// Population attribute used to bucket decisions for equity oversight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FairnessDimension {
    Province,
    Institution,
}

impl FairnessDimension {
    pub fn ordered() -> [FairnessDimension; 2] {
        [FairnessDimension::Province, FairnessDimension::Institution]
    }

    pub const fn label(self) -> &'static str {
        match self {
            FairnessDimension::Province => "province",
            FairnessDimension::Institution => "institution",
        }
    }

    /// Trimmed bucket value for a snapshot; blank values count as unknown.
    pub fn value_of(self, snapshot: &PlacementSnapshot) -> Option<&str> {
        let raw = match self {
            FairnessDimension::Province => snapshot.province.as_deref(),
            FairnessDimension::Institution => snapshot.institution.as_deref(),
        };
        raw.map(str::trim).filter(|value| !value.is_empty())
    }
}

/// Flag rate for one bucket of one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessMetric {
    pub dimension: FairnessDimension,
    pub bucket: String,
    pub flagged: usize,
    pub total: usize,
    /// Percentage rounded to one decimal place.
    pub flag_rate: f64,
}

/// Aggregates flag rates over the full, ungated decision set.
#[derive(Debug, Clone)]
pub struct FairnessAuditor {
    disparity_alert_points: f64,
}

impl Default for FairnessAuditor {
    fn default() -> Self {
        Self::new(DEFAULT_DISPARITY_ALERT_POINTS)
    }
}

impl FairnessAuditor {
    pub fn new(disparity_alert_points: f64) -> Self {
        let sanitized = if disparity_alert_points.is_finite() && disparity_alert_points >= 0.0 {
            disparity_alert_points
        } else {
            DEFAULT_DISPARITY_ALERT_POINTS
        };

        Self {
            disparity_alert_points: sanitized,
        }
    }

    pub fn disparity_alert_points(&self) -> f64 {
        self.disparity_alert_points
    }

    /// Bucket decisions by `dimension`, sorted by descending flag rate.
    ///
    /// Decisions whose dimension value is unknown are left out of every bucket.
    pub fn audit(
        &self,
        decisions: &[RiskDecision],
        dimension: FairnessDimension,
    ) -> Vec<FairnessMetric> {
        let mut buckets: BTreeMap<&str, (usize, usize)> = BTreeMap::new();

        for decision in decisions {
            let Some(bucket) = dimension.value_of(&decision.inputs) else {
                continue;
            };
            let (flagged, total) = buckets.entry(bucket).or_default();
            *total += 1;
            if decision.flagged {
                *flagged += 1;
            }
        }

        let mut metrics: Vec<FairnessMetric> = buckets
            .into_iter()
            .filter(|(_, (_, total))| *total > 0)
            .map(|(bucket, (flagged, total))| FairnessMetric {
                dimension,
                bucket: bucket.to_string(),
                flagged,
                total,
                flag_rate: flag_rate(flagged, total),
            })
            .collect();

        metrics.sort_by(|left, right| {
            right
                .flag_rate
                .total_cmp(&left.flag_rate)
                .then_with(|| left.bucket.cmp(&right.bucket))
        });

        metrics
    }

    /// Audit every dimension and log any spread above the alert threshold.
    pub fn audit_all(&self, decisions: &[RiskDecision]) -> FairnessReport {
        let report = FairnessReport {
            by_province: self.audit(decisions, FairnessDimension::Province),
            by_institution: self.audit(decisions, FairnessDimension::Institution),
        };

        for dimension in FairnessDimension::ordered() {
            if let Some(spread) = report.disparity(dimension) {
                if spread > self.disparity_alert_points {
                    warn!(
                        dimension = dimension.label(),
                        spread,
                        threshold = self.disparity_alert_points,
                        "flag rate disparity exceeds alert threshold"
                    );
                }
            }
        }

        report
    }
}

/// Fairness tables for every dimension.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FairnessReport {
    pub by_province: Vec<FairnessMetric>,
    pub by_institution: Vec<FairnessMetric>,
}

impl FairnessReport {
    pub fn metrics(&self, dimension: FairnessDimension) -> &[FairnessMetric] {
        match dimension {
            FairnessDimension::Province => &self.by_province,
            FairnessDimension::Institution => &self.by_institution,
        }
    }

    /// Gap in percentage points between the highest and lowest bucket flag rates.
    /// `None` when fewer than two buckets exist.
    pub fn disparity(&self, dimension: FairnessDimension) -> Option<f64> {
        let metrics = self.metrics(dimension);
        if metrics.len() < 2 {
            return None;
        }

        let (min, max) = metrics
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), metric| {
                (min.min(metric.flag_rate), max.max(metric.flag_rate))
            });
        Some(round_one_decimal(max - min))
    }
}

fn flag_rate(flagged: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_one_decimal(flagged as f64 / total as f64 * 100.0)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
