use crate::infra::{review_service, store_path, ConfiguredStore};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use wil_risk::config::{AppConfig, ConfigError};
use wil_risk::error::AppError;
use wil_risk::placements::{
    CsvRosterProvider, FairnessDimension, GovernanceRecord, PlacementId, PlacementReviewReport,
    TransitionContext, TransitionOutcome,
};

#[derive(Args, Debug)]
pub(crate) struct ReviewArgs {
    /// Roster CSV export with one placement snapshot per row
    #[arg(long)]
    pub(crate) roster: PathBuf,
    /// Governance store file (defaults to GOVERNANCE_STORE_PATH, else in-memory)
    #[arg(long)]
    pub(crate) store: Option<PathBuf>,
    /// Print the full report as JSON instead of the summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct GovernanceArgs {
    /// Governance store file (defaults to GOVERNANCE_STORE_PATH)
    #[arg(long)]
    pub(crate) store: Option<PathBuf>,
    #[arg(long)]
    pub(crate) placement_id: String,
    /// Staff member recorded in the change history
    #[arg(long)]
    pub(crate) actor: String,
    /// Reject the change unless the stored record is at this version
    #[arg(long)]
    pub(crate) expected_version: Option<u64>,
    #[command(subcommand)]
    pub(crate) change: GovernanceChange,
}

#[derive(Subcommand, Debug)]
pub(crate) enum GovernanceChange {
    /// Record (or with --revoke, withdraw) consent to staff review
    Consent {
        #[arg(long)]
        revoke: bool,
    },
    /// Opt the student out of staff review (or back in with --revert)
    OptOut {
        #[arg(long)]
        revert: bool,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Set the appeal status: none, pending, approved, or rejected
    Appeal {
        #[arg(long)]
        status: String,
        #[arg(long)]
        note: Option<String>,
    },
}

pub(crate) fn run_review(args: ReviewArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = ConfiguredStore::open(store_path(args.store.as_deref(), &config))?;
    let service = review_service(&config.risk, Arc::new(store));

    let report = service.review(&CsvRosterProvider::from_path(&args.roster))?;

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Report payload unavailable: {err}"),
        }
    } else {
        render_review(&report, config.risk.disparity_alert_points);
    }

    Ok(())
}

pub(crate) fn run_governance(args: GovernanceArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let path = store_path(args.store.as_deref(), &config).ok_or(ConfigError::MissingValue {
        key: "GOVERNANCE_STORE_PATH",
    })?;
    let store = ConfiguredStore::open(Some(path))?;
    let service = review_service(&config.risk, Arc::new(store));
    let gate = service.gate();

    let id = PlacementId::new(args.placement_id);
    let mut ctx = TransitionContext::new(args.actor);
    if let Some(version) = args.expected_version {
        ctx = ctx.expecting(version);
    }

    let outcome = match args.change {
        GovernanceChange::Consent { revoke } => TransitionOutcome::Applied {
            record: gate.set_consent(&id, !revoke, &ctx)?,
        },
        GovernanceChange::OptOut { revert, reason } => TransitionOutcome::Applied {
            record: gate.set_opt_out(&id, !revert, reason.as_deref(), &ctx)?,
        },
        GovernanceChange::Appeal { status, note } => {
            gate.apply_appeal_input(&id, &status, note.as_deref(), &ctx)?
        }
    };

    if let TransitionOutcome::Ignored { reason, .. } = &outcome {
        println!("Change ignored: {reason}");
    }
    render_record(outcome.record());
    Ok(())
}

fn render_review(report: &PlacementReviewReport, disparity_alert_points: f64) {
    println!(
        "Placement risk review ({})",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!(
        "- {} placements | {} flagged | {} visible to staff | {} suppressed",
        report.total_placements,
        report.total_flagged,
        report.visible.len(),
        report.suppressed_count
    );
    for entry in &report.suppression_breakdown {
        println!("  - {}: {}", entry.label, entry.count);
    }

    if report.visible.is_empty() {
        println!("\nIntervention queue: empty");
    } else {
        println!("\nIntervention queue:");
        for view in &report.visible {
            println!(
                "- {} | score {} | {}",
                view.placement_id, view.score, view.level_label
            );
            for line in &view.rationale {
                println!("    - {line}");
            }
        }
    }

    for dimension in FairnessDimension::ordered() {
        let metrics = report.fairness.metrics(dimension);
        println!("\nFlag rate by {} (all placements)", dimension.label());
        if metrics.is_empty() {
            println!("  no {} data", dimension.label());
            continue;
        }
        for metric in metrics {
            println!(
                "  - {}: {}/{} flagged ({:.1}%)",
                metric.bucket, metric.flagged, metric.total, metric.flag_rate
            );
        }
        if let Some(spread) = report.fairness.disparity(dimension) {
            let marker = if spread > disparity_alert_points {
                " (review for bias)"
            } else {
                ""
            };
            println!("  spread {spread:.1} points{marker}");
        }
    }
}

fn render_record(record: &GovernanceRecord) {
    let updated = record
        .updated_at
        .map(|at| at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| "never".to_string());

    println!(
        "{} v{} | consented={} opted_out={} appeal={} | updated {}",
        record.placement_id,
        record.version,
        record.consented,
        record.opted_out,
        record.appeal_status,
        updated
    );
    if !record.appeal_note.is_empty() {
        println!("  note: {}", record.appeal_note);
    }
    println!(
        "  visible to staff when flagged: {}",
        if record.permits_visibility() { "yes" } else { "no" }
    );
}
