use crate::report::{run_governance, run_review, GovernanceArgs, ReviewArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use wil_risk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "WIL Placement Risk Review",
    about = "Score placement rosters, audit flag rates, and manage consent from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a roster CSV and print the staff review
    Review(ReviewArgs),
    /// Apply a consent, opt-out, or appeal change to a governance store
    Governance(GovernanceArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Governance store file (defaults to GOVERNANCE_STORE_PATH, else in-memory)
    #[arg(long)]
    pub(crate) store: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Review(args) => run_review(args),
        Command::Governance(args) => run_governance(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::GovernanceChange;

    #[test]
    fn no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["wil-risk-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_governance_appeal() {
        let cli = Cli::try_parse_from([
            "wil-risk-api",
            "governance",
            "--store",
            "/tmp/governance.json",
            "--placement-id",
            "P-100",
            "--actor",
            "coordinator",
            "appeal",
            "--status",
            "pending",
            "--note",
            "student disputes flag",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Governance(args)) => {
                assert_eq!(args.placement_id, "P-100");
                assert!(args.expected_version.is_none());
                match args.change {
                    GovernanceChange::Appeal { status, note } => {
                        assert_eq!(status, "pending");
                        assert_eq!(note.as_deref(), Some("student disputes flag"));
                    }
                    other => panic!("unexpected change {other:?}"),
                }
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn review_requires_a_roster() {
        assert!(Cli::try_parse_from(["wil-risk-api", "review"]).is_err());
    }
}
