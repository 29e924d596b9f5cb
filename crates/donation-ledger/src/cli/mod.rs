//! Command-line interface for donation-ledger.
//!
//! This module provides the CLI structure for the `dledger` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CampaignCommand, ConfigCommand, DonationCommand, DonorCommand, OrderArg, OrderByArg,
    OutputFormat, RecordCommand, ReportCommand, StatusCommand, SummaryCommand, TotalCommand,
};

use crate::logging::Verbosity;

/// dledger - Query and maintain a campaign donations ledger
///
/// Records which donor gave how much to which campaign, and answers totals,
/// donor counts and reports over those records.
#[derive(Debug, Parser)]
#[command(name = "dledger")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create or migrate the ledger database
    Init,

    /// Show ledger statistics
    Status(StatusCommand),

    /// Manage and query campaigns
    #[command(subcommand)]
    Campaign(CampaignCommand),

    /// Manage and query donations
    #[command(subcommand)]
    Donation(DonationCommand),

    /// Manage and query donors
    #[command(subcommand)]
    Donor(DonorCommand),

    /// Edit ledger rows directly
    #[command(subcommand)]
    Record(RecordCommand),

    /// Show the amount donated across all campaigns
    Total(TotalCommand),

    /// Print a donations report
    Report(ReportCommand),

    /// Summarize donations in a year, month or day
    Summary(SummaryCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dledger").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "dledger");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["init"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["-v", "init"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["-vv", "init"]).verbosity(), Verbosity::Trace);
        assert_eq!(parse(&["-q", "init"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_campaign_total() {
        let cli = parse(&["campaign", "total", "4", "5", "--all"]);
        match cli.command {
            Command::Campaign(CampaignCommand::Total {
                campaigns,
                all,
                raw,
            }) => {
                assert_eq!(campaigns, vec!["4", "5"]);
                assert!(all);
                assert!(!raw);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_donation_add() {
        let cli = parse(&[
            "donation",
            "add",
            "--donor",
            "7",
            "--campaign",
            "1=10",
            "--campaign",
            "2=5.5",
            "--date",
            "2024-04-01",
        ]);
        match cli.command {
            Command::Donation(DonationCommand::Add {
                donor,
                shares,
                status,
                date,
                ..
            }) => {
                assert_eq!(donor, 7);
                assert_eq!(shares.len(), 2);
                assert_eq!(shares[1].campaign_id, 2);
                assert_eq!(status, "charitable-completed");
                assert!(date.is_some());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_donation_add_requires_campaign() {
        assert!(Cli::try_parse_from(["dledger", "donation", "add", "--donor", "7"]).is_err());
    }

    #[test]
    fn test_parse_report() {
        let cli = parse(&[
            "report",
            "--campaign",
            "3",
            "--since",
            "2024-01-01",
            "--orderby",
            "date",
            "--order",
            "desc",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Report(report) => {
                assert_eq!(report.campaigns, vec!["3"]);
                assert_eq!(report.orderby, Some(OrderByArg::Date));
                assert_eq!(report.order, Some(OrderArg::Desc));
                assert_eq!(report.format, OutputFormat::Json);
                assert!(report.until.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_total_statuses() {
        let cli = parse(&["total", "-s", "charitable-pending", "-s", "charitable-completed"]);
        match cli.command {
            Command::Total(total) => assert_eq!(total.statuses.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_summary() {
        let cli = parse(&["summary", "2024-03", "--json"]);
        assert!(matches!(cli.command, Command::Summary(SummaryCommand { json: true, .. })));
    }

    #[test]
    fn test_parse_record_update() {
        let cli = parse(&["record", "update", "9", "--amount", "12,5"]);
        match cli.command {
            Command::Record(RecordCommand::Update { id, amount, campaign, .. }) => {
                assert_eq!(id, 9);
                assert_eq!(amount.as_deref(), Some("12,5"));
                assert!(campaign.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_donors_all_requires_count() {
        assert!(Cli::try_parse_from(["dledger", "campaign", "donors", "1", "--all"]).is_err());
        assert!(Cli::try_parse_from(["dledger", "campaign", "donors", "1", "--count", "--all"]).is_ok());
    }
}
