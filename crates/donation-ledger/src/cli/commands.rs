//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Args, Subcommand, ValueEnum};

use crate::currency::parse_amount;
use crate::ledger::{CampaignShare, ReportOrderBy, SortOrder};
use crate::posts::POST_DATE_FORMAT;
use crate::status::COMPLETED;

/// Campaign commands.
#[derive(Debug, Subcommand)]
pub enum CampaignCommand {
    /// Create a campaign
    Add {
        /// Campaign title
        title: String,

        /// Creation date (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS"), defaults to now
        #[arg(long, value_parser = parse_datetime)]
        date: Option<NaiveDateTime>,
    },

    /// Show the amount donated to one or more campaigns
    Total {
        /// Campaign ids
        #[arg(required = true)]
        campaigns: Vec<String>,

        /// Count every donation status, not just approved ones
        #[arg(short, long)]
        all: bool,

        /// Skip decimal separator normalization
        #[arg(long)]
        raw: bool,
    },

    /// List or count the donors of one or more campaigns
    Donors {
        /// Campaign ids
        #[arg(required = true)]
        campaigns: Vec<String>,

        /// Print the number of donors with approved donations instead
        #[arg(long)]
        count: bool,

        /// With --count, include donors whose donations are not approved
        #[arg(short, long, requires = "count")]
        all: bool,
    },

    /// List the ledger rows of one or more campaigns
    Donations {
        /// Campaign ids
        #[arg(required = true)]
        campaigns: Vec<String>,

        /// Print only the distinct donation ids
        #[arg(long)]
        ids: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Donation commands.
#[derive(Debug, Subcommand)]
pub enum DonationCommand {
    /// Record a donation split across one or more campaigns
    Add {
        /// Donor id
        #[arg(long)]
        donor: i64,

        /// Campaign share as ID=AMOUNT; repeat to split the donation
        #[arg(long = "campaign", value_name = "ID=AMOUNT", required = true, value_parser = parse_share)]
        shares: Vec<CampaignShare>,

        /// Initial status
        #[arg(long, default_value = COMPLETED)]
        status: String,

        /// Donation date, defaults to now
        #[arg(long, value_parser = parse_datetime)]
        date: Option<NaiveDateTime>,

        /// Donor note
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Change a donation's status
    Status {
        /// Donation id
        donation: i64,

        /// New status, e.g. charitable-refunded
        status: String,
    },

    /// Delete a donation and its ledger rows
    Delete {
        /// Donation id
        donation: i64,
    },

    /// Show the amount of one or more donations
    Amount {
        /// Donation ids
        #[arg(required = true)]
        donations: Vec<String>,

        /// Only count the shares given to these campaigns
        #[arg(long = "campaign")]
        campaigns: Vec<String>,
    },

    /// List the ledger rows of a donation
    Show {
        /// Donation id
        donation: i64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Donor commands.
#[derive(Debug, Subcommand)]
pub enum DonorCommand {
    /// Register a donor
    Add {
        /// Contact email
        email: String,

        /// Given name
        #[arg(long, default_value = "")]
        first_name: String,

        /// Family name
        #[arg(long, default_value = "")]
        last_name: String,

        /// Linked site user, 0 for guests
        #[arg(long, default_value = "0")]
        user_id: i64,
    },

    /// List a donor's ledger rows
    Donations {
        /// Donor id
        donor: i64,

        /// One row per donation even when it was split
        #[arg(long)]
        distinct: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show how much a donor has given
    Total {
        /// Donor id
        donor: i64,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Commands that edit ledger rows directly.
#[derive(Debug, Subcommand)]
pub enum RecordCommand {
    /// Insert a ledger row
    Add {
        /// Donation id
        #[arg(long)]
        donation: i64,

        /// Donor id
        #[arg(long)]
        donor: i64,

        /// Campaign id
        #[arg(long)]
        campaign: i64,

        /// Amount given to the campaign
        #[arg(long)]
        amount: String,

        /// Campaign name, defaults to the campaign's title
        #[arg(long)]
        name: Option<String>,
    },

    /// Correct a ledger row
    Update {
        /// Ledger row id
        id: i64,

        /// New donation id
        #[arg(long)]
        donation: Option<i64>,

        /// New donor id
        #[arg(long)]
        donor: Option<i64>,

        /// New campaign id
        #[arg(long)]
        campaign: Option<i64>,

        /// New amount
        #[arg(long)]
        amount: Option<String>,

        /// New campaign name
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete a ledger row
    Delete {
        /// Ledger row id
        id: i64,
    },
}

/// Total command arguments.
#[derive(Debug, Args)]
pub struct TotalCommand {
    /// Count only these statuses (repeatable), defaults to approved statuses
    #[arg(short, long = "status")]
    pub statuses: Vec<String>,
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Only these campaigns (repeatable)
    #[arg(long = "campaign")]
    pub campaigns: Vec<String>,

    /// Only donations with this status, defaults to every valid status
    #[arg(short, long)]
    pub status: Option<String>,

    /// Donations on or after this date
    #[arg(long, value_parser = parse_datetime)]
    pub since: Option<NaiveDateTime>,

    /// Donations on or before this date (a bare date includes the whole day)
    #[arg(long, value_parser = parse_end_datetime)]
    pub until: Option<NaiveDateTime>,

    /// Sort column
    #[arg(long, value_enum)]
    pub orderby: Option<OrderByArg>,

    /// Sort direction
    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Summary command arguments.
#[derive(Debug, Args)]
pub struct SummaryCommand {
    /// Period: YYYY, YYYY-MM or YYYY-MM-DD
    pub period: String,

    /// Count only these statuses (repeatable), defaults to approved statuses
    #[arg(short, long = "status")]
    pub statuses: Vec<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Report sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderByArg {
    /// Donation date
    Date,
    /// Ledger row id
    Id,
}

impl From<OrderByArg> for ReportOrderBy {
    fn from(arg: OrderByArg) -> Self {
        match arg {
            OrderByArg::Date => Self::Date,
            OrderByArg::Id => Self::Id,
        }
    }
}

/// Report sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderArg {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Asc => Self::Asc,
            OrderArg::Desc => Self::Desc,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

/// Parse `YYYY-MM-DD` (midnight) or `YYYY-MM-DD HH:MM:SS`.
fn parse_datetime(value: &str) -> Result<NaiveDateTime, String> {
    parse_date_with_default_time(value, NaiveTime::MIN)
}

/// Like [`parse_datetime`], but a bare date means the last second of that day.
fn parse_end_datetime(value: &str) -> Result<NaiveDateTime, String> {
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    parse_date_with_default_time(value, end_of_day)
}

fn parse_date_with_default_time(value: &str, time: NaiveTime) -> Result<NaiveDateTime, String> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, POST_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d").map(|d| d.and_time(time)))
        .map_err(|_| format!("invalid date '{value}': expected YYYY-MM-DD [HH:MM:SS]"))
}

/// Parse a `ID=AMOUNT` campaign share.
fn parse_share(value: &str) -> Result<CampaignShare, String> {
    let (id, amount) = value
        .split_once('=')
        .ok_or_else(|| format!("invalid share '{value}': expected ID=AMOUNT"))?;
    let campaign_id = id
        .trim()
        .parse()
        .map_err(|_| format!("invalid campaign id '{id}'"))?;
    let amount = parse_amount(amount).map_err(|e| e.to_string())?;
    Ok(CampaignShare {
        campaign_id,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_order_arg_conversion() {
        assert_eq!(ReportOrderBy::from(OrderByArg::Date), ReportOrderBy::Date);
        assert_eq!(ReportOrderBy::from(OrderByArg::Id), ReportOrderBy::Id);
        assert_eq!(SortOrder::from(OrderArg::Asc), SortOrder::Asc);
        assert_eq!(SortOrder::from(OrderArg::Desc), SortOrder::Desc);
    }

    #[test]
    fn test_parse_datetime() {
        let midnight = parse_datetime("2024-02-29").unwrap();
        assert_eq!(midnight.to_string(), "2024-02-29 00:00:00");

        let exact = parse_datetime("2024-02-29 13:45:10").unwrap();
        assert_eq!(exact.to_string(), "2024-02-29 13:45:10");

        assert!(parse_datetime("29/02/2024").is_err());
    }

    #[test]
    fn test_parse_end_datetime() {
        let end = parse_end_datetime("2024-02-29").unwrap();
        assert_eq!(end.to_string(), "2024-02-29 23:59:59");

        let exact = parse_end_datetime("2024-02-29 08:00:00").unwrap();
        assert_eq!(exact.to_string(), "2024-02-29 08:00:00");
    }

    #[test]
    fn test_parse_share() {
        let share = parse_share("12=25.50").unwrap();
        assert_eq!(share.campaign_id, 12);
        assert_eq!(share.amount, Decimal::new(2550, 2));

        let comma = parse_share("3=7,25").unwrap();
        assert_eq!(comma.amount, Decimal::new(725, 2));

        assert!(parse_share("12").is_err());
        assert!(parse_share("x=1").is_err());
        assert!(parse_share("12=lots").is_err());
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
