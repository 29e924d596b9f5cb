//! Tabular donation reports and period summaries.

use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;

use crate::currency::Amount;
use crate::error::{Error, Result};
use crate::posts::format_post_date;

use super::filters::{IdList, SqlParams};

/// Which column an explicitly ordered report sorts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportOrderBy {
    /// The donation's post date.
    Date,
    /// Insertion order of the ledger rows.
    #[default]
    Id,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("ASC"),
            Self::Desc => f.write_str("DESC"),
        }
    }
}

/// Filters and ordering for [`donations_report`](super::CampaignDonations::donations_report).
///
/// With no ordering set, rows come back by post date, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportQuery {
    /// Only rows for these campaigns.
    pub campaigns: Option<IdList>,
    /// Only donations with exactly this status. Defaults to every valid status.
    pub status: Option<String>,
    /// Only donations dated at or after this instant.
    pub start_date: Option<NaiveDateTime>,
    /// Only donations dated at or before this instant.
    pub end_date: Option<NaiveDateTime>,
    /// Explicit sort column.
    pub order_by: Option<ReportOrderBy>,
    /// Explicit sort direction.
    pub order: Option<SortOrder>,
}

impl ReportQuery {
    /// The `ORDER BY` clause for this query.
    #[must_use]
    pub fn order_clause(&self) -> String {
        if self.order_by.is_none() && self.order.is_none() {
            return "ORDER BY p.post_date ASC".to_string();
        }
        let column = match self.order_by.unwrap_or_default() {
            ReportOrderBy::Date => "p.post_date",
            ReportOrderBy::Id => "cd.campaign_donation_id",
        };
        format!("ORDER BY {column} {}", self.order.unwrap_or_default())
    }

    /// Assemble the report statement.
    ///
    /// `valid_statuses` is used when no single status was requested.
    /// Returns `None` when the filters cannot match any row.
    pub(crate) fn build(&self, valid_statuses: &[String]) -> Option<(String, SqlParams)> {
        let mut params = SqlParams::default();
        let mut clauses = Vec::new();

        if let Some(campaigns) = &self.campaigns {
            if campaigns.is_empty() {
                return None;
            }
            clauses.push(format!("cd.campaign_id IN ({})", params.bind_ids(campaigns)));
        }

        match &self.status {
            Some(status) => clauses.push(format!("p.post_status = {}", params.bind(status.clone()))),
            None => {
                if valid_statuses.is_empty() {
                    return None;
                }
                clauses.push(format!(
                    "p.post_status IN ({})",
                    params.bind_strings(valid_statuses)
                ));
            }
        }

        if let Some(start) = self.start_date {
            clauses.push(format!("p.post_date >= {}", params.bind(format_post_date(start))));
        }
        if let Some(end) = self.end_date {
            clauses.push(format!("p.post_date <= {}", params.bind(format_post_date(end))));
        }

        let sql = format!(
            r"
            SELECT cd.donation_id, cd.campaign_id, cd.campaign_name, cd.amount,
                   d.email, d.first_name, d.last_name,
                   p.post_date, p.post_content, p.post_status
            FROM campaign_donations cd
            INNER JOIN donors d ON d.donor_id = cd.donor_id
            INNER JOIN posts p ON p.id = cd.donation_id
            WHERE {}
            {}
            ",
            clauses.join(" AND "),
            self.order_clause()
        );
        Some((sql, params))
    }
}

/// One line of a donations report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    /// The donation.
    pub donation_id: i64,
    /// The campaign this part of the donation went to.
    pub campaign_id: i64,
    /// Campaign title at the time of donating.
    pub campaign_name: String,
    /// Amount given to this campaign.
    pub amount: Amount,
    /// Donor email.
    pub email: String,
    /// Donor given name.
    pub first_name: String,
    /// Donor family name.
    pub last_name: String,
    /// Donation date.
    pub post_date: NaiveDateTime,
    /// Donor note.
    pub post_content: String,
    /// Donation status.
    pub post_status: String,
}

/// Amount and row count of the donations in a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    /// Sum of amounts.
    pub amount: Amount,
    /// Number of ledger rows.
    pub count: i64,
}

/// A calendar prefix of `post_date`: a year, a month or a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period(String);

impl Period {
    /// Validate a `YYYY`, `YYYY-MM` or `YYYY-MM-DD` period.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPeriod`] for anything else.
    pub fn parse(value: &str) -> Result<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^\d{4}(-\d{2}(-\d{2})?)?$").expect("Invalid period pattern")
        });

        let value = value.trim();
        if pattern.is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::InvalidPeriod(value.to_string()))
        }
    }

    /// The `LIKE` pattern matching every date in the period.
    #[must_use]
    pub fn like_pattern(&self) -> String {
        format!("{}%", self.0)
    }

    /// The period as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
