//! Queries over the `campaign_donations` ledger table.

use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::cache::DonationsCache;
use crate::currency::{self, from_database_amount, to_database_amount, Amount, CurrencyNormalizer};
use crate::error::Result;
use crate::posts::{parse_post_date, Posts};
use crate::status::StatusPolicy;
use crate::table::{Assignments, Table};

use super::filters::{Column, IdList, SqlParams, StatusFilter};
use super::report::{Period, PeriodSummary, ReportQuery, ReportRow};

const RECORD_COLUMNS: &str =
    "campaign_donation_id, donation_id, donor_id, campaign_id, campaign_name, amount";

/// One ledger row: the part of a donation that went to one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignDonation {
    /// Primary key.
    pub campaign_donation_id: i64,
    /// The donation post.
    pub donation_id: i64,
    /// The donor.
    pub donor_id: i64,
    /// The campaign post.
    pub campaign_id: i64,
    /// Campaign title when the row was written.
    pub campaign_name: String,
    /// Amount given to the campaign.
    pub amount: Amount,
}

/// Data for a new ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCampaignDonation {
    /// The donation post.
    pub donation_id: i64,
    /// The donor.
    pub donor_id: i64,
    /// The campaign post.
    pub campaign_id: i64,
    /// Campaign title; looked up from the campaign post when `None`.
    pub campaign_name: Option<String>,
    /// Amount given to the campaign.
    pub amount: Decimal,
}

/// Corrections to an existing ledger row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignDonationChanges {
    /// Move the row to another donation.
    pub donation_id: Option<i64>,
    /// Attribute the row to another donor.
    pub donor_id: Option<i64>,
    /// Move the row to another campaign.
    pub campaign_id: Option<i64>,
    /// Replace the campaign name snapshot.
    pub campaign_name: Option<String>,
    /// Replace the amount.
    pub amount: Option<Decimal>,
}

/// The donation ledger query service.
///
/// Borrows the connection and its collaborators; every method issues a
/// single prepared statement unless noted otherwise.
#[derive(Debug, Clone, Copy)]
pub struct CampaignDonations<'a> {
    conn: &'a Connection,
    currency: &'a dyn CurrencyNormalizer,
    cache: &'a dyn DonationsCache,
    statuses: &'a dyn StatusPolicy,
}

impl<'a> CampaignDonations<'a> {
    /// Wire the service to a connection and its collaborators.
    #[must_use]
    pub fn new(
        conn: &'a Connection,
        currency: &'a dyn CurrencyNormalizer,
        cache: &'a dyn DonationsCache,
        statuses: &'a dyn StatusPolicy,
    ) -> Self {
        Self {
            conn,
            currency,
            cache,
            statuses,
        }
    }

    // === Writes ===

    /// Delete every ledger row of a donation.
    ///
    /// Flushes the cache of each campaign the donation touched. Returns the
    /// number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_donation_records(&self, donation_id: i64) -> Result<usize> {
        let campaigns = self.campaigns_for_donation(donation_id)?;

        let affected = self.conn.execute(
            "DELETE FROM campaign_donations WHERE donation_id = ?1",
            [donation_id],
        )?;
        for campaign_id in campaigns {
            self.cache.flush_donations_cache(campaign_id);
        }
        debug!(
            "Deleted {} ledger rows for donation {}",
            affected, donation_id
        );
        Ok(affected)
    }

    // === Totals ===

    /// Total donated across all campaigns.
    ///
    /// Only donations whose status is in `statuses` count; an empty slice
    /// means the approval statuses.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn total(&self, statuses: &[String]) -> Result<Amount> {
        let requested = if statuses.is_empty() {
            self.statuses.approval_statuses()
        } else {
            statuses
        };
        let filter = StatusFilter::from_request(self.statuses, requested);
        if filter.matches_nothing() {
            return Ok(self.amount(0));
        }

        let mut params = SqlParams::default();
        let status_clause = params.status_clause(&filter);
        let sql = format!(
            r"
            SELECT COALESCE(SUM(cd.amount), 0)
            FROM campaign_donations cd
            INNER JOIN posts p ON p.id = cd.donation_id
            WHERE 1 = 1 {status_clause}
            "
        );

        let raw = self.query_sum(&sql, &params)?;
        Ok(self.amount(raw))
    }

    /// Total donated to one or more campaigns.
    ///
    /// Counts approval statuses only unless `include_all`. With `sanitize`
    /// false the amount is returned without separator normalization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn campaign_donated_amount(
        &self,
        campaigns: impl Into<IdList>,
        include_all: bool,
        sanitize: bool,
    ) -> Result<Amount> {
        let campaigns = campaigns.into();
        let filter = StatusFilter::approval_unless(self.statuses, include_all);
        if campaigns.is_empty() || filter.matches_nothing() {
            return Ok(self.amount(0));
        }

        let mut params = SqlParams::default();
        let campaigns_in = params.bind_ids(&campaigns);
        let status_clause = params.status_clause(&filter);
        let sql = format!(
            r"
            SELECT COALESCE(SUM(cd.amount), 0)
            FROM campaign_donations cd
            INNER JOIN posts p ON p.id = cd.donation_id
            WHERE cd.campaign_id IN ({campaigns_in})
            {status_clause}
            "
        );

        let raw = self.query_sum(&sql, &params)?;
        if sanitize {
            Ok(self.amount(raw))
        } else {
            Ok(Amount::new(from_database_amount(raw)))
        }
    }

    /// Amount of one or more donations, optionally limited to some campaigns.
    ///
    /// Status is not considered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn donation_amount(
        &self,
        donations: impl Into<IdList>,
        campaigns: Option<IdList>,
    ) -> Result<Amount> {
        let donations = donations.into();
        if donations.is_empty() || campaigns.as_ref().is_some_and(IdList::is_empty) {
            return Ok(self.amount(0));
        }

        let mut params = SqlParams::default();
        let mut where_clause = format!("donation_id IN ({})", params.bind_ids(&donations));
        if let Some(campaigns) = &campaigns {
            where_clause.push_str(&format!(
                " AND campaign_id IN ({})",
                params.bind_ids(campaigns)
            ));
        }

        let sql = format!(
            "SELECT COALESCE(SUM(amount), 0) FROM campaign_donations WHERE {where_clause}"
        );
        let raw = self.query_sum(&sql, &params)?;
        Ok(self.amount(raw))
    }

    /// Full amount of a single donation across all its campaigns.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn donation_total_amount(&self, donation_id: i64) -> Result<Amount> {
        self.donation_amount(donation_id, None)
    }

    /// Total given by a donor, regardless of status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn total_donated_by_donor(&self, donor_id: i64) -> Result<Amount> {
        let raw: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM campaign_donations WHERE donor_id = ?1",
            [donor_id],
            |row| row.get(0),
        )?;
        Ok(self.amount(raw))
    }

    /// Amount and row count of donations dated within a period.
    ///
    /// An empty `statuses` slice means the approval statuses.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn summary_by_period(&self, period: &Period, statuses: &[String]) -> Result<PeriodSummary> {
        let requested = if statuses.is_empty() {
            self.statuses.approval_statuses()
        } else {
            statuses
        };
        let filter = StatusFilter::from_request(self.statuses, requested);
        if filter.matches_nothing() {
            return Ok(PeriodSummary {
                amount: self.amount(0),
                count: 0,
            });
        }

        let mut params = SqlParams::default();
        let period_param = params.bind(period.like_pattern());
        let status_clause = params.status_clause(&filter);
        let sql = format!(
            r"
            SELECT COALESCE(SUM(cd.amount), 0), COUNT(cd.donation_id)
            FROM campaign_donations cd
            INNER JOIN posts p ON p.id = cd.donation_id
            WHERE p.post_date LIKE {period_param}
            {status_clause}
            "
        );

        let (raw, count): (i64, i64) =
            self.conn
                .query_row(&sql, params.as_params(), |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(PeriodSummary {
            amount: self.amount(raw),
            count,
        })
    }

    // === Counts ===

    /// Number of distinct donors to one or more campaigns.
    ///
    /// Counts approval statuses only unless `include_all`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_campaign_donors(
        &self,
        campaigns: impl Into<IdList>,
        include_all: bool,
    ) -> Result<i64> {
        let campaigns = campaigns.into();
        let filter = StatusFilter::approval_unless(self.statuses, include_all);
        if campaigns.is_empty() || filter.matches_nothing() {
            return Ok(0);
        }

        let mut params = SqlParams::default();
        let campaigns_in = params.bind_ids(&campaigns);
        let status_clause = params.status_clause(&filter);
        let sql = format!(
            r"
            SELECT COUNT(DISTINCT cd.donor_id)
            FROM campaign_donations cd
            INNER JOIN posts p ON p.id = cd.donation_id
            WHERE cd.campaign_id IN ({campaigns_in})
            {status_clause}
            "
        );
        self.query_count(&sql, &params)
    }

    /// Number of ledger rows for a donor, or of distinct donations if `distinct`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_donations_by_donor(&self, donor_id: i64, distinct: bool) -> Result<i64> {
        let counted = if distinct {
            "DISTINCT donation_id"
        } else {
            "donation_id"
        };
        let count = self.conn.query_row(
            &format!("SELECT COUNT({counted}) FROM campaign_donations WHERE donor_id = ?1"),
            [donor_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Number of distinct campaigns a donor has given to.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_campaigns_supported_by_donor(&self, donor_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(DISTINCT campaign_id) FROM campaign_donations WHERE donor_id = ?1",
            [donor_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Number of ledger rows whose donation has one of the given statuses.
    ///
    /// An empty slice counts every row that has a donation post.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_donations_by_status(&self, statuses: &[String]) -> Result<i64> {
        let filter = StatusFilter::from_request(self.statuses, statuses);
        if filter.matches_nothing() {
            return Ok(0);
        }

        let mut params = SqlParams::default();
        let status_clause = params.status_clause(&filter);
        let sql = format!(
            r"
            SELECT COUNT(*)
            FROM campaign_donations cd
            INNER JOIN posts p ON p.id = cd.donation_id
            WHERE 1 = 1 {status_clause}
            "
        );
        self.query_count(&sql, &params)
    }

    /// Total number of ledger rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM campaign_donations", [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    // === Id lists ===

    /// Distinct values of `field` over rows whose `where_field` is in `ids`.
    ///
    /// Returns `Ok(None)` without querying when either field name is not a
    /// ledger id column.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn distinct_ids(
        &self,
        field: &str,
        ids: impl Into<IdList>,
        where_field: &str,
    ) -> Result<Option<Vec<i64>>> {
        let (Some(select), Some(filter)) = (Column::sanitize(field), Column::sanitize(where_field))
        else {
            return Ok(None);
        };
        self.distinct_ids_by(select, &ids.into(), filter).map(Some)
    }

    /// Distinct values of `select` over rows whose `filter` column is in `ids`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn distinct_ids_by(&self, select: Column, ids: &IdList, filter: Column) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut params = SqlParams::default();
        let ids_in = params.bind_ids(ids);
        let sql = format!(
            "SELECT DISTINCT {select} FROM campaign_donations WHERE {filter} IN ({ids_in}) ORDER BY {select}"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let values = stmt
            .query_map(params.as_params(), |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(values)
    }

    /// Donation ids given to a campaign (or campaigns).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn donation_ids_for_campaign(&self, campaigns: impl Into<IdList>) -> Result<Vec<i64>> {
        self.distinct_ids_by(Column::DonationId, &campaigns.into(), Column::CampaignId)
    }

    /// Donor ids that gave to a campaign (or campaigns), regardless of status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn campaign_donors(&self, campaigns: impl Into<IdList>) -> Result<Vec<i64>> {
        self.distinct_ids_by(Column::DonorId, &campaigns.into(), Column::CampaignId)
    }

    /// Campaign ids a single donation was split across.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn campaigns_for_donation(&self, donation_id: i64) -> Result<Vec<i64>> {
        self.distinct_ids_by(Column::CampaignId, &IdList::from(donation_id), Column::DonationId)
    }

    // === Itemized rows ===

    /// Ledger rows whose `field` is in `ids`.
    ///
    /// Returns `Ok(None)` without querying when `field` is not one of
    /// `campaign`, `campaign_id`, `donation`, `donation_id`, `donor`, `donor_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn campaign_donations_by(
        &self,
        field: &str,
        ids: impl Into<IdList>,
    ) -> Result<Option<Vec<CampaignDonation>>> {
        let Some(column) = Column::sanitize(field) else {
            return Ok(None);
        };
        self.records_where(column, &ids.into()).map(Some)
    }

    /// Ledger rows whose `column` is in `ids`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn records_where(&self, column: Column, ids: &IdList) -> Result<Vec<CampaignDonation>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut params = SqlParams::default();
        let ids_in = params.bind_ids(ids);
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM campaign_donations WHERE {column} IN ({ids_in}) ORDER BY campaign_donation_id"
        );
        self.query_records(&sql, &params)
    }

    /// Ledger rows of one or more donations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn donation_records(&self, donations: impl Into<IdList>) -> Result<Vec<CampaignDonation>> {
        self.records_where(Column::DonationId, &donations.into())
    }

    /// Ledger rows of one or more campaigns.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn donations_on_campaign(
        &self,
        campaigns: impl Into<IdList>,
    ) -> Result<Vec<CampaignDonation>> {
        self.records_where(Column::CampaignId, &campaigns.into())
    }

    /// Ledger rows of a donor.
    ///
    /// With `distinct`, a donation split into several rows is collapsed to
    /// its first row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn donations_by_donor(&self, donor_id: i64, distinct: bool) -> Result<Vec<CampaignDonation>> {
        let sql = if distinct {
            format!(
                r"
                SELECT {RECORD_COLUMNS} FROM campaign_donations
                WHERE campaign_donation_id IN (
                    SELECT MIN(campaign_donation_id) FROM campaign_donations
                    WHERE donor_id = ?1 GROUP BY donation_id
                )
                ORDER BY campaign_donation_id
                "
            )
        } else {
            format!(
                "SELECT {RECORD_COLUMNS} FROM campaign_donations WHERE donor_id = ?1 ORDER BY campaign_donation_id"
            )
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([donor_id], |row| self.row_to_record(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Donation ids of a donor, each listed once.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn donation_ids_for_donor(&self, donor_id: i64) -> Result<Vec<i64>> {
        self.distinct_ids_by(Column::DonationId, &IdList::from(donor_id), Column::DonorId)
    }

    /// Tabular report of ledger rows with donor and donation details.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn donations_report(&self, query: &ReportQuery) -> Result<Vec<ReportRow>> {
        let Some((sql, params)) = query.build(self.statuses.valid_statuses()) else {
            return Ok(Vec::new());
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params.as_params(), |row| {
                let raw: i64 = row.get(3)?;
                let post_date: String = row.get(7)?;
                Ok(ReportRow {
                    donation_id: row.get(0)?,
                    campaign_id: row.get(1)?,
                    campaign_name: row.get(2)?,
                    amount: self.amount(raw),
                    email: row.get(4)?,
                    first_name: row.get(5)?,
                    last_name: row.get(6)?,
                    post_date: parse_post_date(&post_date)?,
                    post_content: row.get(8)?,
                    post_status: row.get(9)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Donations report returned {} rows", rows.len());
        Ok(rows)
    }

    // === Helpers ===

    fn amount(&self, raw: i64) -> Amount {
        currency::normalize(self.currency, raw)
    }

    fn campaign_of(&self, id: i64) -> Result<Option<i64>> {
        let campaign = self
            .conn
            .query_row(
                "SELECT campaign_id FROM campaign_donations WHERE campaign_donation_id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(campaign)
    }

    fn query_sum(&self, sql: &str, params: &SqlParams) -> Result<i64> {
        let raw = self.conn.query_row(sql, params.as_params(), |row| row.get(0))?;
        Ok(raw)
    }

    fn query_count(&self, sql: &str, params: &SqlParams) -> Result<i64> {
        let count = self.conn.query_row(sql, params.as_params(), |row| row.get(0))?;
        Ok(count)
    }

    fn query_records(&self, sql: &str, params: &SqlParams) -> Result<Vec<CampaignDonation>> {
        debug!("Listing ledger rows for {} id(s)", params.len());
        let mut stmt = self.conn.prepare(sql)?;
        let records = stmt
            .query_map(params.as_params(), |row| self.row_to_record(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn row_to_record(&self, row: &rusqlite::Row) -> rusqlite::Result<CampaignDonation> {
        let raw: i64 = row.get(5)?;
        Ok(CampaignDonation {
            campaign_donation_id: row.get(0)?,
            donation_id: row.get(1)?,
            donor_id: row.get(2)?,
            campaign_id: row.get(3)?,
            campaign_name: row.get(4)?,
            amount: self.amount(raw),
        })
    }
}

impl Table for CampaignDonations<'_> {
    type Record = CampaignDonation;
    type NewRecord = NewCampaignDonation;
    type Changes = CampaignDonationChanges;

    /// Insert a ledger row, backfilling the campaign name from the campaign's
    /// title when it is not given. Flushes the campaign's cache.
    fn insert(&self, new: &NewCampaignDonation) -> Result<i64> {
        let campaign_name = match &new.campaign_name {
            Some(name) => name.clone(),
            None => Posts::new(self.conn)
                .title(new.campaign_id)?
                .unwrap_or_default(),
        };
        let amount = to_database_amount(new.amount)?;

        self.conn.execute(
            r"
            INSERT INTO campaign_donations (donation_id, donor_id, campaign_id, campaign_name, amount)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                new.donation_id,
                new.donor_id,
                new.campaign_id,
                campaign_name,
                amount,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.cache.flush_donations_cache(new.campaign_id);
        debug!(
            "Inserted ledger row {} for donation {} on campaign {}",
            id, new.donation_id, new.campaign_id
        );
        Ok(id)
    }

    /// Correct a ledger row. Flushes the cache of the row's campaign, and of
    /// the new campaign when the row moves.
    fn update(&self, id: i64, changes: &CampaignDonationChanges) -> Result<bool> {
        let Some(campaign_id) = self.campaign_of(id)? else {
            return Ok(false);
        };

        let mut assignments = Assignments::default();
        assignments.set("donation_id", changes.donation_id);
        assignments.set("donor_id", changes.donor_id);
        assignments.set("campaign_id", changes.campaign_id);
        assignments.set("campaign_name", changes.campaign_name.clone());
        assignments.set("amount", changes.amount.map(to_database_amount).transpose()?);

        if assignments.is_empty() {
            return Ok(true);
        }

        let (sql, params) =
            assignments.into_statement("campaign_donations", "campaign_donation_id", id);
        let affected = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(params.iter()))?;

        self.cache.flush_donations_cache(campaign_id);
        if let Some(moved_to) = changes.campaign_id.filter(|c| *c != campaign_id) {
            self.cache.flush_donations_cache(moved_to);
        }
        Ok(affected > 0)
    }

    /// Delete a ledger row and flush its campaign's cache.
    fn delete(&self, id: i64) -> Result<bool> {
        let Some(campaign_id) = self.campaign_of(id)? else {
            return Ok(false);
        };

        let affected = self.conn.execute(
            "DELETE FROM campaign_donations WHERE campaign_donation_id = ?1",
            [id],
        )?;
        self.cache.flush_donations_cache(campaign_id);
        Ok(affected > 0)
    }

    fn get(&self, id: i64) -> Result<Option<CampaignDonation>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM campaign_donations WHERE campaign_donation_id = ?1"
                ),
                [id],
                |row| self.row_to_record(row),
            )
            .optional()?;
        Ok(record)
    }
}
