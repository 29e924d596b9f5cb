//! The donation ledger.
//!
//! [`CampaignDonations`] answers every question about who gave how much to
//! which campaign. [`Ledger`] owns the database and the collaborators the
//! query service borrows, and adds the few operations that span tables.

mod campaign_donations;
pub mod filters;
pub mod report;

use chrono::NaiveDateTime;
use rusqlite::OptionalExtension;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{DeferredFlush, DonationsCache, NullCache};
use crate::config::Config;
use crate::currency::Currency;
use crate::donors::Donors;
use crate::error::{Error, Result};
use crate::posts::{parse_post_date, NewPost, PostType, Posts};
use crate::status::{DonationStatuses, StatusPolicy};
use crate::storage::Database;
use crate::table::Table;

pub use campaign_donations::{
    CampaignDonation, CampaignDonationChanges, CampaignDonations, NewCampaignDonation,
};
pub use filters::{Column, IdList};
pub use report::{Period, PeriodSummary, ReportOrderBy, ReportQuery, ReportRow, SortOrder};

/// The share of a donation given to one campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignShare {
    /// The campaign post.
    pub campaign_id: i64,
    /// Amount given to it.
    pub amount: Decimal,
}

/// A donation to record, split across one or more campaigns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDonation {
    /// Who gave.
    pub donor_id: i64,
    /// Initial donation status.
    pub status: String,
    /// When the donation was made.
    pub date: NaiveDateTime,
    /// Donor note.
    pub note: String,
    /// Campaign shares, at least one.
    pub shares: Vec<CampaignShare>,
}

/// Row counts and size of a ledger database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    /// Number of campaign posts.
    pub campaigns: i64,
    /// Number of donation posts.
    pub donations: i64,
    /// Number of donors.
    pub donors: i64,
    /// Number of ledger rows.
    pub ledger_rows: i64,
    /// Date of the oldest donation.
    pub oldest_donation: Option<NaiveDateTime>,
    /// Date of the newest donation.
    pub newest_donation: Option<NaiveDateTime>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// A ledger database together with its currency, status and cache settings.
#[derive(Debug)]
pub struct Ledger {
    db: Database,
    currency: Currency,
    statuses: DonationStatuses,
    cache: Box<dyn DonationsCache>,
}

impl Ledger {
    /// Open the ledger at the configured database path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &Config) -> Result<Self> {
        let db = Database::open(config.database_path())?;
        Ok(Self::with_database(db, config))
    }

    /// Open a throwaway in-memory ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory(config: &Config) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::with_database(db, config))
    }

    fn with_database(db: Database, config: &Config) -> Self {
        Self {
            db,
            currency: Currency::new(config.currency.decimal_separator),
            statuses: DonationStatuses::from_config(&config.statuses),
            cache: Box::new(NullCache),
        }
    }

    /// Replace the cache hook.
    #[must_use]
    pub fn with_cache(mut self, cache: Box<dyn DonationsCache>) -> Self {
        self.cache = cache;
        self
    }

    /// The underlying database.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The status policy in effect.
    #[must_use]
    pub fn statuses(&self) -> &DonationStatuses {
        &self.statuses
    }

    /// The ledger query service.
    #[must_use]
    pub fn campaign_donations(&self) -> CampaignDonations<'_> {
        CampaignDonations::new(
            self.db.connection(),
            &self.currency,
            self.cache.as_ref(),
            &self.statuses,
        )
    }

    /// Campaign and donation posts.
    #[must_use]
    pub fn posts(&self) -> Posts<'_> {
        Posts::new(self.db.connection())
    }

    /// Donors.
    #[must_use]
    pub fn donors(&self) -> Donors<'_> {
        Donors::new(self.db.connection())
    }

    /// Create a campaign post.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn add_campaign(&self, title: &str, date: NaiveDateTime) -> Result<i64> {
        self.posts().insert(&NewPost::campaign(title, date))
    }

    /// Record a donation post and one ledger row per campaign share.
    ///
    /// Everything is written in one transaction and the touched campaigns'
    /// caches are flushed once it commits. Returns the donation id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStatus`] for an unknown status,
    /// [`Error::InvalidAmount`] for a share that does not fit the ledger or
    /// an empty share list, and [`Error::NotFound`] if the donor or a
    /// campaign does not exist.
    pub fn add_donation(&self, donation: &NewDonation) -> Result<i64> {
        if !self.statuses.is_valid(&donation.status) {
            return Err(Error::invalid_status(&donation.status));
        }
        if donation.shares.is_empty() {
            return Err(Error::invalid_amount("", "a donation needs at least one campaign"));
        }
        if self.donors().get(donation.donor_id)?.is_none() {
            return Err(Error::not_found("donor", donation.donor_id));
        }

        let tx = self.db.connection().unchecked_transaction()?;
        let posts = Posts::new(&tx);
        for share in &donation.shares {
            let is_campaign = posts
                .get(share.campaign_id)?
                .is_some_and(|post| post.post_type == PostType::Campaign);
            if !is_campaign {
                return Err(Error::not_found("campaign", share.campaign_id));
            }
        }

        let mut post = NewPost::donation(&donation.status, donation.date);
        post.content.clone_from(&donation.note);
        let donation_id = posts.insert(&post)?;

        let flushes = DeferredFlush::default();
        let ledger = CampaignDonations::new(&tx, &self.currency, &flushes, &self.statuses);
        for share in &donation.shares {
            ledger.insert(&NewCampaignDonation {
                donation_id,
                donor_id: donation.donor_id,
                campaign_id: share.campaign_id,
                campaign_name: None,
                amount: share.amount,
            })?;
        }
        tx.commit()?;
        flushes.flush_into(self.cache.as_ref());

        info!(
            "Recorded donation {} across {} campaign(s)",
            donation_id,
            donation.shares.len()
        );
        Ok(donation_id)
    }

    /// Change a donation's status and flush the caches of its campaigns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStatus`] for an unknown status and
    /// [`Error::NotFound`] if the donation does not exist.
    pub fn set_donation_status(&self, donation_id: i64, status: &str) -> Result<()> {
        if !self.statuses.is_valid(status) {
            return Err(Error::invalid_status(status));
        }
        self.require_donation(donation_id)?;

        self.posts().set_status(donation_id, status)?;
        let ledger = self.campaign_donations();
        for campaign_id in ledger.campaigns_for_donation(donation_id)? {
            self.cache.flush_donations_cache(campaign_id);
        }
        debug!("Donation {} is now {}", donation_id, status);
        Ok(())
    }

    /// Delete a donation: its ledger rows first, then the donation post.
    /// The touched campaigns' caches are flushed after the commit.
    ///
    /// Returns the number of ledger rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the donation does not exist.
    pub fn delete_donation(&self, donation_id: i64) -> Result<usize> {
        self.require_donation(donation_id)?;

        let tx = self.db.connection().unchecked_transaction()?;
        let flushes = DeferredFlush::default();
        let ledger = CampaignDonations::new(&tx, &self.currency, &flushes, &self.statuses);
        let removed = ledger.delete_donation_records(donation_id)?;
        Posts::new(&tx).delete_row(donation_id)?;
        tx.commit()?;
        flushes.flush_into(self.cache.as_ref());

        info!("Deleted donation {} and {} ledger row(s)", donation_id, removed);
        Ok(removed)
    }

    /// Row counts and file size.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<LedgerStats> {
        let conn = self.db.connection();
        let count_posts = |post_type: PostType| -> Result<i64> {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM posts WHERE post_type = ?1",
                [post_type.to_string()],
                |row| row.get(0),
            )?;
            Ok(count)
        };
        let donation_date = |direction: &str| -> Result<Option<NaiveDateTime>> {
            let date: Option<String> = conn
                .query_row(
                    &format!(
                        "SELECT post_date FROM posts WHERE post_type = 'donation' \
                         ORDER BY post_date {direction} LIMIT 1"
                    ),
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            date.map(|d| parse_post_date(&d).map_err(Error::from))
                .transpose()
        };

        let donors = conn.query_row("SELECT COUNT(*) FROM donors", [], |row| row.get(0))?;

        Ok(LedgerStats {
            campaigns: count_posts(PostType::Campaign)?,
            donations: count_posts(PostType::Donation)?,
            donors,
            ledger_rows: self.campaign_donations().count()?,
            oldest_donation: donation_date("ASC")?,
            newest_donation: donation_date("DESC")?,
            db_size_bytes: self.db.size_bytes(),
        })
    }

    fn require_donation(&self, donation_id: i64) -> Result<()> {
        match self.posts().get(donation_id)? {
            Some(post) if post.post_type == PostType::Donation => Ok(()),
            _ => Err(Error::not_found("donation", donation_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::cache::testing::RecordingCache;
    use crate::donors::NewDonor;
    use crate::status::{COMPLETED, PENDING, REFUNDED};

    fn date(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap()
    }

    fn ledger() -> Ledger {
        Ledger::open_in_memory(&Config::default()).unwrap()
    }

    fn donor(ledger: &Ledger) -> i64 {
        ledger
            .donors()
            .insert(&NewDonor {
                user_id: 0,
                email: "donor@example.org".to_string(),
                first_name: "Mary".to_string(),
                last_name: "Seacole".to_string(),
                date_joined: date(1),
            })
            .unwrap()
    }

    fn share(campaign_id: i64, amount: &str) -> CampaignShare {
        CampaignShare {
            campaign_id,
            amount: amount.parse().unwrap(),
        }
    }

    fn donation(donor_id: i64, status: &str, shares: Vec<CampaignShare>) -> NewDonation {
        NewDonation {
            donor_id,
            status: status.to_string(),
            date: date(2),
            note: "Keep it up".to_string(),
            shares,
        }
    }

    #[test]
    fn test_add_donation_splits_across_campaigns() {
        let ledger = ledger();
        let a = ledger.add_campaign("Wells", date(1)).unwrap();
        let b = ledger.add_campaign("Books", date(1)).unwrap();
        let donor = donor(&ledger);

        let id = ledger
            .add_donation(&donation(donor, COMPLETED, vec![share(a, "30"), share(b, "20")]))
            .unwrap();

        let service = ledger.campaign_donations();
        let rows = service.donation_records(id).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].campaign_name, "Wells");
        assert_eq!(service.donation_total_amount(id).unwrap().value(), Decimal::from(50));
        assert_eq!(ledger.posts().get(id).unwrap().unwrap().content, "Keep it up");
    }

    #[test]
    fn test_add_donation_validation() {
        let ledger = ledger();
        let campaign = ledger.add_campaign("Wells", date(1)).unwrap();
        let donor = donor(&ledger);

        let err = ledger
            .add_donation(&donation(donor, "trash", vec![share(campaign, "1")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStatus { .. }));

        let err = ledger.add_donation(&donation(donor, COMPLETED, vec![])).unwrap_err();
        assert!(err.is_input_error());

        let err = ledger
            .add_donation(&donation(999, COMPLETED, vec![share(campaign, "1")]))
            .unwrap_err();
        assert!(err.is_not_found());

        let err = ledger
            .add_donation(&donation(donor, COMPLETED, vec![share(campaign, "1"), share(404, "1")]))
            .unwrap_err();
        assert!(err.is_not_found());

        // Nothing from the failed attempts was written.
        assert_eq!(ledger.stats().unwrap().donations, 0);
        assert_eq!(ledger.campaign_donations().count().unwrap(), 0);
    }

    #[test]
    fn test_add_donation_rolls_back_on_bad_amount() {
        let cache = std::sync::Arc::new(RecordingCache::default());
        let ledger = ledger().with_cache(Box::new(SharedCache(cache.clone())));
        let a = ledger.add_campaign("Wells", date(1)).unwrap();
        let b = ledger.add_campaign("Books", date(1)).unwrap();
        let donor = donor(&ledger);

        let err = ledger
            .add_donation(&donation(
                donor,
                COMPLETED,
                vec![share(a, "5"), share(b, "99999999999")],
            ))
            .unwrap_err();

        assert!(matches!(err, Error::InvalidAmount { .. }));
        assert_eq!(ledger.stats().unwrap().donations, 0);
        assert_eq!(ledger.campaign_donations().count().unwrap(), 0);
        assert!(cache.flushed().is_empty());
    }

    /// Reads committed ledger rows through its own connection on every flush.
    #[derive(Debug)]
    struct CommittedRows {
        conn: rusqlite::Connection,
        seen: std::sync::Arc<std::sync::Mutex<Vec<(i64, i64)>>>,
    }

    impl DonationsCache for CommittedRows {
        fn flush_donations_cache(&self, campaign_id: i64) {
            let rows = self
                .conn
                .query_row(
                    "SELECT COUNT(*) FROM campaign_donations WHERE campaign_id = ?1",
                    [campaign_id],
                    |row| row.get(0),
                )
                .unwrap();
            self.seen.lock().unwrap().push((campaign_id, rows));
        }
    }

    #[test]
    fn test_flushes_happen_after_commit() {
        let db_path = std::env::temp_dir().join(format!(
            "donation_ledger_flush_{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&db_path);
        let mut config = Config::default();
        config.storage.database_path = Some(db_path.clone());

        let seen = std::sync::Arc::default();
        let ledger = Ledger::open(&config).unwrap();
        let ledger = ledger.with_cache(Box::new(CommittedRows {
            conn: rusqlite::Connection::open(&db_path).unwrap(),
            seen: std::sync::Arc::clone(&seen),
        }));
        let a = ledger.add_campaign("Wells", date(1)).unwrap();
        let b = ledger.add_campaign("Books", date(1)).unwrap();
        let donor = donor(&ledger);

        let id = ledger
            .add_donation(&donation(
                donor,
                COMPLETED,
                vec![share(a, "1"), share(b, "2"), share(a, "3")],
            ))
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(a, 2), (b, 1)]);

        seen.lock().unwrap().clear();
        ledger.delete_donation(id).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(a, 0), (b, 0)]);

        drop(ledger);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_set_donation_status_changes_totals_and_flushes() {
        let cache = std::sync::Arc::new(RecordingCache::default());
        let ledger = ledger().with_cache(Box::new(SharedCache(cache.clone())));
        let campaign = ledger.add_campaign("Wells", date(1)).unwrap();
        let donor = donor(&ledger);
        let id = ledger
            .add_donation(&donation(donor, PENDING, vec![share(campaign, "10")]))
            .unwrap();
        let service = ledger.campaign_donations();
        assert!(service.campaign_donated_amount(campaign, false, true).unwrap().is_zero());
        cache.clear();

        ledger.set_donation_status(id, COMPLETED).unwrap();

        assert_eq!(cache.flushed(), vec![campaign]);
        assert_eq!(
            service.campaign_donated_amount(campaign, false, true).unwrap().value(),
            Decimal::from(10)
        );
        assert!(ledger.set_donation_status(id, "trash").is_err());
        assert!(ledger.set_donation_status(campaign, REFUNDED).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_donation_cascades() {
        let ledger = ledger();
        let a = ledger.add_campaign("Wells", date(1)).unwrap();
        let b = ledger.add_campaign("Books", date(1)).unwrap();
        let donor = donor(&ledger);
        let id = ledger
            .add_donation(&donation(donor, COMPLETED, vec![share(a, "1"), share(b, "2")]))
            .unwrap();

        assert_eq!(ledger.delete_donation(id).unwrap(), 2);
        assert!(ledger.posts().get(id).unwrap().is_none());
        assert!(ledger.campaign_donations().donation_records(id).unwrap().is_empty());
        assert!(ledger.delete_donation(id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_stats() {
        let ledger = ledger();
        let empty = ledger.stats().unwrap();
        assert_eq!(empty.ledger_rows, 0);
        assert!(empty.oldest_donation.is_none());

        let campaign = ledger.add_campaign("Wells", date(1)).unwrap();
        let donor = donor(&ledger);
        ledger
            .add_donation(&donation(donor, COMPLETED, vec![share(campaign, "1")]))
            .unwrap();

        let stats = ledger.stats().unwrap();
        assert_eq!(stats.campaigns, 1);
        assert_eq!(stats.donations, 1);
        assert_eq!(stats.donors, 1);
        assert_eq!(stats.ledger_rows, 1);
        assert_eq!(stats.oldest_donation, Some(date(2)));
        assert_eq!(stats.newest_donation, Some(date(2)));
    }

    #[derive(Debug)]
    struct SharedCache(std::sync::Arc<RecordingCache>);

    impl DonationsCache for SharedCache {
        fn flush_donations_cache(&self, campaign_id: i64) {
            self.0.flush_donations_cache(campaign_id);
        }
    }
}
