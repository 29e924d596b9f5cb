//! `SQLite` schema definitions for donation-ledger.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the posts table (campaigns and donations).
pub const CREATE_POSTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_type TEXT NOT NULL,
    post_title TEXT NOT NULL DEFAULT '',
    post_status TEXT NOT NULL,
    post_date TEXT NOT NULL,
    post_content TEXT NOT NULL DEFAULT ''
)
";

/// SQL statement to create an index on `post_status` for status filters.
pub const CREATE_POST_STATUS_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_posts_status ON posts(post_status)
";

/// SQL statement to create an index on `post_date` for period and range filters.
pub const CREATE_POST_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_posts_date ON posts(post_date)
";

/// SQL statement to create the donors table.
pub const CREATE_DONORS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS donors (
    donor_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL DEFAULT 0,
    email TEXT NOT NULL,
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    date_joined TEXT NOT NULL
)
";

/// SQL statement to create an index on donor email for lookups.
pub const CREATE_DONOR_EMAIL_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_donors_email ON donors(email)
";

/// SQL statement to create the campaign donations ledger table.
///
/// `amount` holds ten-thousandths of a currency unit.
pub const CREATE_CAMPAIGN_DONATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS campaign_donations (
    campaign_donation_id INTEGER PRIMARY KEY AUTOINCREMENT,
    donation_id INTEGER NOT NULL,
    donor_id INTEGER NOT NULL,
    campaign_id INTEGER NOT NULL,
    campaign_name TEXT NOT NULL,
    amount INTEGER NOT NULL
)
";

/// SQL statement to index ledger rows by donation.
pub const CREATE_DONATION_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_campaign_donations_donation ON campaign_donations(donation_id)
";

/// SQL statement to index ledger rows by campaign.
pub const CREATE_CAMPAIGN_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_campaign_donations_campaign ON campaign_donations(campaign_id)
";

/// SQL statement to index ledger rows by donor.
pub const CREATE_DONOR_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_campaign_donations_donor ON campaign_donations(donor_id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_POSTS_TABLE,
    CREATE_POST_STATUS_INDEX,
    CREATE_POST_DATE_INDEX,
    CREATE_DONORS_TABLE,
    CREATE_DONOR_EMAIL_INDEX,
    CREATE_CAMPAIGN_DONATIONS_TABLE,
    CREATE_DONATION_INDEX,
    CREATE_CAMPAIGN_INDEX,
    CREATE_DONOR_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_campaign_donations_table_contains_required_columns() {
        assert!(CREATE_CAMPAIGN_DONATIONS_TABLE.contains("campaign_donation_id INTEGER PRIMARY KEY"));
        assert!(CREATE_CAMPAIGN_DONATIONS_TABLE.contains("donation_id INTEGER NOT NULL"));
        assert!(CREATE_CAMPAIGN_DONATIONS_TABLE.contains("donor_id INTEGER NOT NULL"));
        assert!(CREATE_CAMPAIGN_DONATIONS_TABLE.contains("campaign_id INTEGER NOT NULL"));
        assert!(CREATE_CAMPAIGN_DONATIONS_TABLE.contains("campaign_name TEXT NOT NULL"));
        assert!(CREATE_CAMPAIGN_DONATIONS_TABLE.contains("amount INTEGER NOT NULL"));
    }

    #[test]
    fn test_posts_table_carries_status_and_date() {
        assert!(CREATE_POSTS_TABLE.contains("post_status TEXT NOT NULL"));
        assert!(CREATE_POSTS_TABLE.contains("post_date TEXT NOT NULL"));
    }

    #[test]
    fn test_create_metadata_table_structure() {
        assert!(CREATE_METADATA_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_METADATA_TABLE.contains("value TEXT NOT NULL"));
    }
}
