//! Donors.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::posts::{format_post_date, parse_post_date};
use crate::table::{Assignments, Table};

/// A stored donor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Donor {
    /// Primary key.
    pub donor_id: i64,
    /// Linked site user, 0 for guests.
    pub user_id: i64,
    /// Contact email.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// When the donor first gave.
    pub date_joined: NaiveDateTime,
}

impl Donor {
    /// First and last name joined by a space, trimmed.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Data for a new donor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDonor {
    /// Linked site user, 0 for guests.
    pub user_id: i64,
    /// Contact email.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// When the donor first gave.
    pub date_joined: NaiveDateTime,
}

/// Partial update for a donor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonorChanges {
    /// New linked user.
    pub user_id: Option<i64>,
    /// New email.
    pub email: Option<String>,
    /// New given name.
    pub first_name: Option<String>,
    /// New family name.
    pub last_name: Option<String>,
}

/// Access to the `donors` table.
#[derive(Debug, Clone, Copy)]
pub struct Donors<'a> {
    conn: &'a Connection,
}

impl<'a> Donors<'a> {
    /// Wrap a connection.
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Look a donor up by email (exact match, first registered wins).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_by_email(&self, email: &str) -> Result<Option<Donor>> {
        let donor = self
            .conn
            .query_row(
                r"
                SELECT donor_id, user_id, email, first_name, last_name, date_joined
                FROM donors WHERE email = ?1 ORDER BY donor_id ASC LIMIT 1
                ",
                [email],
                Self::row_to_donor,
            )
            .optional()?;
        Ok(donor)
    }

    fn row_to_donor(row: &rusqlite::Row) -> rusqlite::Result<Donor> {
        let date_joined: String = row.get(5)?;
        Ok(Donor {
            donor_id: row.get(0)?,
            user_id: row.get(1)?,
            email: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            date_joined: parse_post_date(&date_joined)?,
        })
    }
}

impl Table for Donors<'_> {
    type Record = Donor;
    type NewRecord = NewDonor;
    type Changes = DonorChanges;

    fn insert(&self, new: &NewDonor) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO donors (user_id, email, first_name, last_name, date_joined)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                new.user_id,
                new.email,
                new.first_name,
                new.last_name,
                format_post_date(new.date_joined),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted donor with id {}", id);
        Ok(id)
    }

    fn update(&self, id: i64, changes: &DonorChanges) -> Result<bool> {
        let mut assignments = Assignments::default();
        assignments.set("user_id", changes.user_id);
        assignments.set("email", changes.email.clone());
        assignments.set("first_name", changes.first_name.clone());
        assignments.set("last_name", changes.last_name.clone());

        if assignments.is_empty() {
            return Ok(self.get(id)?.is_some());
        }

        let (sql, params) = assignments.into_statement("donors", "donor_id", id);
        let affected = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(params.iter()))?;
        Ok(affected > 0)
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM donors WHERE donor_id = ?1", [id])?;
        Ok(affected > 0)
    }

    fn get(&self, id: i64) -> Result<Option<Donor>> {
        let donor = self
            .conn
            .query_row(
                r"
                SELECT donor_id, user_id, email, first_name, last_name, date_joined
                FROM donors WHERE donor_id = ?1
                ",
                [id],
                Self::row_to_donor,
            )
            .optional()?;
        Ok(donor)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::storage::Database;

    fn new_donor(email: &str) -> NewDonor {
        NewDonor {
            user_id: 0,
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            date_joined: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let donors = Donors::new(db.connection());

        let id = donors.insert(&new_donor("ada@example.org")).unwrap();
        let donor = donors.get(id).unwrap().unwrap();

        assert_eq!(donor.email, "ada@example.org");
        assert_eq!(donor.full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_find_by_email() {
        let db = Database::open_in_memory().unwrap();
        let donors = Donors::new(db.connection());

        let id = donors.insert(&new_donor("ada@example.org")).unwrap();
        donors.insert(&new_donor("grace@example.org")).unwrap();

        let found = donors.find_by_email("ada@example.org").unwrap().unwrap();
        assert_eq!(found.donor_id, id);
        assert!(donors.find_by_email("nobody@example.org").unwrap().is_none());
    }

    #[test]
    fn test_update() {
        let db = Database::open_in_memory().unwrap();
        let donors = Donors::new(db.connection());

        let id = donors.insert(&new_donor("ada@example.org")).unwrap();
        let changes = DonorChanges {
            last_name: Some("King".to_string()),
            ..DonorChanges::default()
        };
        assert!(donors.update(id, &changes).unwrap());

        let donor = donors.get(id).unwrap().unwrap();
        assert_eq!(donor.last_name, "King");
        assert_eq!(donor.first_name, "Ada");
    }

    #[test]
    fn test_delete() {
        let db = Database::open_in_memory().unwrap();
        let donors = Donors::new(db.connection());

        let id = donors.insert(&new_donor("ada@example.org")).unwrap();
        assert!(donors.delete(id).unwrap());
        assert!(!donors.delete(id).unwrap());
    }

    #[test]
    fn test_full_name_trims_missing_parts() {
        let mut donor = new_donor("anon@example.org");
        donor.last_name = String::new();
        let db = Database::open_in_memory().unwrap();
        let donors = Donors::new(db.connection());
        let id = donors.insert(&donor).unwrap();

        assert_eq!(donors.get(id).unwrap().unwrap().full_name(), "Ada");
    }
}
