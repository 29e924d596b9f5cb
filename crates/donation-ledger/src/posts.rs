//! Host posts: campaigns and donations.
//!
//! Campaign posts supply the title that ledger rows snapshot. Donation posts
//! carry the status and date every ledger filter joins against.

use std::fmt;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::table::{Assignments, Table};

/// Storage format of `post_date`; sorts lexically in date order.
pub const POST_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind of post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    /// A fundraising campaign.
    Campaign,
    /// A single donation.
    Donation,
}

impl PostType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Campaign => "campaign",
            Self::Donation => "donation",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    /// Primary key.
    pub id: i64,
    /// Campaign or donation.
    pub post_type: PostType,
    /// Title shown for the post.
    pub title: String,
    /// Status string, e.g. `charitable-completed`.
    pub status: String,
    /// When the post was created.
    pub date: NaiveDateTime,
    /// Free-form body; donations keep the donor's note here.
    pub content: String,
}

/// Data for a new post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    /// Campaign or donation.
    pub post_type: PostType,
    /// Title shown for the post.
    pub title: String,
    /// Initial status.
    pub status: String,
    /// Creation date.
    pub date: NaiveDateTime,
    /// Free-form body.
    pub content: String,
}

impl NewPost {
    /// A campaign post with the given title.
    #[must_use]
    pub fn campaign(title: impl Into<String>, date: NaiveDateTime) -> Self {
        Self {
            post_type: PostType::Campaign,
            title: title.into(),
            status: "publish".to_string(),
            date,
            content: String::new(),
        }
    }

    /// A donation post with the given status.
    #[must_use]
    pub fn donation(status: impl Into<String>, date: NaiveDateTime) -> Self {
        Self {
            post_type: PostType::Donation,
            title: String::new(),
            status: status.into(),
            date,
            content: String::new(),
        }
    }
}

/// Partial update for a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostChanges {
    /// New title.
    pub title: Option<String>,
    /// New status.
    pub status: Option<String>,
    /// New date.
    pub date: Option<NaiveDateTime>,
    /// New body.
    pub content: Option<String>,
}

/// Access to the `posts` table.
#[derive(Debug, Clone, Copy)]
pub struct Posts<'a> {
    conn: &'a Connection,
}

impl<'a> Posts<'a> {
    /// Wrap a connection.
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// The title of a post, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn title(&self, id: i64) -> Result<Option<String>> {
        let title = self
            .conn
            .query_row("SELECT post_title FROM posts WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(title)
    }

    /// Change a post's status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_status(&self, id: i64, status: &str) -> Result<bool> {
        self.update(
            id,
            &PostChanges {
                status: Some(status.to_string()),
                ..PostChanges::default()
            },
        )
    }

    /// Delete a post row without checking its type.
    pub(crate) fn delete_row(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<Post> {
        let post_type: String = row.get(1)?;
        let date: String = row.get(4)?;

        let post_type = match post_type.as_str() {
            "campaign" => PostType::Campaign,
            "donation" => PostType::Donation,
            other => {
                warn!("Unknown post type: {}, treating as donation", other);
                PostType::Donation
            }
        };

        Ok(Post {
            id: row.get(0)?,
            post_type,
            title: row.get(2)?,
            status: row.get(3)?,
            date: parse_post_date(&date)?,
            content: row.get(5)?,
        })
    }
}

/// Parse a stored `post_date` value.
pub(crate) fn parse_post_date(value: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, POST_DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Render a date in `post_date` storage format.
pub(crate) fn format_post_date(date: NaiveDateTime) -> String {
    date.format(POST_DATE_FORMAT).to_string()
}

impl Table for Posts<'_> {
    type Record = Post;
    type NewRecord = NewPost;
    type Changes = PostChanges;

    fn insert(&self, new: &NewPost) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO posts (post_type, post_title, post_status, post_date, post_content)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                new.post_type.as_str(),
                new.title,
                new.status,
                format_post_date(new.date),
                new.content,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted {} post with id {}", new.post_type, id);
        Ok(id)
    }

    fn update(&self, id: i64, changes: &PostChanges) -> Result<bool> {
        let mut assignments = Assignments::default();
        assignments.set("post_title", changes.title.clone());
        assignments.set("post_status", changes.status.clone());
        assignments.set("post_date", changes.date.map(format_post_date));
        assignments.set("post_content", changes.content.clone());

        if assignments.is_empty() {
            return Ok(self.get(id)?.is_some());
        }

        let (sql, params) = assignments.into_statement("posts", "id", id);
        let affected = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(params.iter()))?;
        Ok(affected > 0)
    }

    /// Delete a campaign post.
    ///
    /// Donation posts own ledger rows and are refused with
    /// [`Error::DonationPostDelete`]; `Ledger::delete_donation` removes both.
    fn delete(&self, id: i64) -> Result<bool> {
        match self.get(id)?.map(|post| post.post_type) {
            None => Ok(false),
            Some(PostType::Donation) => Err(Error::DonationPostDelete { id }),
            Some(PostType::Campaign) => self.delete_row(id),
        }
    }

    fn get(&self, id: i64) -> Result<Option<Post>> {
        let post = self
            .conn
            .query_row(
                r"
                SELECT id, post_type, post_title, post_status, post_date, post_content
                FROM posts WHERE id = ?1
                ",
                [id],
                Self::row_to_post,
            )
            .optional()?;
        Ok(post)
    }
}
