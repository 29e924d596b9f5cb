//! Error types for donation-ledger.
//!
//! This module defines all error types used throughout the donation-ledger crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for donation-ledger operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Query Input Errors ===
    /// A field name outside the column whitelist was requested.
    #[error(
        "invalid field '{field}': expected `campaign`, `campaign_id`, `donation`, \
         `donation_id`, `donor` or `donor_id`"
    )]
    InvalidField {
        /// The rejected field name.
        field: String,
    },

    /// An amount could not be parsed or does not fit the ledger's precision.
    #[error("invalid amount '{value}': {reason}")]
    InvalidAmount {
        /// The rejected amount as given.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A donation status the site does not recognize.
    #[error("unknown donation status '{status}'")]
    InvalidStatus {
        /// The rejected status.
        status: String,
    },

    /// A donation post was deleted directly instead of through the ledger.
    #[error("donation {id} must be deleted with Ledger::delete_donation so its ledger rows go too")]
    DonationPostDelete {
        /// The donation post.
        id: i64,
    },

    /// A reporting period was not of the form `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
    #[error("invalid period '{0}': expected YYYY, YYYY-MM or YYYY-MM-DD")]
    InvalidPeriod(String),

    /// A referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of row that was looked up.
        entity: &'static str,
        /// The missing primary key.
        id: i64,
    },

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for donation-ledger operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an invalid field error.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
        }
    }

    /// Create an invalid amount error.
    #[must_use]
    pub fn invalid_amount(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown-status error.
    #[must_use]
    pub fn invalid_status(status: impl Into<String>) -> Self {
        Self::InvalidStatus {
            status: status.into(),
        }
    }

    /// Create a not-found error for the given entity kind.
    #[must_use]
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Check if this error is a caller mistake rather than an environment failure.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidField { .. }
                | Self::InvalidAmount { .. }
                | Self::InvalidStatus { .. }
                | Self::DonationPostDelete { .. }
                | Self::InvalidPeriod(_)
        )
    }

    /// Check if this error reports a missing row.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_field_display() {
        let err = Error::invalid_field("post_title");
        let msg = err.to_string();
        assert!(msg.contains("post_title"));
        assert!(msg.contains("donor_id"));
    }

    #[test]
    fn test_invalid_amount_display() {
        let err = Error::invalid_amount("12.x", "not a number");
        assert_eq!(err.to_string(), "invalid amount '12.x': not a number");
    }

    #[test]
    fn test_invalid_period_display() {
        let err = Error::InvalidPeriod("May".to_string());
        assert!(err.to_string().contains("May"));
    }

    #[test]
    fn test_is_input_error() {
        assert!(Error::invalid_field("x").is_input_error());
        assert!(Error::invalid_amount("x", "y").is_input_error());
        assert!(Error::InvalidPeriod("x".to_string()).is_input_error());
        assert!(!Error::internal("x").is_input_error());
    }

    #[test]
    fn test_invalid_status_display() {
        let err = Error::invalid_status("trash");
        assert_eq!(err.to_string(), "unknown donation status 'trash'");
        assert!(err.is_input_error());
    }

    #[test]
    fn test_donation_post_delete_display() {
        let err = Error::DonationPostDelete { id: 12 };
        assert!(err.to_string().contains("donation 12"));
        assert!(err.to_string().contains("Ledger::delete_donation"));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_not_found() {
        let err = Error::not_found("campaign", 7);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "campaign 7 not found");
        assert!(!Error::internal("x").is_not_found());
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "approval status not valid".to_string(),
        };
        assert!(err.to_string().contains("approval status not valid"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
