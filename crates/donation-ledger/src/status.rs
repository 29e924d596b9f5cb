//! Donation statuses.
//!
//! A donation's status lives on its post. Every status the site knows about
//! is "valid"; the subset that counts as real money is "approval".

use std::fmt;

use crate::config::StatusConfig;

/// Donation has been paid.
pub const COMPLETED: &str = "charitable-completed";
/// Donation is awaiting payment.
pub const PENDING: &str = "charitable-pending";
/// Payment failed.
pub const FAILED: &str = "charitable-failed";
/// Donation was cancelled.
pub const CANCELLED: &str = "charitable-cancelled";
/// Donation was refunded.
pub const REFUNDED: &str = "charitable-refunded";
/// Donation is promised but not yet collected.
pub const PREAPPROVED: &str = "charitable-preapproved";

/// Decides which statuses exist and which of them count toward totals.
pub trait StatusPolicy: fmt::Debug {
    /// Whether the status is one the site recognizes.
    fn is_valid(&self, status: &str) -> bool;

    /// Every recognized status.
    fn valid_statuses(&self) -> &[String];

    /// Statuses counted as real money.
    fn approval_statuses(&self) -> &[String];

    /// Keep only the recognized statuses from the input, in order.
    fn filter_valid<'s>(&self, statuses: &'s [String]) -> Vec<&'s str> {
        statuses
            .iter()
            .map(String::as_str)
            .filter(|s| self.is_valid(s))
            .collect()
    }
}

/// Status lists loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationStatuses {
    valid: Vec<String>,
    approval: Vec<String>,
}

impl DonationStatuses {
    /// Build a policy from explicit lists.
    #[must_use]
    pub fn new(valid: Vec<String>, approval: Vec<String>) -> Self {
        Self { valid, approval }
    }

    /// Build a policy from configuration.
    #[must_use]
    pub fn from_config(config: &StatusConfig) -> Self {
        Self::new(config.valid.clone(), config.approval.clone())
    }
}

impl Default for DonationStatuses {
    fn default() -> Self {
        Self::from_config(&StatusConfig::default())
    }
}

impl StatusPolicy for DonationStatuses {
    fn is_valid(&self, status: &str) -> bool {
        self.valid.iter().any(|s| s == status)
    }

    fn valid_statuses(&self) -> &[String] {
        &self.valid
    }

    fn approval_statuses(&self) -> &[String] {
        &self.approval
    }
}

/// Default recognized statuses.
#[must_use]
pub fn default_valid_statuses() -> Vec<String> {
    [COMPLETED, PENDING, FAILED, CANCELLED, REFUNDED, PREAPPROVED]
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Default statuses that count toward totals.
#[must_use]
pub fn default_approval_statuses() -> Vec<String> {
    vec![COMPLETED.to_string(), PREAPPROVED.to_string()]
}
