//! Building blocks for ledger `WHERE` clauses.
//!
//! Every value reaches SQL as a bound parameter. Column names only ever come
//! from the [`Column`] whitelist.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::ToSql;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::status::StatusPolicy;

/// A list of row ids used in an `IN (...)` filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdList(Vec<i64>);

impl IdList {
    /// Parse loosely typed ids, silently dropping entries that are not numeric.
    ///
    /// Numeric entries with a fractional part are truncated toward zero.
    pub fn parse<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids = values
            .into_iter()
            .filter_map(|value| parse_numeric_id(value.as_ref()))
            .collect();
        Self(ids)
    }

    /// Whether the list holds no ids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The ids in input order.
    #[must_use]
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}

fn parse_numeric_id(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(id) = value.parse::<i64>() {
        return Some(id);
    }
    match value.parse::<f64>() {
        #[allow(clippy::cast_possible_truncation)]
        Ok(number) if number.is_finite() && number.abs() < 9.0e18 => Some(number.trunc() as i64),
        _ => {
            trace!("Dropping non-numeric id {:?}", value);
            None
        }
    }
}

impl From<i64> for IdList {
    fn from(id: i64) -> Self {
        Self(vec![id])
    }
}

impl From<Vec<i64>> for IdList {
    fn from(ids: Vec<i64>) -> Self {
        Self(ids)
    }
}

impl From<&[i64]> for IdList {
    fn from(ids: &[i64]) -> Self {
        Self(ids.to_vec())
    }
}

impl<const N: usize> From<[i64; N]> for IdList {
    fn from(ids: [i64; N]) -> Self {
        Self(ids.to_vec())
    }
}

impl FromIterator<i64> for IdList {
    fn from_iter<T: IntoIterator<Item = i64>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A ledger column that may be filtered or selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// `campaign_id`
    CampaignId,
    /// `donation_id`
    DonationId,
    /// `donor_id`
    DonorId,
}

impl Column {
    /// The SQL column name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CampaignId => "campaign_id",
            Self::DonationId => "donation_id",
            Self::DonorId => "donor_id",
        }
    }

    /// Resolve a caller-supplied field name, reporting unknown names.
    ///
    /// Returns `None` and logs a warning when the name is not whitelisted.
    #[must_use]
    pub fn sanitize(field: &str) -> Option<Self> {
        match field.parse() {
            Ok(column) => Some(column),
            Err(err) => {
                warn!("Refusing to query ledger: {}", err);
                None
            }
        }
    }
}

impl FromStr for Column {
    type Err = Error;

    fn from_str(field: &str) -> Result<Self> {
        match field {
            "campaign" | "campaign_id" => Ok(Self::CampaignId),
            "donation" | "donation_id" => Ok(Self::DonationId),
            "donor" | "donor_id" => Ok(Self::DonorId),
            _ => Err(Error::invalid_field(field)),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which donation post statuses a query accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StatusFilter {
    /// No restriction.
    Any,
    /// Only these statuses; an empty list matches nothing.
    Only(Vec<String>),
}

impl StatusFilter {
    /// Keep the recognized statuses from a request. An empty request is unrestricted.
    pub(crate) fn from_request(policy: &dyn StatusPolicy, statuses: &[String]) -> Self {
        if statuses.is_empty() {
            return Self::Any;
        }
        let valid: Vec<String> = policy
            .filter_valid(statuses)
            .into_iter()
            .map(ToString::to_string)
            .collect();
        if valid.len() < statuses.len() {
            warn!(
                "Ignoring {} unrecognized donation status(es)",
                statuses.len() - valid.len()
            );
        }
        Self::Only(valid)
    }

    /// Approval statuses unless every status was asked for.
    pub(crate) fn approval_unless(policy: &dyn StatusPolicy, include_all: bool) -> Self {
        if include_all {
            Self::Any
        } else {
            Self::from_request(policy, policy.approval_statuses())
        }
    }

    /// Whether no row can pass the filter.
    pub(crate) fn matches_nothing(&self) -> bool {
        matches!(self, Self::Only(statuses) if statuses.is_empty())
    }
}

/// Positional parameters for one statement.
#[derive(Default)]
pub(crate) struct SqlParams {
    values: Vec<Box<dyn ToSql>>,
}

impl SqlParams {
    /// Bind a value and return its placeholder.
    pub(crate) fn bind<T: ToSql + 'static>(&mut self, value: T) -> String {
        self.values.push(Box::new(value));
        format!("?{}", self.values.len())
    }

    /// Bind every id and return the comma separated placeholders.
    pub(crate) fn bind_ids(&mut self, ids: &IdList) -> String {
        ids.as_slice()
            .iter()
            .map(|id| self.bind(*id))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Bind every status and return the comma separated placeholders.
    pub(crate) fn bind_strings(&mut self, values: &[String]) -> String {
        values
            .iter()
            .map(|value| self.bind(value.clone()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `AND p.post_status IN (...)` for a restricted filter, empty otherwise.
    pub(crate) fn status_clause(&mut self, filter: &StatusFilter) -> String {
        match filter {
            StatusFilter::Any => String::new(),
            StatusFilter::Only(statuses) => {
                format!("AND p.post_status IN ({})", self.bind_strings(statuses))
            }
        }
    }

    /// Number of bound values.
    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    /// Parameters ready for `execute`/`query_row`/`query_map`.
    pub(crate) fn as_params(&self) -> rusqlite::ParamsFromIter<std::slice::Iter<'_, Box<dyn ToSql>>> {
        rusqlite::params_from_iter(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{DonationStatuses, COMPLETED, PENDING};

    #[test]
    fn test_id_list_parse_drops_non_numeric() {
        let ids = IdList::parse(["12", "abc", " 7 ", "", "3.9", "x1"]);
        assert_eq!(ids.as_slice(), &[12, 7, 3]);
    }

    #[test]
    fn test_id_list_parse_all_invalid() {
        let ids = IdList::parse(vec!["campaign", "NaN-ish"]);
        assert!(ids.is_empty());
    }

    #[test]
    fn test_id_list_parse_rejects_non_finite() {
        let ids = IdList::parse(["inf", "NaN", "1e30", "5"]);
        assert_eq!(ids.as_slice(), &[5]);
    }

    #[test]
    fn test_id_list_conversions() {
        assert_eq!(IdList::from(4).as_slice(), &[4]);
        assert_eq!(IdList::from(vec![1, 2]).len(), 2);
        assert_eq!(IdList::from([1, 2, 3]).len(), 3);
        assert_eq!(IdList::from(&[9_i64][..]).as_slice(), &[9]);
        assert_eq!((1..=3).collect::<IdList>().as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_column_from_str() {
        assert_eq!("campaign".parse::<Column>().unwrap(), Column::CampaignId);
        assert_eq!("campaign_id".parse::<Column>().unwrap(), Column::CampaignId);
        assert_eq!("donation".parse::<Column>().unwrap(), Column::DonationId);
        assert_eq!("donor_id".parse::<Column>().unwrap(), Column::DonorId);

        let err = "amount".parse::<Column>().unwrap_err();
        assert!(matches!(err, Error::InvalidField { .. }));
    }

    #[test]
    fn test_column_sanitize() {
        assert_eq!(Column::sanitize("donor"), Some(Column::DonorId));
        assert_eq!(Column::sanitize("1; DROP TABLE posts"), None);
    }

    #[test]
    fn test_status_filter_from_request() {
        let policy = DonationStatuses::default();

        assert_eq!(StatusFilter::from_request(&policy, &[]), StatusFilter::Any);

        let filter = StatusFilter::from_request(
            &policy,
            &[COMPLETED.to_string(), "trash".to_string()],
        );
        assert_eq!(filter, StatusFilter::Only(vec![COMPLETED.to_string()]));
        assert!(!filter.matches_nothing());

        let filter = StatusFilter::from_request(&policy, &["trash".to_string()]);
        assert!(filter.matches_nothing());
    }

    #[test]
    fn test_status_filter_approval_unless() {
        let policy = DonationStatuses::default();
        assert_eq!(StatusFilter::approval_unless(&policy, true), StatusFilter::Any);

        match StatusFilter::approval_unless(&policy, false) {
            StatusFilter::Only(statuses) => {
                assert!(statuses.contains(&COMPLETED.to_string()));
                assert!(!statuses.contains(&PENDING.to_string()));
            }
            StatusFilter::Any => panic!("expected approval statuses"),
        }
    }

    #[test]
    fn test_sql_params_numbering() {
        let mut params = SqlParams::default();
        let ids = params.bind_ids(&IdList::from([5, 6]));
        let status = params.status_clause(&StatusFilter::Only(vec![COMPLETED.to_string()]));

        assert_eq!(ids, "?1, ?2");
        assert_eq!(status, "AND p.post_status IN (?3)");
        assert_eq!(params.values.len(), 3);
    }

    #[test]
    fn test_sql_params_unrestricted_status() {
        let mut params = SqlParams::default();
        assert_eq!(params.status_clause(&StatusFilter::Any), "");
        assert!(params.values.is_empty());
    }
}
