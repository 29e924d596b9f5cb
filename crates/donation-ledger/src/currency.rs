//! Fixed-point donation amounts.
//!
//! Amounts are kept as [`Decimal`] in memory and as integer ten-thousandths
//! in the database, matching a `decimal(13, 4)` column. Sites that write
//! decimals with a comma get their amounts normalized on the way out.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};

/// Number of decimal places stored in the ledger.
pub const DATABASE_SCALE: u32 = 4;

/// Exclusive upper bound on the stored mantissa (13 digits, 4 of them fractional).
const MAX_DATABASE_MANTISSA: i128 = 10_000_000_000_000;

/// The character a site uses to separate whole and fractional units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DecimalSeparator {
    /// `12.50`
    #[default]
    #[serde(rename = ".")]
    Dot,
    /// `12,50`
    #[serde(rename = ",")]
    Comma,
}

impl DecimalSeparator {
    /// The separator character.
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::Dot => '.',
            Self::Comma => ',',
        }
    }
}

impl fmt::Display for DecimalSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A monetary amount as handed back to callers.
///
/// Carries the separator it should be rendered with; serializes as its
/// rendered string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Amount {
    value: Decimal,
    separator: DecimalSeparator,
}

impl Amount {
    /// A zero amount rendered with a dot.
    pub const ZERO: Self = Self {
        value: Decimal::ZERO,
        separator: DecimalSeparator::Dot,
    };

    /// Wrap a value rendered with a dot separator.
    #[must_use]
    pub fn new(value: Decimal) -> Self {
        Self {
            value,
            separator: DecimalSeparator::Dot,
        }
    }

    /// Wrap a value rendered with the given separator.
    #[must_use]
    pub fn with_separator(value: Decimal, separator: DecimalSeparator) -> Self {
        Self { value, separator }
    }

    /// The numeric value.
    #[must_use]
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// The separator used when rendering.
    #[must_use]
    pub fn separator(&self) -> DecimalSeparator {
        self.separator
    }

    /// Whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.separator {
            DecimalSeparator::Dot => write!(f, "{}", self.value),
            DecimalSeparator::Comma => write!(f, "{}", self.value.to_string().replace('.', ",")),
        }
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse a user-supplied amount, accepting either separator.
///
/// # Errors
///
/// Returns [`Error::InvalidAmount`] if the text is not a decimal number.
pub fn parse_amount(text: &str) -> Result<Decimal> {
    let trimmed = text.trim();
    Decimal::from_str(&trimmed.replace(',', "."))
        .map_err(|e| Error::invalid_amount(trimmed, e.to_string()))
}

/// Convert an amount into the integer stored in the `amount` column.
///
/// Rounds to four decimal places.
///
/// # Errors
///
/// Returns [`Error::InvalidAmount`] if the value does not fit `decimal(13, 4)`.
pub fn to_database_amount(amount: Decimal) -> Result<i64> {
    let mut scaled = amount;
    scaled.rescale(DATABASE_SCALE);
    let mantissa = scaled.mantissa();
    if mantissa.abs() >= MAX_DATABASE_MANTISSA {
        return Err(Error::invalid_amount(
            amount.to_string(),
            "exceeds 9 integer digits",
        ));
    }
    i64::try_from(mantissa).map_err(|_| Error::invalid_amount(amount.to_string(), "out of range"))
}

/// Convert a stored `amount` column value back into a decimal.
#[must_use]
pub fn from_database_amount(raw: i64) -> Decimal {
    Decimal::new(raw, DATABASE_SCALE)
}

/// Locale-aware normalization of amounts read from the database.
pub trait CurrencyNormalizer: fmt::Debug {
    /// Whether the site writes decimals with a comma.
    fn is_comma_decimal(&self) -> bool;

    /// Normalize an amount read from the database for this site.
    fn sanitize_database_amount(&self, amount: Decimal) -> Amount;
}

/// Site currency settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Currency {
    separator: DecimalSeparator,
}

impl Currency {
    /// Create currency settings with the given decimal separator.
    #[must_use]
    pub fn new(separator: DecimalSeparator) -> Self {
        Self { separator }
    }

    /// The configured decimal separator.
    #[must_use]
    pub fn separator(&self) -> DecimalSeparator {
        self.separator
    }
}

impl CurrencyNormalizer for Currency {
    fn is_comma_decimal(&self) -> bool {
        self.separator == DecimalSeparator::Comma
    }

    fn sanitize_database_amount(&self, amount: Decimal) -> Amount {
        Amount::with_separator(amount, self.separator)
    }
}

/// Apply the normalizer to a raw database amount when the site needs it.
pub(crate) fn normalize(currency: &dyn CurrencyNormalizer, raw: i64) -> Amount {
    let value = from_database_amount(raw);
    if currency.is_comma_decimal() {
        currency.sanitize_database_amount(value)
    } else {
        Amount::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_database_amount_scales() {
        assert_eq!(to_database_amount(Decimal::new(125, 1)).unwrap(), 125_000);
        assert_eq!(to_database_amount(Decimal::ZERO).unwrap(), 0);
        assert_eq!(to_database_amount(Decimal::new(-5, 0)).unwrap(), -50_000);
    }

    #[test]
    fn test_to_database_amount_rounds_extra_places() {
        // 1.23456 -> 1.2346
        assert_eq!(to_database_amount(Decimal::new(123_456, 5)).unwrap(), 12_346);
    }

    #[test]
    fn test_to_database_amount_rejects_overflow() {
        let huge = Decimal::new(1_000_000_000, 0);
        let err = to_database_amount(huge).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount { .. }));

        let largest = Decimal::new(9_999_999_999_999, 4);
        assert!(to_database_amount(largest).is_ok());
    }

    #[test]
    fn test_from_database_amount() {
        assert_eq!(from_database_amount(125_000), Decimal::new(125, 1));
        assert_eq!(from_database_amount(125_000).to_string(), "12.5000");
    }

    #[test]
    fn test_parse_amount_accepts_both_separators() {
        assert_eq!(parse_amount("12.50").unwrap(), Decimal::new(1250, 2));
        assert_eq!(parse_amount(" 12,50 ").unwrap(), Decimal::new(1250, 2));
        assert!(parse_amount("twelve").is_err());
    }

    #[test]
    fn test_amount_display() {
        let value = Decimal::new(125_000, 4);
        assert_eq!(Amount::new(value).to_string(), "12.5000");
        assert_eq!(
            Amount::with_separator(value, DecimalSeparator::Comma).to_string(),
            "12,5000"
        );
    }

    #[test]
    fn test_amount_serializes_as_string() {
        let amount = Amount::with_separator(Decimal::new(5, 1), DecimalSeparator::Comma);
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"0,5\"");
    }

    #[test]
    fn test_amount_zero() {
        assert!(Amount::ZERO.is_zero());
        assert_eq!(Amount::default(), Amount::ZERO);
    }

    #[test]
    fn test_currency_normalizer() {
        let dot = Currency::new(DecimalSeparator::Dot);
        let comma = Currency::new(DecimalSeparator::Comma);
        assert!(!dot.is_comma_decimal());
        assert!(comma.is_comma_decimal());

        assert_eq!(normalize(&dot, 10_000).to_string(), "1.0000");
        assert_eq!(normalize(&comma, 10_000).to_string(), "1,0000");
        assert_eq!(normalize(&comma, 10_000).value(), Decimal::ONE);
    }

    #[test]
    fn test_decimal_separator_serde() {
        let sep: DecimalSeparator = serde_json::from_str("\",\"").unwrap();
        assert_eq!(sep, DecimalSeparator::Comma);
        assert_eq!(serde_json::to_string(&DecimalSeparator::Dot).unwrap(), "\".\"");
    }
}
