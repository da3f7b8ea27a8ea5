//! Human-facing order numbers.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const PREFIX: &str = "ORD-";
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const TIMESTAMP_LEN: usize = 14;
const SUFFIX_LEN: usize = 8;

/// Errors raised when parsing an order number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderNumberError {
    #[error("order number must start with 'ORD-': {0}")]
    MissingPrefix(String),

    #[error("malformed order number: {0}")]
    Malformed(String),
}

/// Unique, human-readable order number.
///
/// Format: `ORD-<yyyyMMddHHmmss>-<8 upper-case hex>`. The timestamp is the
/// creation time in UTC; the suffix makes numbers generated within the same
/// second distinct. Stock reservations are keyed by this value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a fresh order number for an order created at `created_at`.
    pub fn generate(created_at: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string()[..SUFFIX_LEN].to_ascii_uppercase();
        Self(format!(
            "{PREFIX}{}-{suffix}",
            created_at.format(TIMESTAMP_FORMAT)
        ))
    }

    /// Parses and validates an order number.
    pub fn parse(value: impl Into<String>) -> Result<Self, OrderNumberError> {
        let value = value.into();
        let rest = value
            .strip_prefix(PREFIX)
            .ok_or_else(|| OrderNumberError::MissingPrefix(value.clone()))?;

        let (timestamp, suffix) = rest
            .split_once('-')
            .ok_or_else(|| OrderNumberError::Malformed(value.clone()))?;

        let suffix_ok = suffix.len() == SUFFIX_LEN
            && suffix
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));
        if timestamp.len() != TIMESTAMP_LEN
            || !suffix_ok
            || NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).is_err()
        {
            return Err(OrderNumberError::Malformed(value));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation timestamp encoded in the number (second precision).
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let timestamp = self.0.get(PREFIX.len()..PREFIX.len() + TIMESTAMP_LEN)?;
        NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = OrderNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.0
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_numbers_encode_creation_time() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 17, 24, 5).unwrap();
        let number = OrderNumber::generate(at);

        assert!(number.as_str().starts_with("ORD-20261019172405-"));
        assert_eq!(number.created_at(), Some(at));
    }

    #[test]
    fn generated_numbers_are_unique_within_a_second() {
        let at = Utc::now();
        assert_ne!(OrderNumber::generate(at), OrderNumber::generate(at));
    }

    #[test]
    fn generated_numbers_parse_back() {
        let number = OrderNumber::generate(Utc::now());
        assert_eq!(OrderNumber::parse(number.as_str()).unwrap(), number);
    }

    #[test]
    fn parse_rejects_malformed_numbers() {
        assert!(matches!(
            OrderNumber::parse("20261019172405-ABCDEF01"),
            Err(OrderNumberError::MissingPrefix(_))
        ));
        assert!(OrderNumber::parse("ORD-2026-ABCDEF01").is_err());
        assert!(OrderNumber::parse("ORD-20261019172405-abcdef01").is_err());
        assert!(OrderNumber::parse("ORD-20261399172405-ABCDEF01").is_err());
        assert!(OrderNumber::parse("ORD-20261019172405").is_err());
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let number = OrderNumber::generate(Utc::now());
        let json = serde_json::to_string(&number).unwrap();
        let back: OrderNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, number);

        assert!(serde_json::from_str::<OrderNumber>("\"nope\"").is_err());
    }
}
