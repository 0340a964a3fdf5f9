use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::CustomerError;

// ============================================================================
// Customer Value Objects
// ============================================================================

/// Credit consumed by a single requested unit
pub const CREDIT_PER_UNIT: i64 = 100;

/// Caller-assigned customer identifier, never empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerId(String);

impl CustomerId {
    pub fn parse(value: impl Into<String>) -> Result<Self, CustomerError> {
        let value = value.into();
        if value.is_empty() {
            return Err(CustomerError::InvalidArgument(
                "customer_id must not be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CustomerId {
    type Error = CustomerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CustomerId> for String {
    fn from(id: CustomerId) -> Self {
        id.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Requested credit ceiling, strictly positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CreditLimit(i64);

impl CreditLimit {
    pub fn new(value: i64) -> Result<Self, CustomerError> {
        if value <= 0 {
            return Err(CustomerError::InvalidArgument(format!(
                "limit must be a positive integer, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

/// Number of credit units requested in one transaction, strictly positive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditUnits(i64);

impl CreditUnits {
    pub fn new(value: i64) -> Result<Self, CustomerError> {
        if value <= 0 {
            return Err(CustomerError::InvalidArgument(format!(
                "number must be a positive integer, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> i64 {
        self.0
    }

    /// Credit consumed by these units. `None` on overflow.
    pub fn credit(self) -> Option<i64> {
        self.0.checked_mul(CREDIT_PER_UNIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_customer_id_rejected() {
        assert!(matches!(
            CustomerId::parse(""),
            Err(CustomerError::InvalidArgument(_))
        ));
        assert_eq!(CustomerId::parse("C1").unwrap().as_str(), "C1");
    }

    #[test]
    fn test_customer_id_deserialization_validates() {
        let ok: CustomerId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(ok.to_string(), "abc");
        assert!(serde_json::from_str::<CustomerId>("\"\"").is_err());
    }

    #[test]
    fn test_zero_and_negative_amounts_rejected() {
        assert!(CreditLimit::new(0).is_err());
        assert!(CreditLimit::new(-5).is_err());
        assert!(CreditUnits::new(0).is_err());
        assert!(CreditUnits::new(-1).is_err());
        assert_eq!(CreditLimit::new(500).unwrap().value(), 500);
    }

    #[test]
    fn test_units_to_credit() {
        assert_eq!(CreditUnits::new(3).unwrap().credit(), Some(300));
        assert_eq!(CreditUnits::new(i64::MAX).unwrap().credit(), None);
    }
}
