use std::time::Duration;

use crate::store::StoreError;
use crate::utils::IsTransient;

use super::value_objects::CustomerId;

// ============================================================================
// Customer Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CustomerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Customer not found: {0}")]
    NotFound(CustomerId),

    #[error("Limit {requested} is below outstanding credit {credit} for customer {customer_id}")]
    LimitBelowCredit {
        customer_id: CustomerId,
        requested: i64,
        credit: i64,
    },

    #[error("Customer {customer_id} was modified concurrently")]
    ConcurrentUpdate { customer_id: CustomerId },

    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Request did not complete within {0:?}")]
    Timeout(Duration),

    #[error("Stored record is corrupt: {0}")]
    CorruptRecord(String),
}

impl CustomerError {
    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            CustomerError::InvalidArgument(_) => "invalid_argument",
            CustomerError::NotFound(_) => "not_found",
            CustomerError::LimitBelowCredit { .. } => "limit_below_credit",
            CustomerError::ConcurrentUpdate { .. } => "concurrent_update",
            CustomerError::StoreUnavailable(_) => "store_unavailable",
            CustomerError::Timeout(_) => "timeout",
            CustomerError::CorruptRecord(_) => "corrupt_record",
        }
    }

    /// Lift a store error that has no operation-specific meaning
    pub(crate) fn from_store(customer_id: &CustomerId, error: StoreError) -> Self {
        match error {
            StoreError::Conflict => CustomerError::ConcurrentUpdate {
                customer_id: customer_id.clone(),
            },
            StoreError::DuplicateEvent => CustomerError::StoreUnavailable(
                "unexpected duplicate event marker".to_string(),
            ),
            StoreError::Unavailable(message) => CustomerError::StoreUnavailable(message),
            StoreError::Corrupt(message) => CustomerError::CorruptRecord(message),
        }
    }
}

// Only version conflicts are retried; store faults propagate untouched.
impl IsTransient for CustomerError {
    fn is_transient(&self) -> bool {
        matches!(self, CustomerError::ConcurrentUpdate { .. })
    }
}
