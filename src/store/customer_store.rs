use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::customer::{CustomerAccount, CustomerId, OutboxEvent};

// ============================================================================
// Customer Record Store - Port
// ============================================================================
//
// The store owns every durable record. Writes are whole-record replacements
// guarded by a version check, which is what makes the command handler's
// read-decide-write cycle atomic per customer.
//
// Version 0 means "no record"; the first stored version is 1.
//
// ============================================================================

/// A stored record together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub record: T,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Version conflict")]
    Conflict,

    #[error("Event already processed")]
    DuplicateEvent,

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn unavailable(error: impl std::fmt::Display) -> Self {
        StoreError::Unavailable(error.to_string())
    }
}

/// Everything an order check writes, committed as one unit
#[derive(Debug, Clone)]
pub struct OrderCheckCommit {
    pub event_id: String,
    pub customer_id: CustomerId,
    /// Account write and the version it was decided against; `None` when
    /// the order was rejected and credit is unchanged
    pub account_update: Option<Versioned<CustomerAccount>>,
    pub outbox: OutboxEvent,
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_by_customer_id(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<Versioned<CustomerAccount>>, StoreError>;

    /// Create (`expected_version == 0`) or replace the record, failing with
    /// `Conflict` when the stored version differs. Returns the new version.
    async fn put(&self, account: &CustomerAccount, expected_version: i64) -> Result<i64, StoreError>;

    /// Event markers live with the customer the event is about
    async fn is_event_processed(&self, customer_id: &CustomerId, event_id: &str) -> Result<bool, StoreError>;

    /// Apply the optional account write, the event marker and the outbox
    /// event as one unit. `DuplicateEvent` when the marker already exists,
    /// `Conflict` when the account version moved on.
    async fn commit_order_check(&self, commit: OrderCheckCommit) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

pub type DynCustomerStore = Arc<dyn CustomerStore>;
