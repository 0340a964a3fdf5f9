use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::customer::{CustomerAccount, CustomerId, OutboxEvent};

use super::customer_store::{CustomerStore, OrderCheckCommit, StoreError, Versioned};

/// Outbox events kept before the oldest are dropped
pub const DEFAULT_OUTBOX_CAPACITY: usize = 10_000;

/// A thread-safe in-memory customer store for development and tests.
///
/// All tables live behind one lock so a version check and the write it
/// guards happen under the same guard, and an order check commit is atomic.
/// Nothing relays the outbox, so only the newest events are retained;
/// processed event markers are kept for the life of the process.
#[derive(Clone)]
pub struct InMemoryCustomerStore {
    state: Arc<RwLock<State>>,
    outbox_capacity: usize,
}

#[derive(Default)]
struct State {
    accounts: HashMap<CustomerId, Versioned<CustomerAccount>>,
    processed_events: HashMap<(CustomerId, String), DateTime<Utc>>,
    outbox: VecDeque<OutboxEvent>,
}

impl State {
    fn check_version(&self, customer_id: &CustomerId, expected_version: i64) -> Result<(), StoreError> {
        let current = self
            .accounts
            .get(customer_id)
            .map(|stored| stored.version)
            .unwrap_or(0);
        if current != expected_version {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    fn write(&mut self, account: &CustomerAccount, expected_version: i64) -> i64 {
        let version = expected_version + 1;
        self.accounts.insert(
            account.customer_id().clone(),
            Versioned {
                record: account.clone(),
                version,
            },
        );
        version
    }
}

impl Default for InMemoryCustomerStore {
    fn default() -> Self {
        Self::with_outbox_capacity(DEFAULT_OUTBOX_CAPACITY)
    }
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outbox_capacity(outbox_capacity: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    #[cfg(test)]
    pub async fn outbox_events(&self) -> Vec<OutboxEvent> {
        self.state.read().await.outbox.iter().cloned().collect()
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn find_by_customer_id(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<Versioned<CustomerAccount>>, StoreError> {
        let state = self.state.read().await;
        Ok(state.accounts.get(customer_id).cloned())
    }

    async fn put(&self, account: &CustomerAccount, expected_version: i64) -> Result<i64, StoreError> {
        let mut state = self.state.write().await;
        state.check_version(account.customer_id(), expected_version)?;
        Ok(state.write(account, expected_version))
    }

    async fn is_event_processed(&self, customer_id: &CustomerId, event_id: &str) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .processed_events
            .contains_key(&(customer_id.clone(), event_id.to_string())))
    }

    async fn commit_order_check(&self, commit: OrderCheckCommit) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        let marker = (commit.customer_id, commit.event_id);
        if state.processed_events.contains_key(&marker) {
            return Err(StoreError::DuplicateEvent);
        }
        if let Some(update) = &commit.account_update {
            state.check_version(update.record.customer_id(), update.version)?;
        }

        if let Some(update) = &commit.account_update {
            state.write(&update.record, update.version);
        }
        state.processed_events.insert(marker, Utc::now());

        if state.outbox.len() >= self.outbox_capacity {
            if let Some(dropped) = state.outbox.pop_front() {
                tracing::debug!(outbox_event_id = %dropped.event_id, "Outbox full, dropping oldest event");
            }
        }
        state.outbox.push_back(commit.outbox);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
