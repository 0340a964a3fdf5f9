use async_trait::async_trait;
use chrono::Utc;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::response::query_result::QueryResult;
use scylla::statement::batch::Batch;
use scylla::value::{CqlValue, Row};
use std::sync::Arc;

use crate::domain::customer::{CustomerAccount, CustomerId};

use super::customer_store::{CustomerStore, OrderCheckCommit, StoreError, Versioned};

// ============================================================================
// ScyllaDB Customer Store
// ============================================================================
//
// One partition per customer in `customer_ledger`:
// - static columns hold the account (credit, limit, version)
// - clustering rows hold processed event markers and outbox messages
//
// Account writes are lightweight transactions (`IF NOT EXISTS`,
// `IF version = ?`). An order check is a single conditional batch on the
// customer's partition: account update, event marker and outbox row are
// applied together or not at all, even if the caller gives up mid-flight.
//
// ============================================================================

const PROCESSED_EVENT: &str = "processed_event";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS customer_ledger (
    customer_id text,
    entry_kind text,
    entry_id text,
    credit bigint STATIC,
    credit_limit bigint STATIC,
    version bigint STATIC,
    updated_at timestamp STATIC,
    event_type text,
    topic text,
    payload text,
    published boolean,
    created_at timestamp,
    PRIMARY KEY (customer_id, entry_kind, entry_id)
)";

const CREATE_ACCOUNT: &str =
    "INSERT INTO customer_ledger (customer_id, credit, credit_limit, version, updated_at)
     VALUES (?, ?, ?, ?, ?) IF NOT EXISTS";

const UPDATE_ACCOUNT: &str =
    "UPDATE customer_ledger SET credit = ?, credit_limit = ?, version = ?, updated_at = ?
     WHERE customer_id = ? IF version = ?";

const CLAIM_EVENT: &str =
    "INSERT INTO customer_ledger (customer_id, entry_kind, entry_id, created_at)
     VALUES (?, 'processed_event', ?, ?) IF NOT EXISTS";

const APPEND_OUTBOX: &str =
    "INSERT INTO customer_ledger (customer_id, entry_kind, entry_id, event_type, topic, payload, published, created_at)
     VALUES (?, 'outbox', ?, ?, ?, ?, ?, ?)";

/// Statements of an order check batch, in the order their values are bound
fn order_check_statements(updates_account: bool) -> Vec<&'static str> {
    let mut statements = Vec::with_capacity(3);
    if updates_account {
        statements.push(UPDATE_ACCOUNT);
    }
    statements.push(CLAIM_EVENT);
    statements.push(APPEND_OUTBOX);
    statements
}

pub struct ScyllaCustomerStore {
    session: Arc<Session>,
}

impl ScyllaCustomerStore {
    /// Connect, make sure the keyspace and table exist, and select the keyspace
    pub async fn connect(known_node: &str, keyspace: &str) -> anyhow::Result<Self> {
        tracing::info!(node = %known_node, keyspace = %keyspace, "Connecting to ScyllaDB");

        let session: Session = SessionBuilder::new().known_node(known_node).build().await?;

        session
            .query_unpaged(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                     {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                    keyspace
                ),
                &[],
            )
            .await?;
        session.use_keyspace(keyspace, false).await?;
        session.query_unpaged(SCHEMA, &[]).await?;

        tracing::info!(keyspace = %keyspace, "ScyllaDB schema ready");
        Ok(Self {
            session: Arc::new(session),
        })
    }

    async fn event_claimed(&self, customer_id: &CustomerId, event_id: &str) -> Result<bool, StoreError> {
        let result = self
            .session
            .query_unpaged(
                "SELECT entry_id FROM customer_ledger
                 WHERE customer_id = ? AND entry_kind = ? AND entry_id = ?",
                (customer_id.as_str(), PROCESSED_EVENT, event_id),
            )
            .await
            .map_err(StoreError::unavailable)?;

        let rows = result.into_rows_result().map_err(StoreError::unavailable)?;
        Ok(rows.rows_num() > 0)
    }
}

#[async_trait]
impl CustomerStore for ScyllaCustomerStore {
    async fn find_by_customer_id(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<Versioned<CustomerAccount>>, StoreError> {
        let result = self
            .session
            .query_unpaged(
                "SELECT credit, credit_limit, version FROM customer_ledger
                 WHERE customer_id = ? LIMIT 1",
                (customer_id.as_str(),),
            )
            .await
            .map_err(StoreError::unavailable)?;

        let rows = result.into_rows_result().map_err(StoreError::unavailable)?;

        let row = rows
            .maybe_first_row::<(Option<i64>, Option<i64>, Option<i64>)>()
            .map_err(StoreError::unavailable)?;
        match row {
            Some(row) => account_from_row(customer_id, row),
            None => Ok(None),
        }
    }

    async fn put(&self, account: &CustomerAccount, expected_version: i64) -> Result<i64, StoreError> {
        let new_version = expected_version + 1;

        let written = if expected_version == 0 {
            self.session
                .query_unpaged(
                    CREATE_ACCOUNT,
                    (
                        account.customer_id().as_str(),
                        account.credit(),
                        account.limit(),
                        new_version,
                        Utc::now(),
                    ),
                )
                .await
        } else {
            self.session
                .query_unpaged(
                    UPDATE_ACCOUNT,
                    (
                        account.credit(),
                        account.limit(),
                        new_version,
                        Utc::now(),
                        account.customer_id().as_str(),
                        expected_version,
                    ),
                )
                .await
        };
        let result = written.map_err(StoreError::unavailable)?;

        if !was_applied(result)? {
            tracing::debug!(
                customer_id = %account.customer_id(),
                expected_version = expected_version,
                "Conditional customer write not applied"
            );
            return Err(StoreError::Conflict);
        }

        Ok(new_version)
    }

    async fn is_event_processed(&self, customer_id: &CustomerId, event_id: &str) -> Result<bool, StoreError> {
        self.event_claimed(customer_id, event_id).await
    }

    async fn commit_order_check(&self, commit: OrderCheckCommit) -> Result<(), StoreError> {
        let customer_id = commit.customer_id.as_str();
        let outbox = &commit.outbox;
        let now = Utc::now();

        let mut batch = Batch::default();
        for statement in order_check_statements(commit.account_update.is_some()) {
            batch.append_statement(statement);
        }

        let claim_values = (customer_id, commit.event_id.as_str(), now);
        let outbox_values = (
            customer_id,
            outbox.event_id.to_string(),
            outbox.event_type.as_str(),
            outbox.topic.as_str(),
            outbox.body.as_str(),
            outbox.published,
            outbox.timestamp,
        );

        let written = match &commit.account_update {
            Some(update) => {
                let account = &update.record;
                let account_values = (
                    account.credit(),
                    account.limit(),
                    update.version + 1,
                    now,
                    customer_id,
                    update.version,
                );
                self.session
                    .batch(&batch, (account_values, claim_values, outbox_values))
                    .await
            }
            None => self.session.batch(&batch, (claim_values, outbox_values)).await,
        };
        let result = written.map_err(StoreError::unavailable)?;

        if !was_applied(result)? {
            // Either the marker already exists or the account moved on
            if self.event_claimed(&commit.customer_id, &commit.event_id).await? {
                return Err(StoreError::DuplicateEvent);
            }
            return Err(StoreError::Conflict);
        }

        tracing::info!(
            event_id = %commit.event_id,
            customer_id = %commit.customer_id,
            outbox_event_id = %outbox.event_id,
            "✅ Committed order check"
        );
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.session
            .query_unpaged("SELECT now() FROM system.local", &[])
            .await
            .map_err(StoreError::unavailable)?;
        Ok(())
    }
}

/// Static columns of the customer's partition; no version means no account
fn account_from_row(
    customer_id: &CustomerId,
    row: (Option<i64>, Option<i64>, Option<i64>),
) -> Result<Option<Versioned<CustomerAccount>>, StoreError> {
    match row {
        (_, _, None) => Ok(None),
        (Some(credit), Some(limit), Some(version)) => {
            let record = CustomerAccount::restore(customer_id.clone(), credit, limit)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?;
            Ok(Some(Versioned { record, version }))
        }
        _ => Err(StoreError::Corrupt(format!(
            "customer {} has a version but no credit or limit",
            customer_id
        ))),
    }
}

/// Read the `[applied]` column of a lightweight transaction result
fn was_applied(result: QueryResult) -> Result<bool, StoreError> {
    let rows = result.into_rows_result().map_err(StoreError::unavailable)?;
    let row = rows.first_row::<Row>().map_err(StoreError::unavailable)?;

    match row.columns.first() {
        Some(Some(CqlValue::Boolean(applied))) => Ok(*applied),
        other => Err(StoreError::Unavailable(format!(
            "conditional write returned unexpected [applied] column: {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> CustomerId {
        CustomerId::parse("C1").unwrap()
    }

    #[test]
    fn test_account_from_valid_row() {
        let versioned = account_from_row(&id(), (Some(300), Some(1000), Some(4)))
            .unwrap()
            .unwrap();

        assert_eq!(versioned.version, 4);
        assert_eq!(versioned.record.credit(), 300);
        assert_eq!(versioned.record.limit(), 1000);
    }

    #[test]
    fn test_partition_without_account() {
        assert!(account_from_row(&id(), (None, None, None)).unwrap().is_none());
    }

    #[test]
    fn test_account_from_corrupt_row() {
        let result = account_from_row(&id(), (Some(1200), Some(1000), Some(2)));
        assert!(matches!(result, Err(StoreError::Corrupt(_))));

        let result = account_from_row(&id(), (None, Some(1000), Some(2)));
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_order_check_is_one_partition_batch() {
        let accepted = order_check_statements(true);
        assert_eq!(accepted, vec![UPDATE_ACCOUNT, CLAIM_EVENT, APPEND_OUTBOX]);

        let rejected = order_check_statements(false);
        assert_eq!(rejected, vec![CLAIM_EVENT, APPEND_OUTBOX]);

        // Every statement lands in the customer's partition, so Scylla
        // accepts the conditions and applies the batch as a unit
        for statement in accepted {
            assert!(statement.contains("customer_ledger"));
            assert!(statement.contains("customer_id"));
        }
        assert!(UPDATE_ACCOUNT.contains("IF version = ?"));
        assert!(CLAIM_EVENT.contains("IF NOT EXISTS"));
        assert!(CLAIM_EVENT.contains(PROCESSED_EVENT));
        assert!(APPEND_OUTBOX.contains("'outbox'"));
    }

    // Reads and conditional writes need a running ScyllaDB node and are
    // exercised through the in-memory store in the command handler tests.
}
