use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::Metrics;
use crate::store::{CustomerStore, DynCustomerStore, OrderCheckCommit, StoreError, Versioned};
use crate::utils::{retry_on_transient, RetryConfig, RetryExhausted};

use super::aggregate::{CustomerAccount, Decision};
use super::commands::CustomerCommand;
use super::errors::CustomerError;
use super::events::{OrderChecked, OrderCreated, OutboxEvent, ORDER_CREATE_EVENT};
use super::value_objects::{CreditUnits, CustomerId};

// ============================================================================
// Customer Command Handler
// ============================================================================
//
// Orchestrates: Load → Decide → Conditional Write, under a request deadline.
//
// The write carries the version that was read. If another request wrote the
// same customer in between, the store reports a conflict and the whole cycle
// runs again from a fresh read. Rejections never write, so they cannot
// conflict.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct CommandHandlerConfig {
    pub request_timeout: Duration,
    pub retry: RetryConfig,
    pub outbox_topic: String,
}

impl Default for CommandHandlerConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(1),
            retry: RetryConfig::default(),
            outbox_topic: "customer-service-event".to_string(),
        }
    }
}

/// Inbound order message after envelope decoding
#[derive(Debug, Clone)]
pub struct OrderMessage {
    pub event_id: String,
    pub event_type: String,
    pub order: OrderCreated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderCheckOutcome {
    /// The event id was already processed; nothing was written
    Duplicate,
    /// Not an `order_create` message; nothing was written
    Ignored,
    Checked { accepted: bool },
}

#[derive(Clone)]
pub struct CustomerCommandHandler {
    store: DynCustomerStore,
    metrics: Arc<Metrics>,
    config: Arc<CommandHandlerConfig>,
}

impl CustomerCommandHandler {
    pub fn new(store: DynCustomerStore, metrics: Arc<Metrics>, config: CommandHandlerConfig) -> Self {
        Self {
            store,
            metrics,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &dyn CustomerStore {
        self.store.as_ref()
    }

    pub async fn lookup(&self, customer_id: &CustomerId) -> Result<CustomerAccount, CustomerError> {
        self.with_deadline("lookup", async {
            let current = self.load(customer_id).await?;
            CustomerAccount::lookup(current.as_ref().map(|stored| &stored.record), customer_id)
        })
        .await
    }

    /// Handle a mutating command and persist the resulting account
    pub async fn handle(&self, command: CustomerCommand) -> Result<Decision, CustomerError> {
        let operation = command.name();
        let decision = self.with_deadline(operation, self.execute(&command)).await?;

        self.metrics.record_decision(decision.label());
        tracing::info!(
            customer_id = %decision.account().customer_id(),
            operation = operation,
            decision = decision.label(),
            credit = decision.account().credit(),
            limit = decision.account().limit(),
            "Customer command handled"
        );
        Ok(decision)
    }

    /// Reserve credit for an order and record the result in the outbox
    pub async fn check_order(&self, message: OrderMessage) -> Result<OrderCheckOutcome, CustomerError> {
        let is_order_create = message.event_type == ORDER_CREATE_EVENT;
        let units = if is_order_create {
            Some(CreditUnits::new(message.order.number)?)
        } else {
            None
        };

        self.with_deadline("check_order", async {
            let processed = self
                .store
                .is_event_processed(&message.order.customer_id, &message.event_id)
                .await
                .map_err(|e| CustomerError::from_store(&message.order.customer_id, e))?;
            if processed {
                tracing::info!(event_id = %message.event_id, "Duplicate event");
                return Ok(OrderCheckOutcome::Duplicate);
            }

            let Some(units) = units else {
                tracing::info!(
                    event_id = %message.event_id,
                    event_type = %message.event_type,
                    "Unknown event type"
                );
                return Ok(OrderCheckOutcome::Ignored);
            };

            self.commit_order_check(&message, units).await
        })
        .await
    }

    async fn execute(&self, command: &CustomerCommand) -> Result<Decision, CustomerError> {
        let customer_id = command.customer_id();

        let outcome = retry_on_transient(&self.config.retry, |attempt| async move {
            let (record, version) = split(self.load(customer_id).await?);
            let decision = CustomerAccount::handle_command(record.as_ref(), command)?;

            if decision.requires_write() {
                self.store
                    .put(decision.account(), version)
                    .await
                    .map_err(|e| CustomerError::from_store(customer_id, e))?;
            }
            Ok::<_, CustomerError>((decision, attempt))
        })
        .await;

        self.settle(command.name(), outcome)
    }

    async fn commit_order_check(
        &self,
        message: &OrderMessage,
        units: CreditUnits,
    ) -> Result<OrderCheckOutcome, CustomerError> {
        let customer_id = &message.order.customer_id;
        let command = CustomerCommand::RequestCredit {
            customer_id: customer_id.clone(),
            units,
        };

        let outcome = retry_on_transient(&self.config.retry, |attempt| {
            let command = &command;
            async move {
                let (record, version) = split(self.load(customer_id).await?);
                let decision = CustomerAccount::handle_command(record.as_ref(), command)?;

                let checked = OrderChecked {
                    customer_id: customer_id.clone(),
                    order_id: message.order.order_id.clone(),
                    accepted: decision.is_accepted(),
                };
                let outbox = OutboxEvent::order_checked(&self.config.outbox_topic, &checked)
                    .map_err(|e| CustomerError::InvalidArgument(e.to_string()))?;

                let commit = OrderCheckCommit {
                    event_id: message.event_id.clone(),
                    customer_id: customer_id.clone(),
                    account_update: decision.requires_write().then(|| Versioned {
                        record: decision.account().clone(),
                        version,
                    }),
                    outbox,
                };

                match self.store.commit_order_check(commit).await {
                    Ok(()) => Ok::<_, CustomerError>((Some(decision), attempt)),
                    // Another delivery of the same event won the commit
                    Err(StoreError::DuplicateEvent) => Ok((None, attempt)),
                    Err(e) => Err(CustomerError::from_store(customer_id, e)),
                }
            }
        })
        .await;

        match self.settle("check_order", outcome)? {
            Some(decision) => {
                self.metrics.record_decision(decision.label());
                tracing::info!(
                    event_id = %message.event_id,
                    customer_id = %customer_id,
                    order_id = %message.order.order_id,
                    accepted = decision.is_accepted(),
                    credit = decision.account().credit(),
                    "Order checked"
                );
                Ok(OrderCheckOutcome::Checked {
                    accepted: decision.is_accepted(),
                })
            }
            None => Ok(OrderCheckOutcome::Duplicate),
        }
    }

    async fn load(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<Versioned<CustomerAccount>>, CustomerError> {
        self.store
            .find_by_customer_id(customer_id)
            .await
            .map_err(|e| CustomerError::from_store(customer_id, e))
    }

    /// Record how many version conflicts an operation went through
    fn settle<T>(
        &self,
        operation: &str,
        outcome: Result<(T, u32), RetryExhausted<CustomerError>>,
    ) -> Result<T, CustomerError> {
        match outcome {
            Ok((value, attempt)) => {
                self.metrics.record_conflicts(operation, attempt - 1);
                Ok(value)
            }
            Err(RetryExhausted { attempts, error }) => {
                let conflicts = match error {
                    CustomerError::ConcurrentUpdate { .. } => attempts,
                    _ => attempts - 1,
                };
                self.metrics.record_conflicts(operation, conflicts);
                Err(error)
            }
        }
    }

    async fn with_deadline<T, F>(&self, operation: &str, future: F) -> Result<T, CustomerError>
    where
        F: Future<Output = Result<T, CustomerError>>,
    {
        let timeout = self.config.request_timeout;
        match tokio::time::timeout(timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation = operation,
                    timeout_ms = timeout.as_millis() as u64,
                    "Operation abandoned at deadline"
                );
                Err(CustomerError::Timeout(timeout))
            }
        }
    }
}

fn split(current: Option<Versioned<CustomerAccount>>) -> (Option<CustomerAccount>, i64) {
    match current {
        Some(stored) => (Some(stored.record), stored.version),
        None => (None, 0),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
