use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::CustomerId;

// ============================================================================
// Order Check Events
// ============================================================================
//
// Inbound: `order_create` messages pushed by the order service.
// Outbound: `order_checked` results written to the outbox in the same commit
// as the credit change, for a relay to publish later.
//
// ============================================================================

pub const ORDER_CREATE_EVENT: &str = "order_create";
pub const ORDER_CHECKED_EVENT: &str = "order_checked";

/// Decoded body of an `order_create` message
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderCreated {
    pub customer_id: CustomerId,
    pub order_id: String,
    pub number: i64,
}

/// Result of checking an order against the customer's remaining limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderChecked {
    pub customer_id: CustomerId,
    pub order_id: String,
    pub accepted: bool,
}

/// Outbox row; `published` stays false until the relay picks it up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub event_id: Uuid,
    pub topic: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub published: bool,
    pub body: String,
}

impl OutboxEvent {
    pub fn order_checked(topic: &str, checked: &OrderChecked) -> serde_json::Result<Self> {
        Ok(Self {
            event_id: Uuid::new_v4(),
            topic: topic.to_string(),
            event_type: ORDER_CHECKED_EVENT.to_string(),
            timestamp: Utc::now(),
            published: false,
            body: serde_json::to_string(checked)?,
        })
    }
}
