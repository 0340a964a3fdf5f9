use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::customer::{
    CreditLimit, CreditUnits, CustomerAccount, CustomerCommand, CustomerError, CustomerId,
    Decision, OrderCreated, OrderMessage,
};

// ============================================================================
// Request and Response Bodies
// ============================================================================
//
// Each endpoint has its own typed body. Keys the endpoint does not expect are
// collected by a flattened catch-all map so they can be reported back.
//
// ============================================================================

/// Decode a JSON body, whatever the declared content type
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, CustomerError> {
    serde_json::from_slice(body).map_err(|e| CustomerError::InvalidArgument(e.to_string()))
}

fn field_names(unknown: &BTreeMap<String, Value>) -> Vec<String> {
    unknown.keys().cloned().collect()
}

#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub customer_id: CustomerId,
    #[serde(flatten)]
    unknown: BTreeMap<String, Value>,
}

impl LookupRequest {
    pub fn unknown_fields(&self) -> Vec<String> {
        field_names(&self.unknown)
    }
}

#[derive(Debug, Deserialize)]
pub struct SetLimitRequest {
    pub customer_id: CustomerId,
    pub limit: i64,
    #[serde(flatten)]
    unknown: BTreeMap<String, Value>,
}

impl SetLimitRequest {
    pub fn unknown_fields(&self) -> Vec<String> {
        field_names(&self.unknown)
    }

    pub fn into_command(self) -> Result<CustomerCommand, CustomerError> {
        Ok(CustomerCommand::SetLimit {
            limit: CreditLimit::new(self.limit)?,
            customer_id: self.customer_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreditRequest {
    pub customer_id: CustomerId,
    /// Requested units; each unit is worth a fixed amount of credit
    pub number: i64,
    #[serde(flatten)]
    unknown: BTreeMap<String, Value>,
}

impl CreditRequest {
    pub fn unknown_fields(&self) -> Vec<String> {
        field_names(&self.unknown)
    }

    pub fn into_command(self) -> Result<CustomerCommand, CustomerError> {
        Ok(CustomerCommand::RequestCredit {
            units: CreditUnits::new(self.number)?,
            customer_id: self.customer_id,
        })
    }
}

// ----------------------------------------------------------------------------
// Pub/Sub push envelope
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
}

#[derive(Debug, Deserialize)]
pub struct PushMessage {
    /// Base64 encoded JSON payload
    pub data: String,
    pub attributes: PushAttributes,
}

#[derive(Debug, Deserialize)]
pub struct PushAttributes {
    pub event_id: String,
    pub event_type: String,
}

impl PushEnvelope {
    pub fn into_order_message(self) -> Result<OrderMessage, CustomerError> {
        let PushMessage { data, attributes } = self.message;

        let decoded = STANDARD
            .decode(data.as_bytes())
            .map_err(|e| CustomerError::InvalidArgument(format!("message data is not base64: {}", e)))?;
        let order: OrderCreated = parse_body(&decoded)?;

        Ok(OrderMessage {
            event_id: attributes.event_id,
            event_type: attributes.event_type,
            order,
        })
    }
}

// ----------------------------------------------------------------------------
// Responses
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub customer_id: String,
    pub credit: i64,
    pub limit: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_fields: Vec<String>,
}

impl AccountResponse {
    pub fn new(account: &CustomerAccount, unknown_fields: Vec<String>) -> Self {
        Self {
            customer_id: account.customer_id().to_string(),
            credit: account.credit(),
            limit: account.limit(),
            unknown_fields,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreditResponse {
    pub customer_id: String,
    pub credit: i64,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_fields: Vec<String>,
}

impl CreditResponse {
    pub fn new(decision: &Decision, unknown_fields: Vec<String>) -> Self {
        Self {
            customer_id: decision.account().customer_id().to_string(),
            credit: decision.account().credit(),
            accepted: decision.is_accepted(),
            unknown_fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(data: String) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "message": {
                "data": data,
                "attributes": {"event_id": "E-1", "event_type": "order_create"},
                "messageId": "123"
            },
            "subscription": "projects/demo/subscriptions/customer"
        }))
        .unwrap()
    }

    #[test]
    fn test_unknown_fields_are_collected() {
        let request: SetLimitRequest =
            parse_body(br#"{"customer_id":"C1","limit":500,"note":"x","vip":true}"#).unwrap();

        assert_eq!(request.unknown_fields(), vec!["note".to_string(), "vip".to_string()]);
        assert!(matches!(
            request.into_command().unwrap(),
            CustomerCommand::SetLimit { .. }
        ));
    }

    #[test]
    fn test_type_mismatch_is_invalid_argument() {
        let result = parse_body::<CreditRequest>(br#"{"customer_id":"C1","number":"3"}"#);
        assert!(matches!(result, Err(CustomerError::InvalidArgument(_))));

        let result = parse_body::<LookupRequest>(br#"{"customer_id":""}"#);
        assert!(matches!(result, Err(CustomerError::InvalidArgument(_))));

        let result = parse_body::<LookupRequest>(b"not json");
        assert!(matches!(result, Err(CustomerError::InvalidArgument(_))));
    }

    #[test]
    fn test_fractional_amounts_rejected() {
        let result = parse_body::<SetLimitRequest>(br#"{"customer_id":"C1","limit":500.0}"#);
        assert!(matches!(result, Err(CustomerError::InvalidArgument(_))));

        let result = parse_body::<CreditRequest>(br#"{"customer_id":"C1","number":1.5}"#);
        assert!(matches!(result, Err(CustomerError::InvalidArgument(_))));
    }

    #[test]
    fn test_non_positive_units_rejected() {
        let request: CreditRequest = parse_body(br#"{"customer_id":"C1","number":0}"#).unwrap();
        assert!(matches!(
            request.into_command(),
            Err(CustomerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_push_envelope_decoding() {
        let data = STANDARD.encode(r#"{"customer_id":"C1","order_id":"O-1","number":2}"#);
        let decoded: PushEnvelope = parse_body(&envelope(data)).unwrap();

        let message = decoded.into_order_message().unwrap();
        assert_eq!(message.event_id, "E-1");
        assert_eq!(message.event_type, "order_create");
        assert_eq!(message.order.customer_id.as_str(), "C1");
        assert_eq!(message.order.number, 2);
    }

    #[test]
    fn test_push_envelope_bad_data() {
        let not_base64: PushEnvelope = parse_body(&envelope("%%%".to_string())).unwrap();
        assert!(matches!(
            not_base64.into_order_message(),
            Err(CustomerError::InvalidArgument(_))
        ));

        let data = STANDARD.encode(r#"{"customer_id":"C1"}"#);
        let missing_fields: PushEnvelope = parse_body(&envelope(data)).unwrap();
        assert!(matches!(
            missing_fields.into_order_message(),
            Err(CustomerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unknown_fields_omitted_when_empty() {
        let account = CustomerAccount::restore(CustomerId::parse("C1").unwrap(), 100, 500).unwrap();

        let body = serde_json::to_value(AccountResponse::new(&account, Vec::new())).unwrap();
        assert_eq!(body, serde_json::json!({"customer_id": "C1", "credit": 100, "limit": 500}));

        let body = serde_json::to_value(AccountResponse::new(&account, vec!["x".to_string()])).unwrap();
        assert_eq!(body["unknown_fields"], serde_json::json!(["x"]));
    }
}
