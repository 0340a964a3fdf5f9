use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use std::time::Instant;

use crate::domain::customer::{CustomerCommandHandler, CustomerError, OrderCheckOutcome};
use crate::metrics::Metrics;

use super::errors::{status_for, ApiError};
use super::requests::{
    parse_body, AccountResponse, CreditRequest, CreditResponse, LookupRequest, PushEnvelope,
    SetLimitRequest,
};

pub const BANNER: &str = "Customer service / Synchronous implementation.";

/// Shared state handed to every request handler
pub struct AppState {
    pub handler: CustomerCommandHandler,
    pub metrics: Arc<Metrics>,
    pub collapse_errors: bool,
}

impl AppState {
    pub fn new(handler: CustomerCommandHandler, metrics: Arc<Metrics>, collapse_errors: bool) -> Self {
        Self {
            handler,
            metrics,
            collapse_errors,
        }
    }

    fn note_unknown_fields(&self, operation: &str, fields: &[String]) {
        if fields.is_empty() {
            return;
        }
        self.metrics.record_unknown_fields(operation);
        tracing::warn!(operation = operation, fields = ?fields, "Request carried unknown fields");
    }

    fn respond(
        &self,
        operation: &str,
        started: Instant,
        result: Result<HttpResponse, CustomerError>,
    ) -> Result<HttpResponse, ApiError> {
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.code(),
        };
        self.metrics.record_request(operation, outcome, started.elapsed());

        result.map_err(|error| {
            if status_for(&error).is_server_error() {
                tracing::error!(operation = operation, error = %error, "Request failed");
            } else {
                tracing::warn!(operation = operation, error = %error, "Request rejected");
            }
            ApiError::new(error, self.collapse_errors)
        })
    }
}

pub async fn index() -> impl Responder {
    tracing::info!(service = "customer-service", "Banner requested");
    HttpResponse::Ok().content_type("text/plain").body(BANNER)
}

pub async fn get_customer(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let result = lookup(&state, &body).await;
    state.respond("lookup", started, result)
}

async fn lookup(state: &AppState, body: &[u8]) -> Result<HttpResponse, CustomerError> {
    let request: LookupRequest = parse_body(body)?;
    let unknown = request.unknown_fields();
    state.note_unknown_fields("lookup", &unknown);

    let account = state.handler.lookup(&request.customer_id).await?;
    Ok(HttpResponse::Ok().json(AccountResponse::new(&account, unknown)))
}

pub async fn set_limit(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let result = apply_limit(&state, &body).await;
    state.respond("set_limit", started, result)
}

async fn apply_limit(state: &AppState, body: &[u8]) -> Result<HttpResponse, CustomerError> {
    let request: SetLimitRequest = parse_body(body)?;
    let unknown = request.unknown_fields();
    let command = request.into_command()?;
    state.note_unknown_fields("set_limit", &unknown);

    let account = state.handler.handle(command).await?.into_account();
    Ok(HttpResponse::Ok().json(AccountResponse::new(&account, unknown)))
}

pub async fn request_credit(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let result = apply_credit(&state, &body).await;
    state.respond("request_credit", started, result)
}

async fn apply_credit(state: &AppState, body: &[u8]) -> Result<HttpResponse, CustomerError> {
    let request: CreditRequest = parse_body(body)?;
    let unknown = request.unknown_fields();
    let command = request.into_command()?;
    state.note_unknown_fields("request_credit", &unknown);

    let decision = state.handler.handle(command).await?;
    Ok(HttpResponse::Ok().json(CreditResponse::new(&decision, unknown)))
}

/// Pub/Sub push endpoint for `order_create` messages
pub async fn pubsub_push(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let result = check_order(&state, &body).await;
    state.respond("check_order", started, result)
}

async fn check_order(state: &AppState, body: &[u8]) -> Result<HttpResponse, CustomerError> {
    let envelope: PushEnvelope = parse_body(body)?;
    let message = envelope.into_order_message()?;

    let outcome = state.handler.check_order(message).await?;
    if let OrderCheckOutcome::Checked { accepted } = outcome {
        tracing::debug!(accepted = accepted, "Order check committed");
    }
    Ok(HttpResponse::Ok().content_type("text/plain").body("Finished."))
}

pub async fn health_handler(state: web::Data<AppState>) -> impl Responder {
    match state.handler.store().health_check().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "service": "customer-service"
        })),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "service": "customer-service",
                "error": e.to_string()
            }))
        }
    }
}
