use actix_web::{web, HttpResponse, Responder};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

use super::Metrics;

/// Prometheus text exposition of every registered metric
pub async fn metrics_handler(metrics: web::Data<Arc<Metrics>>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
