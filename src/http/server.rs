use actix_web::{web, App, HttpServer};
use std::sync::Arc;

use crate::config::Config;
use crate::metrics::{metrics_handler, Metrics};

use super::handlers::{
    get_customer, health_handler, index, pubsub_push, request_credit, set_limit, AppState,
};

const CUSTOMER_API: &str = "/api/v1/customer";

fn customer_scope(path: &str) -> actix_web::Scope {
    web::scope(path)
        .route("/get", web::post().to(get_customer))
        .route("/limit", web::post().to(set_limit))
        .route("/credit", web::post().to(request_credit))
        .route("/pubsub", web::post().to(pubsub_push))
}

/// Register every route; the customer API is mounted again under `prefix`
pub fn routes(cfg: &mut web::ServiceConfig, prefix: Option<&str>) {
    cfg.route("/", web::get().to(index))
        .route("/health", web::get().to(health_handler))
        .route("/metrics", web::get().to(metrics_handler))
        .service(customer_scope(CUSTOMER_API));

    if let Some(prefix) = prefix {
        cfg.service(customer_scope(&format!("/{}{}", prefix, CUSTOMER_API)));
    }
}

/// Serve the customer API until the server is stopped
pub async fn run(config: &Config, state: AppState) -> std::io::Result<()> {
    let prefix = config.normalized_route_prefix();
    let metrics: web::Data<Arc<Metrics>> = web::Data::new(state.metrics.clone());
    let state = web::Data::new(state);

    tracing::info!(
        host = %config.host,
        port = config.port,
        route_prefix = ?prefix,
        "Starting customer service on http://{}:{}",
        config.host,
        config.port
    );

    HttpServer::new(move || {
        let prefix = prefix.clone();
        App::new()
            .app_data(state.clone())
            .app_data(metrics.clone())
            .configure(|cfg| routes(cfg, prefix.as_deref()))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handlers::BANNER;
    use crate::domain::customer::{CommandHandlerConfig, CustomerCommandHandler};
    use crate::store::InMemoryCustomerStore;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde_json::{json, Value};

    fn state(collapse_errors: bool) -> AppState {
        let metrics = Arc::new(Metrics::new().unwrap());
        let store = Arc::new(InMemoryCustomerStore::new());
        let handler = CustomerCommandHandler::new(store, metrics.clone(), CommandHandlerConfig::default());
        AppState::new(handler, metrics, collapse_errors)
    }

    macro_rules! service {
        ($collapse_errors:expr) => {{
            let state = state($collapse_errors);
            let metrics = web::Data::new(state.metrics.clone());
            test::init_service(
                App::new()
                    .app_data(web::Data::new(state))
                    .app_data(metrics)
                    .configure(|cfg| routes(cfg, Some("customer-service-sync"))),
            )
            .await
        }};
    }

    macro_rules! post {
        ($uri:expr, $body:expr $(,)?) => {
            test::TestRequest::post()
                .uri($uri)
                .set_payload($body.to_string())
                .to_request()
        };
    }

    fn push(event_id: &str, event_type: &str, order: Value) -> Value {
        json!({
            "message": {
                "data": STANDARD.encode(order.to_string()),
                "attributes": {"event_id": event_id, "event_type": event_type}
            }
        })
    }

    #[actix_web::test]
    async fn test_banner() {
        let app = service!(false);
        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert_eq!(body, BANNER);
    }

    #[actix_web::test]
    async fn test_limit_credit_scenario() {
        let app = service!(false);

        let resp = test::call_service(
            &app,
            post!("/api/v1/customer/limit", json!({"customer_id": "C1", "limit": 1000})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"customer_id": "C1", "credit": 0, "limit": 1000}));

        let resp = test::call_service(
            &app,
            post!("/api/v1/customer/credit", json!({"customer_id": "C1", "number": 3})),
        )
        .await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"customer_id": "C1", "credit": 300, "accepted": true}));

        let resp = test::call_service(
            &app,
            post!("/api/v1/customer/limit", json!({"customer_id": "C1", "limit": 200})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "limit_below_credit");

        let resp = test::call_service(
            &app,
            post!("/api/v1/customer/get", json!({"customer_id": "C1"})),
        )
        .await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"customer_id": "C1", "credit": 300, "limit": 1000}));
    }

    #[actix_web::test]
    async fn test_rejected_credit_is_ok_response() {
        let app = service!(false);
        test::call_service(
            &app,
            post!("/api/v1/customer/limit", json!({"customer_id": "C2", "limit": 150})),
        )
        .await;

        let resp = test::call_service(
            &app,
            post!("/api/v1/customer/credit", json!({"customer_id": "C2", "number": 2})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"customer_id": "C2", "credit": 0, "accepted": false}));
    }

    #[actix_web::test]
    async fn test_error_statuses() {
        let app = service!(false);

        let resp = test::call_service(
            &app,
            post!("/api/v1/customer/get", json!({"customer_id": "missing"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "not_found");

        let req = test::TestRequest::post()
            .uri("/api/v1/customer/limit")
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(
            &app,
            post!("/api/v1/customer/limit", json!({"customer_id": "C1", "limit": "500"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(
            &app,
            post!("/api/v1/customer/credit", json!({"customer_id": "C1"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_collapsed_errors() {
        let app = service!(true);

        let resp = test::call_service(
            &app,
            post!("/api/v1/customer/get", json!({"customer_id": "missing"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"message": "Internal Server Error"}));
    }

    #[actix_web::test]
    async fn test_unknown_fields_reported() {
        let app = service!(false);

        let resp = test::call_service(
            &app,
            post!(
                "/api/v1/customer/limit",
                json!({"customer_id": "C3", "limit": 500, "currency": "EUR"}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["unknown_fields"], json!(["currency"]));
        assert_eq!(body["limit"], 500);
    }

    #[actix_web::test]
    async fn test_prefixed_routes() {
        let app = service!(false);

        let resp = test::call_service(
            &app,
            post!(
                "/customer-service-sync/api/v1/customer/limit",
                json!({"customer_id": "C4", "limit": 500}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(
            &app,
            post!("/api/v1/customer/get", json!({"customer_id": "C4"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_pubsub_redelivery_charges_once() {
        let app = service!(false);
        test::call_service(
            &app,
            post!("/api/v1/customer/limit", json!({"customer_id": "C5", "limit": 1000})),
        )
        .await;

        let order = json!({"customer_id": "C5", "order_id": "O-1", "number": 2});
        for _ in 0..2 {
            let resp = test::call_service(
                &app,
                post!("/api/v1/customer/pubsub", push("E-1", "order_create", order.clone())),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(test::read_body(resp).await, "Finished.".as_bytes());
        }

        let resp = test::call_service(
            &app,
            post!("/api/v1/customer/get", json!({"customer_id": "C5"})),
        )
        .await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["credit"], 200);
    }

    #[actix_web::test]
    async fn test_pubsub_invalid_envelope() {
        let app = service!(false);

        let resp = test::call_service(
            &app,
            post!("/api/v1/customer/pubsub", json!({"message": {"data": "%%%"}})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_health_and_metrics() {
        let app = service!(false);

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "healthy");

        test::call_service(
            &app,
            post!("/api/v1/customer/get", json!({"customer_id": "nobody"})),
        )
        .await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("customer_requests_total"));
        assert!(text.contains("not_found"));
    }
}
