use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::domain::customer::CustomerError;

/// A failed request as seen by the HTTP client
#[derive(Debug)]
pub struct ApiError {
    error: CustomerError,
    /// Report every failure as a bare 500
    collapse: bool,
}

impl ApiError {
    pub fn new(error: CustomerError, collapse: bool) -> Self {
        Self { error, collapse }
    }
}

pub fn status_for(error: &CustomerError) -> StatusCode {
    match error {
        CustomerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        CustomerError::NotFound(_) => StatusCode::NOT_FOUND,
        CustomerError::LimitBelowCredit { .. } => StatusCode::CONFLICT,
        CustomerError::ConcurrentUpdate { .. } | CustomerError::StoreUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        CustomerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        CustomerError::CorruptRecord(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        if self.collapse {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            status_for(&self.error)
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.collapse {
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({"message": "Internal Server Error"}));
        }

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.error.code(),
            "message": self.error.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customer::CustomerId;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let id = CustomerId::parse("C1").unwrap();

        assert_eq!(
            status_for(&CustomerError::InvalidArgument("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&CustomerError::NotFound(id.clone())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&CustomerError::LimitBelowCredit {
                customer_id: id.clone(),
                requested: 200,
                credit: 300,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&CustomerError::ConcurrentUpdate { customer_id: id }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&CustomerError::Timeout(Duration::from_secs(1))),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_collapsed_errors_are_500() {
        let error = ApiError::new(CustomerError::InvalidArgument("x".into()), true);
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let error = ApiError::new(CustomerError::InvalidArgument("x".into()), false);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }
}
