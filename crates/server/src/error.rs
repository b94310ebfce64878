//! Mapping of service errors to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use model::OrderError;
use service::ServiceError;
use tracing::error;

/// Wrapper letting handlers return `Result<_, ApiError>` and use `?`.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Order(OrderError::InvalidStatusTransition { .. }) => StatusCode::CONFLICT,
            ServiceError::Order(_) => StatusCode::BAD_REQUEST,
            ServiceError::MenuItemNotFound { .. } | ServiceError::OrderNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::OrderStatus;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ServiceError::Order(OrderError::InvalidQuantity),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Order(OrderError::PriceOverflow),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Order(OrderError::InvalidStatusTransition {
                    current: OrderStatus::Delivered,
                }),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::MenuItemNotFound {
                    restaurant_id: 1,
                    menu_item_id: 10,
                },
                StatusCode::NOT_FOUND,
            ),
            (ServiceError::OrderNotFound(3), StatusCode::NOT_FOUND),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
