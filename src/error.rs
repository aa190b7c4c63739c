//! Service-wide error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::domain::checkout::CheckoutError;
use crate::payment::PaymentError;
use crate::shipping::ShippingError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Shipping(#[from] ShippingError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Checkout(e) => match e {
                CheckoutError::SubmissionInFlight => StatusCode::CONFLICT,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            // Provider failures are retryable by the customer, not fatal.
            AppError::Shipping(_) | AppError::Payment(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let field = match &self {
            AppError::Checkout(CheckoutError::InvalidField { field, .. }) => {
                Some(field.clone())
            }
            _ => None,
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "field": field,
            "retryable": matches!(self, AppError::Shipping(_) | AppError::Payment(_)),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_unprocessable() {
        let err = AppError::Checkout(CheckoutError::InvalidField {
            field: "phone".into(),
            message: "phone number is required".into(),
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn duplicate_submit_maps_to_conflict() {
        let err = AppError::Checkout(CheckoutError::SubmissionInFlight);
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn provider_failures_are_bad_gateway() {
        let err = AppError::Payment(PaymentError::Api {
            status: 500,
            message: "upstream down".into(),
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
