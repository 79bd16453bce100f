//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Responses carry a JSON body `{"error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::{CheckoutError, PaymentError, QuoteError};
use crate::store::StoreError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Payment gateway operation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// The cart could not be quoted.
    #[error("Quote error: {0}")]
    Quote(#[from] QuoteError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::InvalidRequest(msg) | CheckoutError::PromoRejected(msg) => {
                Self::BadRequest(msg)
            }
            CheckoutError::Quote(e) => Self::Quote(e),
            CheckoutError::Store(e) => Self::Store(e),
            CheckoutError::Payment(e) => Self::Payment(e),
        }
    }
}

const fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::PromoExhausted(_) => StatusCode::CONFLICT,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Database(_) | StoreError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) | Self::Quote(QuoteError::Store(err)) => store_status(err),
            Self::Payment(PaymentError::NotConfigured(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::Quote(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show the client.
    fn client_message(&self) -> String {
        match self {
            Self::Store(StoreError::PromoExhausted(_))
            | Self::Quote(QuoteError::Store(StoreError::PromoExhausted(_))) => {
                "This promo code has reached its usage limit".to_string()
            }
            Self::Store(StoreError::Unavailable(_))
            | Self::Quote(QuoteError::Store(StoreError::Unavailable(_))) => {
                "Service temporarily unavailable".to_string()
            }
            Self::Store(_) | Self::Quote(QuoteError::Store(_)) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Payment(PaymentError::NotConfigured(_)) => {
                "Online payment is not available".to_string()
            }
            Self::Payment(_) => "Payment gateway error".to_string(),
            Self::Quote(e) => e.to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Order".to_string());
        assert_eq!(err.to_string(), "Not found: Order");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(StoreError::PromoExhausted("SAVE10".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(QuoteError::EmptyCart.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(PaymentError::NotConfigured("keys".to_string()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_checkout_rejection_is_bad_request() {
        let err: AppError = CheckoutError::PromoRejected("This promo code has expired".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.client_message(), "This promo code has expired");
    }

    #[tokio::test]
    async fn test_internal_details_not_exposed() {
        let response =
            AppError::Store(StoreError::DataCorruption("bad row 42".to_string())).into_response();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }
}
