//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use launchpad_billing::BillingError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid signature")]
    InvalidSignature,

    /// Message is shown to the caller; details are logged, not returned
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Map a failure of the checkout flow
    pub fn from_checkout(err: &BillingError) -> Self {
        match err {
            BillingError::UserNotFound(_) => ApiError::NotFound(err.user_message().into()),
            _ => {
                tracing::error!(error = %err, "Checkout failed");
                ApiError::Internal("Failed to create checkout session".into())
            }
        }
    }

    /// Map a failure of webhook verification or processing. Anything other
    /// than a rejected payload is a 500 so Stripe redelivers the event.
    pub fn from_webhook(err: &BillingError) -> Self {
        if err.is_rejected_webhook() {
            tracing::warn!(error = %err, "Webhook rejected");
            ApiError::InvalidSignature
        } else {
            tracing::error!(error = %err, "Webhook processing failed");
            ApiError::Internal("Webhook handler failed".into())
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidSignature => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidSignature => "INVALID_SIGNATURE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        });
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_mapping() {
        let not_found = ApiError::from_checkout(&BillingError::UserNotFound("a@b".into()));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.to_string(), "User not found");

        let stripe = ApiError::from_checkout(&BillingError::Stripe("timeout".into()));
        assert_eq!(stripe.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!stripe.to_string().contains("timeout"));
    }

    #[test]
    fn test_webhook_mapping() {
        let bad = ApiError::from_webhook(&BillingError::WebhookSignature("mismatch".into()));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let malformed = ApiError::from_webhook(&BillingError::WebhookParse("eof".into()));
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

        // A missing user during reconciliation must not be acknowledged
        let missing = ApiError::from_webhook(&BillingError::UserNotFound("u1".into()));
        assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
