//! HTTP Handlers

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Serialize;

use crate::auth::AuthSession;
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub store: &'static str,
    pub payments: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        store: state.store.backend(),
        payments: state.payments.name().to_string(),
    })
}

/// Create a Stripe checkout session for the signed-in user
pub async fn create_checkout_session(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<CheckoutResponse>, ApiError> {
    tracing::debug!(subject = ?session.subject, "Checkout requested");

    let checkout = state
        .checkout
        .start(&session.email)
        .await
        .map_err(|e| ApiError::from_checkout(&e))?;

    Ok(Json(CheckoutResponse {
        session_id: checkout.id,
        url: checkout.url,
    }))
}

/// Stripe webhook handler. Takes the body as raw bytes: the signature covers
/// the exact payload.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing Stripe signature");
            ApiError::InvalidSignature
        })?;

    let event = state
        .payments
        .construct_event(&body, signature)
        .map_err(|e| ApiError::from_webhook(&e))?;

    state
        .webhooks
        .handle(&event)
        .await
        .map_err(|e| ApiError::from_webhook(&e))?;

    Ok(Json(WebhookAck { received: true }))
}
